// crates/trie/src/node.rs
//! Internal node representation and the top-k maintenance algorithm.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use typeahead_types::{topk_cmp, PhraseCount};

#[derive(Debug, Clone, Default)]
pub(crate) struct TrieNode {
    /// Ordered mapping from the next character to a child node.
    children: BTreeMap<char, Box<TrieNode>>,
    /// Present iff a phrase terminates at this node.
    terminal: Option<PhraseCount>,
    /// Up to `top_k` entries descending this node's subtree, sorted by
    /// `topk_cmp` (count desc, last_updated desc, phrase lex asc).
    pub(crate) top_k: Vec<PhraseCount>,
}

impl TrieNode {
    /// Insert `candidate` along `chars[idx..]`, creating nodes for missing
    /// edges, and apply the top-k update policy at every node visited
    /// (including this one).
    pub(crate) fn insert_path(
        &mut self,
        chars: &[char],
        idx: usize,
        candidate: &PhraseCount,
        k: usize,
    ) {
        update_topk(&mut self.top_k, candidate.clone(), k);

        if idx == chars.len() {
            self.terminal = Some(candidate.clone());
            return;
        }

        let child = self.children.entry(chars[idx]).or_default();
        child.insert_path(chars, idx + 1, candidate, k);
    }

    /// Walk `chars[idx..]`; returns the node reached, or `None` if an edge
    /// is missing along the way.
    pub(crate) fn walk(&self, chars: &[char], idx: usize) -> Option<&TrieNode> {
        if idx == chars.len() {
            return Some(self);
        }
        self.children.get(&chars[idx])?.walk(chars, idx + 1)
    }

    /// Remove the terminal marker for the phrase at `chars[idx..]` and
    /// re-heal every node on the path (including this one) from its
    /// children's top-k plus its own terminal entry. Returns whether a
    /// terminal marker was actually cleared somewhere along the path.
    pub(crate) fn remove_path(&mut self, chars: &[char], idx: usize, k: usize) -> bool {
        let removed = if idx == chars.len() {
            self.terminal.take().is_some()
        } else {
            match self.children.get_mut(&chars[idx]) {
                Some(child) => child.remove_path(chars, idx + 1, k),
                None => false,
            }
        };

        if removed {
            self.reheal_topk(k);
        }
        removed
    }

    /// Recompute `top_k` from this node's own terminal entry (if any) plus
    /// the union of all children's `top_k` lists, re-sorted and truncated.
    fn reheal_topk(&mut self, k: usize) {
        let mut candidates: Vec<PhraseCount> = Vec::new();
        if let Some(pc) = &self.terminal {
            candidates.push(pc.clone());
        }
        for child in self.children.values() {
            candidates.extend(child.top_k.iter().cloned());
        }
        candidates.sort_by(topk_cmp);
        candidates.dedup_by(|a, b| a.phrase == b.phrase);
        candidates.truncate(k);
        self.top_k = candidates;
    }

    /// DFS for `(node_count, max_depth)`, `depth` being this node's depth
    /// from the root (root itself is depth 0).
    pub(crate) fn dfs_stats(&self, depth: usize) -> (usize, usize) {
        let mut node_count = 1;
        let mut max_depth = depth;
        for child in self.children.values() {
            let (child_nodes, child_depth) = child.dfs_stats(depth + 1);
            node_count += child_nodes;
            max_depth = max_depth.max(child_depth);
        }
        (node_count, max_depth)
    }
}

/// Apply the `_update_topk` policy from spec §4.1 to a single node's list.
fn update_topk(top_k: &mut Vec<PhraseCount>, candidate: PhraseCount, k: usize) {
    if k == 0 {
        return;
    }
    if let Some(pos) = top_k.iter().position(|pc| pc.phrase == candidate.phrase) {
        top_k[pos] = candidate;
    } else if top_k.len() < k {
        top_k.push(candidate);
    } else if let Some(worst) = top_k.last().cloned() {
        if topk_cmp(&candidate, &worst) == Ordering::Less {
            top_k.pop();
            top_k.push(candidate);
        } else {
            return;
        }
    }
    top_k.sort_by(topk_cmp);
    top_k.truncate(k);
}
