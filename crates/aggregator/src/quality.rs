// crates/aggregator/src/quality.rs
//! Cheap, synchronous signal filters applied to every incoming query before
//! it touches the buffer. These run on the hot intake path so they must
//! stay allocation-light and branch-predictable.

use typeahead_types::normalize_phrase;

const MIN_LEN: usize = 2;
const MAX_LEN: usize = 100;
const SMASH_RUN_LEN: usize = 10;
const REPEAT_RUN_LEN: usize = 5;

/// QWERTY physical-adjacency graph (including the key itself), used to spot
/// "keyboard smash" input like `asdfghjkl;` or `qwertyuiop` — a run of keys
/// the typing hand could produce by sliding across adjacent keys, as
/// opposed to an ordinary long word, whose letters are rarely adjacent on
/// the keyboard two-in-a-row for ten characters straight.
fn qwerty_neighbors(c: char) -> &'static [char] {
    match c {
        'q' => &['q', 'w', 'a'],
        'w' => &['w', 'q', 'e', 'a', 's'],
        'e' => &['e', 'w', 'r', 's', 'd'],
        'r' => &['r', 'e', 't', 'd', 'f'],
        't' => &['t', 'r', 'y', 'f', 'g'],
        'y' => &['y', 't', 'u', 'g', 'h'],
        'u' => &['u', 'y', 'i', 'h', 'j'],
        'i' => &['i', 'u', 'o', 'j', 'k'],
        'o' => &['o', 'i', 'p', 'k', 'l'],
        'p' => &['p', 'o', 'l'],
        'a' => &['a', 'q', 'w', 's', 'z'],
        's' => &['s', 'a', 'w', 'e', 'd', 'z', 'x'],
        'd' => &['d', 's', 'e', 'r', 'f', 'x', 'c'],
        'f' => &['f', 'd', 'r', 't', 'g', 'c', 'v'],
        'g' => &['g', 'f', 't', 'y', 'h', 'v', 'b'],
        'h' => &['h', 'g', 'y', 'u', 'j', 'b', 'n'],
        'j' => &['j', 'h', 'u', 'i', 'k', 'n', 'm'],
        'k' => &['k', 'j', 'i', 'o', 'l', 'm'],
        'l' => &['l', 'k', 'o', 'p'],
        'z' => &['z', 'a', 's', 'x'],
        'x' => &['x', 'z', 's', 'd', 'c'],
        'c' => &['c', 'x', 'd', 'f', 'v'],
        'v' => &['v', 'c', 'f', 'g', 'b'],
        'b' => &['b', 'v', 'g', 'h', 'n'],
        'n' => &['n', 'b', 'h', 'j', 'm'],
        'm' => &['m', 'n', 'j', 'k'],
        _ => &[],
    }
}

fn is_keyboard_smash(normalized: &str) -> bool {
    let chars: Vec<char> = normalized.chars().filter(|c| *c != ' ').collect();
    if chars.len() < SMASH_RUN_LEN {
        return false;
    }
    let mut run = 1usize;
    for window in chars.windows(2) {
        let (prev, next) = (window[0], window[1]);
        if qwerty_neighbors(prev).contains(&next) {
            run += 1;
            if run >= SMASH_RUN_LEN {
                return true;
            }
        } else {
            run = 1;
        }
    }
    false
}

fn has_long_repeat_run(normalized: &str) -> bool {
    let mut chars = normalized.chars();
    let Some(mut prev) = chars.next() else {
        return false;
    };
    let mut run = 1usize;
    for c in chars {
        if c == prev {
            run += 1;
            if run >= REPEAT_RUN_LEN {
                return true;
            }
        } else {
            prev = c;
            run = 1;
        }
    }
    false
}

fn is_all_numeric(normalized: &str) -> bool {
    let digits: Vec<char> = normalized.chars().filter(|c| *c != ' ').collect();
    !digits.is_empty() && digits.iter().all(|c| c.is_ascii_digit())
}

/// True if `raw` should be rejected before it ever reaches the buffer.
/// Operates on the normalized form so the same rules apply regardless of
/// the caller's casing/Unicode form.
pub fn is_low_quality(raw: &str) -> bool {
    let normalized = normalize_phrase(raw);
    let len = normalized.chars().count();
    if len < MIN_LEN || len > MAX_LEN {
        return true;
    }
    is_all_numeric(&normalized) || is_keyboard_smash(&normalized) || has_long_repeat_run(&normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_too_short_and_too_long() {
        assert!(is_low_quality("a"));
        assert!(is_low_quality(&"a".repeat(101)));
    }

    #[test]
    fn rejects_all_numeric() {
        assert!(is_low_quality("123456789"));
    }

    #[test]
    fn rejects_keyboard_smash() {
        assert!(is_low_quality("asdfghjklx"));
        assert!(is_low_quality("qwertyuiop"));
    }

    #[test]
    fn accepts_ordinary_long_word() {
        assert!(!is_low_quality("search engine optimization"));
        assert!(!is_low_quality("basketball scoreboard"));
    }

    #[test]
    fn rejects_long_repeat_run() {
        assert!(is_low_quality("aaaaaaaaaa"));
        assert!(is_low_quality("hellooooo there"));
    }

    #[test]
    fn accepts_ordinary_phrase() {
        assert!(!is_low_quality("search engine"));
    }
}
