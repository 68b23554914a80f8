//! Identifier-safe fix names and collision-free aircraft identifiers.

use std::collections::BTreeSet;

const MAX_NAME_LEN: usize = 32;

/// Restricts a token to letters/digits/underscore, forces a leading letter,
/// and bounds its length.
pub fn sanitize_fix_name(name: &str) -> String {
    let mut s: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if !s.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        s.insert_str(0, "WPT_");
    }
    s.truncate(MAX_NAME_LEN);
    s
}

/// Derives an identifier not present in `used`.
///
/// A trailing-digit identifier increments its numeric suffix preserving the
/// zero-padded width; otherwise `_2`, `_3`, … are appended until unique.
pub fn next_unique_id(base: &str, used: &BTreeSet<String>) -> String {
    if !used.contains(base) {
        return base.to_string();
    }
    let split = base.len() - base.bytes().rev().take_while(u8::is_ascii_digit).count();
    if split < base.len() {
        let (root, digits) = base.split_at(split);
        let width = digits.len();
        if let Ok(mut n) = digits.parse::<u64>() {
            loop {
                n += 1;
                let cand = format!("{root}{n:0width$}");
                if !used.contains(&cand) {
                    return cand;
                }
            }
        }
    }
    let mut n = 2u64;
    loop {
        let cand = format!("{base}_{n}");
        if !used.contains(&cand) {
            return cand;
        }
        n += 1;
    }
}
