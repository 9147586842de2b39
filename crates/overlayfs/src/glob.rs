//! Windows-style wildcard matching for directory searches.
//!
//! `?` matches exactly one character, `*` matches any run of characters
//! (including none), everything else matches itself ignoring case. The whole
//! name must be consumed.

use crate::path::chars_eq;

/// Match a single name against a search pattern
pub fn matches(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();
    match_from(&pattern, &name)
}

fn match_from(pattern: &[char], name: &[char]) -> bool {
    let mut p = 0;
    let mut n = 0;

    while p < pattern.len() {
        match pattern[p] {
            '?' => {
                if n == name.len() {
                    return false;
                }
                n += 1;
            }
            '*' => {
                let rest = &pattern[p + 1..];
                if rest.is_empty() {
                    return true;
                }
                // Try every split point, including the empty remainder.
                return (n..=name.len()).any(|split| match_from(rest, &name[split..]));
            }
            literal => {
                if n == name.len() || !chars_eq(name[n], literal) {
                    return false;
                }
                n += 1;
            }
        }
        p += 1;
    }

    n == name.len()
}
