// This file is part of marlin, a friendly interactive shell.
// Copyright (C) 2025 the marlin developers

//! This crate provides the wildcard predicate used by the marlin expansion
//! pipeline and the fuzzy match ranking used by the completion machinery.
//!
//! [`wildcard_match`] answers whether an internal-form pattern (containing
//! [`Wchar::AnyChar`], [`Wchar::AnyString`], or [`Wchar::AnyStringRecursive`]
//! atoms) matches a path segment. Leading dots are never matched by a
//! wildcard, only by a literal dot, and the `.` and `..` entries match only
//! an exactly equal pattern.
//!
//! [`fuzzy_match`] ranks how well a typed prefix matches a candidate string.
//! The ranking is an ordered sequence of match classes from exact equality
//! down to subsequence-by-insertions-only; within a class, candidates that
//! leave less unmatched text, then earlier match positions, rank better.

mod fuzzy;

pub use fuzzy::{FuzzyMatch, MatchKind, eq_case_insensitive, fuzzy_match};

use marlin_wstr::Wchar;

/// Whether `text` matches the wildcard `pattern`.
///
/// `text` is one path segment in internal form; sentinel atoms in the pattern
/// behave as described in the crate documentation.
#[must_use]
pub fn wildcard_match(text: &[Wchar], pattern: &[Wchar]) -> bool {
    match_internal(text, pattern, true)
}

fn is_dot_or_dot_dot(text: &[Wchar]) -> bool {
    matches!(
        text,
        [Wchar::Char('.')] | [Wchar::Char('.'), Wchar::Char('.')]
    )
}

fn match_internal(text: &[Wchar], pattern: &[Wchar], is_first: bool) -> bool {
    if text.is_empty() && pattern.is_empty() {
        return true;
    }

    // `.` and `..` are never matched by wildcards, only by themselves.
    if is_first && is_dot_or_dot_dot(text) {
        return text == pattern;
    }

    match pattern.first() {
        Some(Wchar::AnyString | Wchar::AnyStringRecursive) => {
            if is_first && text.first() == Some(&Wchar::Char('.')) {
                return false;
            }
            // A trailing star matches whatever is left.
            if pattern.len() == 1 {
                return true;
            }
            (0..=text.len()).any(|i| match_internal(&text[i..], &pattern[1..], false))
        }
        _ if text.is_empty() => false,
        Some(Wchar::AnyChar) => {
            if is_first && text[0] == Wchar::Char('.') {
                return false;
            }
            match_internal(&text[1..], &pattern[1..], false)
        }
        Some(&head) => text[0] == head && match_internal(&text[1..], &pattern[1..], false),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marlin_wstr::WString;

    fn m(text: &str, pattern_special: &[Wchar]) -> bool {
        wildcard_match(&WString::from(text), pattern_special)
    }

    fn pat(parts: &str) -> Vec<Wchar> {
        // Test helper: '*' and '?' in the input become wildcard atoms, "**"
        // becomes the recursive wildcard.
        let mut out = Vec::new();
        for c in parts.chars() {
            match c {
                '*' => {
                    if out.last() == Some(&Wchar::AnyString) {
                        out.pop();
                        out.push(Wchar::AnyStringRecursive);
                    } else {
                        out.push(Wchar::AnyString);
                    }
                }
                '?' => out.push(Wchar::AnyChar),
                _ => out.push(Wchar::Char(c)),
            }
        }
        out
    }

    #[test]
    fn empty_matches_empty() {
        assert!(m("", &pat("")));
        assert!(!m("a", &pat("")));
        assert!(!m("", &pat("a")));
    }

    #[test]
    fn literal_patterns_require_equality() {
        assert!(m("abc", &pat("abc")));
        assert!(!m("abc", &pat("abd")));
        assert!(!m("abc", &pat("ab")));
        assert!(!m("ab", &pat("abc")));
    }

    #[test]
    fn star_matches_any_run() {
        assert!(m("abc", &pat("*")));
        assert!(m("abc", &pat("a*")));
        assert!(m("abc", &pat("*c")));
        assert!(m("abc", &pat("a*c")));
        assert!(m("ac", &pat("a*c")));
        assert!(!m("abd", &pat("a*c")));
    }

    #[test]
    fn question_matches_one_character() {
        assert!(m("abc", &pat("a?c")));
        assert!(!m("ac", &pat("a?c")));
        assert!(!m("abbc", &pat("a?c")));
    }

    #[test]
    fn leading_dot_requires_literal_dot() {
        assert!(!m(".hidden", &pat("*")));
        assert!(!m(".hidden", &pat("?hidden")));
        assert!(m(".hidden", &pat(".*")));
        assert!(m(".hidden", &pat(".hidden")));
        // A dot later in the name is ordinary.
        assert!(m("a.txt", &pat("*.txt")));
    }

    #[test]
    fn dot_and_dot_dot_match_only_themselves() {
        assert!(!m(".", &pat("*")));
        assert!(!m(".", &pat("?")));
        assert!(m(".", &pat(".")));
        assert!(!m("..", &pat("*")));
        assert!(!m("..", &pat(".?")));
        assert!(m("..", &pat("..")));
    }

    #[test]
    fn recursive_star_matches_within_segment() {
        assert!(m("abc", &pat("**")));
        assert!(m("abc", &pat("a**")));
        assert!(!m(".abc", &pat("**")));
    }

    #[test]
    fn star_never_matches_hidden_even_with_suffix() {
        assert!(!m(".txt", &pat("*.txt")));
        assert!(!m(".txt", &pat("*txt")));
    }
}
