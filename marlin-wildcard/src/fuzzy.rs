// This file is part of marlin, a friendly interactive shell.
// Copyright (C) 2025 the marlin developers

//! Fuzzy match ranking for completion candidates.

use marlin_wstr::Wchar;

/// How a typed prefix matched a candidate, from best to worst.
///
/// The derived ordering is the ranking: smaller is better.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum MatchKind {
    /// The candidate equals the typed string.
    Exact,
    /// The typed string is a prefix of the candidate.
    Prefix,
    /// Equal ignoring case.
    CaseInsensitiveExact,
    /// Prefix ignoring case.
    CaseInsensitivePrefix,
    /// The typed string occurs somewhere inside the candidate.
    Substring,
    /// Substring ignoring case.
    CaseInsensitiveSubstring,
    /// Every typed character occurs in order inside the candidate.
    SubsequenceInsertionsOnly,
    /// No match at all.
    None,
}

impl MatchKind {
    /// Whether this class guarantees the typed string is a (case-matched or
    /// case-folded) prefix of the candidate, so the completion can be
    /// appended rather than replacing the token.
    #[must_use]
    pub fn shares_prefix(self) -> bool {
        self <= MatchKind::CaseInsensitivePrefix
    }

    /// Whether inserting this completion must replace the typed token
    /// because the match diverges from what was typed.
    #[must_use]
    pub fn requires_full_replacement(self) -> bool {
        self >= MatchKind::CaseInsensitiveExact
    }
}

/// Rank of one candidate against the typed string.
///
/// Distances measure the amount of candidate text not covered by the match
/// (`distance_first`) and the offset of the match within the candidate
/// (`distance_second`), so the derived ordering prefers tighter and earlier
/// matches within a class.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct FuzzyMatch {
    pub kind: MatchKind,
    pub distance_first: usize,
    pub distance_second: usize,
}

impl FuzzyMatch {
    /// The best possible rank.
    #[must_use]
    pub fn exact() -> Self {
        FuzzyMatch {
            kind: MatchKind::Exact,
            distance_first: 0,
            distance_second: 0,
        }
    }

    /// The worst possible rank; no match.
    #[must_use]
    pub fn none() -> Self {
        FuzzyMatch {
            kind: MatchKind::None,
            distance_first: 0,
            distance_second: 0,
        }
    }

    #[must_use]
    pub fn is_match(self) -> bool {
        self.kind != MatchKind::None
    }
}

impl Default for FuzzyMatch {
    fn default() -> Self {
        FuzzyMatch::none()
    }
}

fn fold(a: Wchar) -> Wchar {
    match a {
        Wchar::Char(c) => {
            let mut lower = c.to_lowercase();
            match (lower.next(), lower.next()) {
                (Some(l), None) => Wchar::Char(l),
                _ => Wchar::Char(c),
            }
        }
        other => other,
    }
}

/// Whether two atom sequences are equal under simple case folding.
#[must_use]
pub fn eq_case_insensitive(a: &[Wchar], b: &[Wchar]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| fold(x) == fold(y))
}

fn eq_ci(a: &[Wchar], b: &[Wchar]) -> bool {
    eq_case_insensitive(a, b)
}

fn find_at(haystack: &[Wchar], needle: &[Wchar], ci: bool) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&i| {
        let window = &haystack[i..i + needle.len()];
        if ci { eq_ci(window, needle) } else { window == needle }
    })
}

fn subsequence_in(needle: &[Wchar], haystack: &[Wchar]) -> bool {
    if needle.len() > haystack.len() {
        return false;
    }
    let mut hay = haystack.iter();
    needle
        .iter()
        .all(|c| hay.by_ref().any(|h| h == c))
}

/// Ranks how well the typed string matches `candidate`.
///
/// The first applicable class in the [`MatchKind`] order wins.
#[must_use]
pub fn fuzzy_match(typed: &[Wchar], candidate: &[Wchar]) -> FuzzyMatch {
    let slack = candidate.len().saturating_sub(typed.len());

    if typed == candidate {
        return FuzzyMatch::exact();
    }
    if candidate.len() >= typed.len() && candidate[..typed.len()] == *typed {
        return FuzzyMatch {
            kind: MatchKind::Prefix,
            distance_first: slack,
            distance_second: 0,
        };
    }
    if eq_ci(typed, candidate) {
        return FuzzyMatch {
            kind: MatchKind::CaseInsensitiveExact,
            distance_first: 0,
            distance_second: 0,
        };
    }
    if candidate.len() >= typed.len() && eq_ci(&candidate[..typed.len()], typed) {
        return FuzzyMatch {
            kind: MatchKind::CaseInsensitivePrefix,
            distance_first: slack,
            distance_second: 0,
        };
    }
    if let Some(location) = find_at(candidate, typed, false) {
        return FuzzyMatch {
            kind: MatchKind::Substring,
            distance_first: slack,
            distance_second: location,
        };
    }
    if let Some(location) = find_at(candidate, typed, true) {
        return FuzzyMatch {
            kind: MatchKind::CaseInsensitiveSubstring,
            distance_first: slack,
            distance_second: location,
        };
    }
    if subsequence_in(typed, candidate) {
        return FuzzyMatch {
            kind: MatchKind::SubsequenceInsertionsOnly,
            distance_first: slack,
            distance_second: 0,
        };
    }
    FuzzyMatch::none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use marlin_wstr::WString;

    fn rank(typed: &str, candidate: &str) -> FuzzyMatch {
        fuzzy_match(&WString::from(typed), &WString::from(candidate))
    }

    #[test]
    fn classes_in_order() {
        assert_eq!(rank("foo", "foo").kind, MatchKind::Exact);
        assert_eq!(rank("foo", "foobar").kind, MatchKind::Prefix);
        assert_eq!(rank("FOO", "foo").kind, MatchKind::CaseInsensitiveExact);
        assert_eq!(rank("FOO", "foobar").kind, MatchKind::CaseInsensitivePrefix);
        assert_eq!(rank("oba", "foobar").kind, MatchKind::Substring);
        assert_eq!(rank("OBA", "foobar").kind, MatchKind::CaseInsensitiveSubstring);
        assert_eq!(rank("fbr", "foobar").kind, MatchKind::SubsequenceInsertionsOnly);
        assert_eq!(rank("xyz", "foobar").kind, MatchKind::None);
    }

    #[test]
    fn prefix_distance_is_unmatched_length() {
        assert_eq!(rank("foo", "foobar").distance_first, 3);
        assert_eq!(rank("foo", "foox").distance_first, 1);
    }

    #[test]
    fn substring_prefers_earlier_matches() {
        let early = rank("b", "abcb");
        let late = rank("b", "accb");
        assert_eq!(early.kind, MatchKind::Substring);
        assert_eq!(early.distance_second, 1);
        assert_eq!(late.distance_second, 3);
        assert!(early < late);
    }

    #[test]
    fn ordering_prefers_better_classes() {
        assert!(rank("foo", "foo") < rank("foo", "foobar"));
        assert!(rank("foo", "foobar") < rank("FOO", "foobar"));
        assert!(rank("OBA", "foobar") < rank("fbr", "foobar"));
        assert!(FuzzyMatch::exact() < FuzzyMatch::none());
    }

    #[test]
    fn empty_typed_string_is_a_prefix_of_everything() {
        assert_eq!(rank("", "anything").kind, MatchKind::Prefix);
        assert_eq!(rank("", "").kind, MatchKind::Exact);
    }

    #[test]
    fn subsequence_requires_order() {
        assert_eq!(rank("ac", "abc").kind, MatchKind::SubsequenceInsertionsOnly);
        assert_eq!(rank("ca", "abc").kind, MatchKind::None);
    }
}
