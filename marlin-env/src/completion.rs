// This file is part of marlin, a friendly interactive shell.
// Copyright (C) 2025 the marlin developers
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Completion records.
//!
//! A [`Completion`] is one candidate offered to the user: the text to insert
//! (or to replace the current token with when
//! [`CompleteFlags::REPLACES_TOKEN`] is set), an optional description shown
//! by the pager, and a [`FuzzyMatch`] rank that orders the candidate list.

use bitflags::bitflags;
use marlin_wildcard::FuzzyMatch;
use marlin_wstr::{WString, Wchar};
use std::cmp::Ordering;

bitflags! {
    /// Per-candidate behavior flags.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct CompleteFlags: u32 {
        /// Do not append a trailing space when this candidate is inserted.
        const NO_SPACE = 1 << 0;
        /// The candidate text replaces the whole token rather than extending
        /// it.
        const REPLACES_TOKEN = 1 << 1;
        /// Derive [`CompleteFlags::NO_SPACE`] from the candidate's last
        /// character when the record is created.
        const AUTO_SPACE = 1 << 2;
        /// The candidate is already in surface form; do not escape it on
        /// insertion.
        const DONT_ESCAPE = 1 << 3;
        /// The candidate matched only ignoring case.
        const NO_CASE = 1 << 4;
    }
}

/// Characters that suppress the trailing space under
/// [`CompleteFlags::AUTO_SPACE`].
const NO_SPACE_TERMINATORS: &str = "/=@:";

/// One completion candidate.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Completion {
    pub completion: WString,
    pub description: String,
    pub flags: CompleteFlags,
    pub rank: FuzzyMatch,
}

impl Completion {
    /// A bare candidate: no description, no flags, exact rank.
    #[must_use]
    pub fn new(completion: WString) -> Self {
        Completion {
            completion,
            description: String::new(),
            flags: CompleteFlags::empty(),
            rank: FuzzyMatch::exact(),
        }
    }

    /// A fully specified candidate.
    ///
    /// [`CompleteFlags::AUTO_SPACE`] is resolved here: it is removed from the
    /// stored flags, and [`CompleteFlags::NO_SPACE`] is added when the
    /// candidate ends in one of `/=@:`.
    #[must_use]
    pub fn with_details(
        completion: WString,
        description: impl Into<String>,
        mut flags: CompleteFlags,
        rank: FuzzyMatch,
    ) -> Self {
        if flags.contains(CompleteFlags::AUTO_SPACE) {
            flags.remove(CompleteFlags::AUTO_SPACE);
            let ends_special = completion
                .last()
                .and_then(|a| a.as_char())
                .is_some_and(|c| NO_SPACE_TERMINATORS.contains(c));
            if ends_special {
                flags.insert(CompleteFlags::NO_SPACE);
            }
        }
        Completion {
            completion,
            description: description.into(),
            flags,
            rank,
        }
    }

    /// Prepends `prefix` to the candidate text, but only when the candidate
    /// replaces the whole token; a suffix-style candidate is left alone.
    pub fn prepend_token_prefix(&mut self, prefix: &[Wchar]) {
        if self.flags.contains(CompleteFlags::REPLACES_TOKEN) {
            let mut joined = WString::from(prefix);
            joined.push_wstr(&self.completion);
            self.completion = joined;
        }
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

/// Filename ordering for completion lists: dotfiles after non-dotfiles, then
/// case-folded codepoint order, then raw codepoint order as the tie breaker.
#[must_use]
pub fn compare_names(a: &[Wchar], b: &[Wchar]) -> Ordering {
    let a_hidden = a.first() == Some(&Wchar::Char('.'));
    let b_hidden = b.first() == Some(&Wchar::Char('.'));
    a_hidden
        .cmp(&b_hidden)
        .then_with(|| {
            a.iter()
                .map(|&c| fold(c))
                .cmp(b.iter().map(|&c| fold(c)))
        })
        .then_with(|| a.cmp(b))
}

/// Sorts candidates by rank, then by [`compare_names`] on the candidate text.
pub fn sort_completions(completions: &mut [Completion]) {
    completions.sort_by(|a, b| {
        a.rank
            .cmp(&b.rank)
            .then_with(|| compare_names(&a.completion, &b.completion))
    });
}

/// Removes adjacent candidates with identical text, keeping the first
/// (best-ranked, once sorted) of each run.
pub fn dedup_completions(completions: &mut Vec<Completion>) {
    completions.dedup_by(|b, a| a.completion == b.completion);
}
