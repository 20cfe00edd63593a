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

//! Brace expansion pass.
//!
//! `{a,b}` fans the argument out into one copy per alternative. Expansion
//! proceeds left to right and recurses, so `{a,b}{1,2}` yields
//! `a1 a2 b1 b2`. Unmatched braces are a syntax error, except in completion
//! mode where an unterminated `{` is repaired by appending a synthetic
//! closer and re-running the pass.

use crate::ExpandError;
use marlin_wstr::{WString, Wchar};

struct Scan {
    begin: Option<usize>,
    end: Option<usize>,
    last_sep: Option<usize>,
    unmatched: Option<usize>,
    excess_close: Option<usize>,
}

fn scan(input: &[Wchar]) -> Scan {
    let mut begin = None;
    let mut end = None;
    let mut last_sep = None;
    let mut depth = 0i32;
    let mut open_stack = Vec::new();
    let mut excess_close = None;

    for (pos, &atom) in input.iter().enumerate() {
        match atom {
            Wchar::BraceBegin => {
                if depth == 0 && begin.is_none() {
                    begin = Some(pos);
                }
                open_stack.push(pos);
                depth += 1;
            }
            Wchar::BraceEnd => {
                depth -= 1;
                open_stack.pop();
                if depth < 0 && excess_close.is_none() {
                    excess_close = Some(pos);
                    depth = 0;
                }
                if depth == 0 && end.is_none() && begin.is_some() {
                    end = Some(pos);
                }
            }
            Wchar::BraceSep => {
                if depth == 1 && end.is_none() && begin.is_some() {
                    last_sep = Some(pos);
                }
            }
            _ => {}
        }
    }

    Scan {
        begin,
        end,
        last_sep,
        unmatched: open_stack.first().copied(),
        excess_close,
    }
}

pub(crate) fn expand_braces(
    input: WString,
    completion_mode: bool,
    out: &mut Vec<WString>,
) -> Result<(), ExpandError> {
    let scan = scan(&input);

    if let Some(pos) = scan.excess_close {
        return Err(ExpandError::syntax("Mismatched braces", pos));
    }

    if let Some(open) = scan.unmatched {
        if !completion_mode {
            return Err(ExpandError::syntax("Mismatched braces", open));
        }
        // Repair the partial token: keep the text after the last separator
        // (the alternative being typed) and close the brace.
        let mut repaired;
        if let Some(sep) = scan.last_sep {
            repaired = input.substring(0..scan.begin.map_or(open, |b| b) + 1);
            repaired.extend(input[sep + 1..].iter().copied());
        } else {
            repaired = input.clone();
        }
        repaired.push(Wchar::BraceEnd);
        return expand_braces(repaired, true, out);
    }

    let (Some(begin), Some(end)) = (scan.begin, scan.end) else {
        out.push(input);
        return Ok(());
    };

    // Emit one copy per alternative at depth one.
    let mut depth = 0i32;
    let mut item_begin = begin + 1;
    for pos in begin + 1..=end {
        let atom = input[pos];
        if depth == 0 && (atom == Wchar::BraceSep || pos == end) {
            let mut whole = input.substring(0..begin);
            whole.extend(input[item_begin..pos].iter().copied());
            whole.extend(input[end + 1..].iter().copied());
            expand_braces(whole, completion_mode, out)?;
            item_begin = pos + 1;
            if pos == end {
                break;
            }
        }
        match atom {
            Wchar::BraceBegin => depth += 1,
            Wchar::BraceEnd => depth -= 1,
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use marlin_escape::{UnescapeFlags, unescape};

    fn expand(surface: &str, completion: bool) -> Result<Vec<String>, ExpandError> {
        let input = unescape(surface, UnescapeFlags::SPECIAL | UnescapeFlags::INCOMPLETE)
            .expect("test input must unescape");
        let mut out = Vec::new();
        expand_braces(input, completion, &mut out)?;
        Ok(out.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn no_braces_pass_through() {
        assert_eq!(expand("abc", false).unwrap(), ["abc"]);
    }

    #[test]
    fn simple_alternatives() {
        assert_eq!(expand("{a,b}", false).unwrap(), ["a", "b"]);
    }

    #[test]
    fn prefix_and_suffix_are_kept() {
        assert_eq!(expand("x{a,b}y", false).unwrap(), ["xay", "xby"]);
    }

    #[test]
    fn two_groups_expand_left_to_right() {
        assert_eq!(
            expand("{a,b}{1,2}", false).unwrap(),
            ["a1", "a2", "b1", "b2"]
        );
    }

    #[test]
    fn nested_groups() {
        assert_eq!(expand("{a,{b,c}}", false).unwrap(), ["a", "b", "c"]);
    }

    #[test]
    fn empty_alternative_is_allowed() {
        assert_eq!(expand("ab{,s}", false).unwrap(), ["ab", "abs"]);
    }

    #[test]
    fn unmatched_open_is_an_error_in_evaluation() {
        assert!(expand("{a,b", false).is_err());
    }

    #[test]
    fn unmatched_close_is_always_an_error() {
        assert!(expand("a}b", false).is_err());
        assert!(expand("a}b", true).is_err());
    }

    #[test]
    fn completion_mode_repairs_unmatched_open() {
        assert_eq!(expand("{a,b", true).unwrap(), ["b"]);
        assert_eq!(expand("{ab", true).unwrap(), ["ab"]);
    }
}
