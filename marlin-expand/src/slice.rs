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

//! Array slice syntax, shared by variable expansion and command
//! substitution: `[1 2 -1]` after a variable name or a closing paren.
//! Indices are 1-based; negative indices count from the end.

use crate::ExpandError;
use marlin_wstr::Wchar;

/// Parses a slice starting at `input[start] == '['`.
///
/// Returns the indices and the position just past the closing `]`.
pub(crate) fn parse_slice(
    input: &[Wchar],
    start: usize,
) -> Result<(Vec<i64>, usize), ExpandError> {
    let bad = |pos: usize| ExpandError::syntax("Invalid index value", pos);

    let mut pos = start + 1;
    let mut indices = Vec::new();
    loop {
        while matches!(
            input.get(pos),
            Some(Wchar::InternalSep) | Some(Wchar::Char(' ' | '\t' | '\n'))
        ) {
            pos += 1;
        }
        match input.get(pos) {
            Some(Wchar::Char(']')) => return Ok((indices, pos + 1)),
            Some(_) => {
                let (value, end) = parse_integer(input, pos).ok_or_else(|| bad(pos))?;
                indices.push(value);
                pos = end;
            }
            None => return Err(bad(pos)),
        }
    }
}

fn parse_integer(input: &[Wchar], start: usize) -> Option<(i64, usize)> {
    let mut pos = start;
    let negative = match input.get(pos) {
        Some(Wchar::Char('-')) => {
            pos += 1;
            true
        }
        Some(Wchar::Char('+')) => {
            pos += 1;
            false
        }
        _ => false,
    };

    let mut value: i64 = 0;
    let digits_start = pos;
    while let Some(d) = input.get(pos).and_then(|a| a.as_char()).and_then(|c| c.to_digit(10)) {
        value = value.checked_mul(10)?.checked_add(i64::from(d))?;
        pos += 1;
    }
    if pos == digits_start {
        return None;
    }
    Some((if negative { -value } else { value }, pos))
}

/// Resolves a 1-based, possibly negative index against a list of `len`
/// elements. Zero and out-of-range indices resolve to `None`.
pub(crate) fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let resolved = if index < 0 {
        index + len as i64 + 1
    } else {
        index
    };
    if resolved >= 1 && resolved <= len as i64 {
        Some((resolved - 1) as usize)
    } else {
        None
    }
}
