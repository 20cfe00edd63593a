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

//! Command substitution pass.
//!
//! Finds the first parenthesized span, evaluates it in a subshell, and
//! splices each output line back into the surrounding text as structurally
//! literal atoms, bracketed by [`Wchar::InternalSep`] so adjacent text does
//! not fuse with the substituted content. An optional `[slice]` after the
//! closing paren selects and reorders the output lines. The pass recurses on
//! the tail until no substitutions remain.

use crate::slice;
use crate::{ErrorCause, ExpandError};
use marlin_env::Env;
use marlin_wstr::{WString, Wchar};

/// Finds the first `(`...`)` pair at or after `offset`.
///
/// Returns the positions of the parens. An unmatched `(` is an error; a
/// stray `)` with no opener is ignored.
pub(crate) fn locate_cmdsubst(
    input: &[Wchar],
    offset: usize,
) -> Result<Option<(usize, usize)>, ExpandError> {
    let Some(open) = input[offset..]
        .iter()
        .position(|a| a.is_char('('))
        .map(|i| i + offset)
    else {
        return Ok(None);
    };

    let mut depth = 0usize;
    for (i, atom) in input.iter().enumerate().skip(open) {
        if atom.is_char('(') {
            depth += 1;
        } else if atom.is_char(')') {
            depth -= 1;
            if depth == 0 {
                return Ok(Some((open, i)));
            }
        }
    }
    Err(ExpandError::syntax("Mismatched parenthesis", open))
}

pub(crate) fn expand_cmdsubst(
    env: &mut Env,
    input: WString,
    out: &mut Vec<WString>,
) -> Result<(), ExpandError> {
    let Some((open, close)) = locate_cmdsubst(&input, 0)? else {
        out.push(input);
        return Ok(());
    };

    let subcmd = input.substring(open + 1..close);
    let sub_output = env
        .evaluator
        .eval_subshell(&subcmd)
        .map_err(|inner| ExpandError {
            cause: ErrorCause::CmdSubstFailed(inner),
            offset: open,
        })?;
    let mut lines = sub_output.lines;

    let mut tail_begin = close + 1;
    if input.get(tail_begin) == Some(&Wchar::Char('[')) {
        let (indices, end) = slice::parse_slice(&input, tail_begin)?;
        let mut selected = Vec::with_capacity(indices.len());
        for index in indices {
            let resolved = slice::resolve_index(index, lines.len()).ok_or_else(|| {
                ExpandError::syntax("Invalid index value", tail_begin)
            })?;
            selected.push(lines[resolved].clone());
        }
        lines = selected;
        tail_begin = end;
    }

    // Expand any substitutions remaining in the tail, then combine.
    let mut tail_expand = Vec::new();
    expand_cmdsubst(env, input.substring(tail_begin..input.len()), &mut tail_expand)?;

    for line in &lines {
        for tail in &tail_expand {
            let mut whole = input.substring(0..open);
            whole.push(Wchar::InternalSep);
            whole.push_wstr(line);
            whole.push(Wchar::InternalSep);
            whole.push_wstr(tail);
            out.push(whole);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use marlin_env::eval::{EvalError, Evaluator, SubshellOutput};
    use marlin_wstr::WString;

    #[derive(Debug)]
    struct EchoLines(Vec<&'static str>);

    impl Evaluator for EchoLines {
        fn eval_subshell(&mut self, _source: &WString) -> Result<SubshellOutput, EvalError> {
            Ok(SubshellOutput {
                exit_status: 0,
                lines: self.0.iter().map(|s| WString::from(*s)).collect(),
            })
        }
    }

    fn env_with_lines(lines: Vec<&'static str>) -> Env {
        let mut env = Env::new_virtual();
        env.evaluator = Box::new(EchoLines(lines));
        env
    }

    #[test]
    fn locate_finds_first_pair() {
        let s = WString::from("a(b)c(d)");
        assert_eq!(locate_cmdsubst(&s, 0).unwrap(), Some((1, 3)));
        assert_eq!(locate_cmdsubst(&s, 4).unwrap(), Some((5, 7)));
        assert_eq!(locate_cmdsubst(&WString::from("abc"), 0).unwrap(), None);
    }

    #[test]
    fn locate_handles_nesting() {
        let s = WString::from("x(a(b)c)y");
        assert_eq!(locate_cmdsubst(&s, 0).unwrap(), Some((1, 7)));
    }

    #[test]
    fn unmatched_open_is_an_error() {
        let s = WString::from("a(b");
        assert_matches!(locate_cmdsubst(&s, 0), Err(ExpandError { offset: 1, .. }));
    }

    #[test]
    fn no_substitution_passes_through() {
        let mut env = env_with_lines(vec![]);
        let mut out = Vec::new();
        expand_cmdsubst(&mut env, WString::from("plain"), &mut out).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0], "plain");
    }

    #[test]
    fn each_line_fans_out() {
        let mut env = env_with_lines(vec!["one", "two"]);
        let mut out = Vec::new();
        expand_cmdsubst(&mut env, WString::from("x(cmd)y"), &mut out).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].to_string(), "xoney");
        assert_eq!(out[1].to_string(), "xtwoy");
        // The splice is bracketed so neighbors do not fuse.
        assert!(out[0].contains(&Wchar::InternalSep));
    }

    #[test]
    fn slice_selects_and_reorders_lines() {
        let mut env = env_with_lines(vec!["a", "b", "c"]);
        let mut out = Vec::new();
        expand_cmdsubst(&mut env, WString::from("(cmd)[3 1]"), &mut out).unwrap();
        let values: Vec<String> = out.iter().map(|s| s.to_string()).collect();
        assert_eq!(values, ["c", "a"]);
    }

    #[test]
    fn negative_slice_counts_from_the_end() {
        let mut env = env_with_lines(vec!["a", "b", "c"]);
        let mut out = Vec::new();
        expand_cmdsubst(&mut env, WString::from("(cmd)[-1]"), &mut out).unwrap();
        assert_eq!(out[0].to_string(), "c");
    }

    #[test]
    fn out_of_range_slice_is_an_error() {
        let mut env = env_with_lines(vec!["a"]);
        let mut out = Vec::new();
        let err = expand_cmdsubst(&mut env, WString::from("(cmd)[2]"), &mut out).unwrap_err();
        assert_matches!(err.cause, ErrorCause::Syntax(_));
    }

    #[test]
    fn empty_output_drops_the_argument() {
        let mut env = env_with_lines(vec![]);
        let mut out = Vec::new();
        expand_cmdsubst(&mut env, WString::from("x(cmd)y"), &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn evaluator_failure_is_reported() {
        let mut env = Env::new_virtual();
        let mut out = Vec::new();
        let err = expand_cmdsubst(&mut env, WString::from("(cmd)"), &mut out).unwrap_err();
        assert_matches!(err.cause, ErrorCause::CmdSubstFailed(_));
        assert_eq!(err.offset, 0);
    }
}
