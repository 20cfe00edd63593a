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

//! Argument expansion.
//!
//! [`expand_string`] turns one raw argument token into the list of arguments
//! it stands for, applying in fixed order: command substitution, variable
//! expansion (with array slicing), brace expansion, home directory expansion,
//! process expansion, and wildcard expansion. Each pass consumes a list of
//! strings and produces a possibly larger list; the first error aborts the
//! whole pipeline.
//!
//! The pipeline works on the internal wide form: the input is unescaped once
//! at the head (tolerating incomplete tokens, which the completion path
//! feeds us), and each pass dispatches on sentinel atoms rather than raw
//! characters, so quoted text can never be mistaken for syntax.
//!
//! With [`ExpandFlags::FOR_COMPLETIONS`] the pipeline produces completion
//! candidates instead of arguments: the wildcard walk runs in completion
//! mode even for wildcard-free strings, unmatched braces are repaired, and a
//! process expansion short-circuits into candidate output.

mod brace;
mod cmdsubst;
pub mod glob;
mod pid;
mod slice;
mod tilde;
mod variable;

use bitflags::bitflags;
use marlin_env::Env;
use marlin_env::completion::Completion;
use marlin_env::eval::EvalError;
use marlin_escape::{UnescapeFlags, unescape};
use marlin_wstr::{WString, Wchar};
use thiserror::Error;

pub use glob::{WildcardResult, wildcard_complete, wildcard_expand_string};

bitflags! {
    /// Options controlling [`expand_string`].
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct ExpandFlags: u32 {
        /// Fail if the input contains a command substitution.
        const SKIP_CMDSUBST = 1 << 0;
        /// Leave `$` sentinels as literal dollars instead of expanding.
        const SKIP_VARIABLES = 1 << 1;
        /// Do not walk the filesystem; wildcard atoms revert to `*`/`?`.
        const SKIP_WILDCARDS = 1 << 2;
        /// Produce completion candidates instead of arguments.
        const FOR_COMPLETIONS = 1 << 3;
        /// Only emit files executable by the current user.
        const EXECUTABLES_ONLY = 1 << 4;
        /// Only emit directories.
        const DIRECTORIES_ONLY = 1 << 5;
        /// Do not compute file descriptions.
        const NO_DESCRIPTIONS = 1 << 6;
        /// Do not match jobs in process expansion.
        const SKIP_JOBS = 1 << 7;
        /// Do not expand home directories.
        const SKIP_HOME = 1 << 8;
        /// Allow fuzzy matching in the wildcard walk.
        const FUZZY_MATCH = 1 << 9;
        /// Do not fuzz intermediate directory names, only the last segment.
        const NO_FUZZY_DIRECTORIES = 1 << 10;
        /// Expansion in support of `cd`: descend unique directory chains.
        const SPECIAL_FOR_CD = 1 << 11;
        /// Expansion for the `cd` autosuggestion rather than completion.
        const SPECIAL_FOR_CD_AUTOSUGGEST = 1 << 12;
        /// Expansion in support of external command completion.
        const SPECIAL_FOR_COMMAND = 1 << 13;
    }
}

/// Non-error result of one expansion.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Outcome {
    /// No wildcard was involved.
    #[default]
    Ok,
    /// A wildcard was present but matched no files. The caller decides
    /// whether that is an error.
    WildcardNoMatch,
    /// A wildcard was present and matched at least one file.
    WildcardMatched,
}

/// Types of errors that abort the expansion pipeline.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ErrorCause {
    /// Unmatched brace, paren, or quote; bad variable name; bad escape; bad
    /// slice; unknown job.
    #[error("{0}")]
    Syntax(String),
    /// A command substitution appeared under [`ExpandFlags::SKIP_CMDSUBST`].
    #[error("command substitutions not allowed")]
    CmdSubstForbidden,
    /// The evaluator failed to run a command substitution.
    #[error("error while evaluating command substitution")]
    CmdSubstFailed(EvalError),
    /// [`expand_one`] produced zero or several results.
    #[error("expansion produced more than one result")]
    MultipleResults,
    /// A cancellation check fired during the walk.
    #[error("expansion was cancelled")]
    Cancelled,
}

/// Expansion failure with the character offset the diagnostic points at.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("{cause}")]
pub struct ExpandError {
    pub cause: ErrorCause,
    pub offset: usize,
}

impl ExpandError {
    pub(crate) fn syntax(message: impl Into<String>, offset: usize) -> Self {
        ExpandError {
            cause: ErrorCause::Syntax(message.into()),
            offset,
        }
    }

    /// Renders the error against the surface text it came from.
    #[must_use]
    pub fn render(&self, source: &str) -> String {
        marlin_env::message::render_error(&self.cause.to_string(), source, self.offset, "here")
    }
}

/// Characters whose absence lets a token skip the pipeline entirely.
fn expand_is_clean(input: &str) -> bool {
    let mut chars = input.chars();
    match chars.next() {
        None => return true,
        Some('~' | '%') => return false,
        Some(c) if is_unclean(c) => return false,
        Some(_) => {}
    }
    !chars.any(is_unclean)
}

fn is_unclean(c: char) -> bool {
    matches!(c, '$' | '*' | '?' | '\\' | '"' | '\'' | '(' | ')' | '{' | '}') || (c as u32) < 32
}

/// Strips [`Wchar::InternalSep`] atoms; with `convert`, wildcard atoms revert
/// to their surface characters.
fn remove_internal_separators(input: WString, convert: bool) -> WString {
    let mut out = WString::with_capacity(input.len());
    for atom in input.atoms() {
        match atom {
            Wchar::InternalSep => {}
            Wchar::AnyChar if convert => out.push_char('?'),
            Wchar::AnyString if convert => out.push_char('*'),
            Wchar::AnyStringRecursive if convert => {
                out.push_char('*');
                out.push_char('*');
            }
            other => out.push(other),
        }
    }
    out
}

/// Expands `input` into `output`.
///
/// The result lists every argument the token stands for, in order. See the
/// module documentation for the pass sequence, [`ExpandFlags`] for the
/// switches, and [`Outcome`] for the wildcard status reporting.
pub fn expand_string(
    env: &mut Env,
    input: &str,
    flags: ExpandFlags,
    output: &mut Vec<Completion>,
) -> Result<Outcome, ExpandError> {
    let for_completions = flags.contains(ExpandFlags::FOR_COMPLETIONS);

    if !for_completions && expand_is_clean(input) {
        output.push(Completion::new(WString::from(input)));
        return Ok(Outcome::Ok);
    }

    let internal = unescape(input, UnescapeFlags::SPECIAL | UnescapeFlags::INCOMPLETE)
        .map_err(|e| ExpandError::syntax(e.to_string(), e.offset))?;

    // Command substitution.
    let mut after_cmdsubst = Vec::new();
    if flags.contains(ExpandFlags::SKIP_CMDSUBST) {
        match cmdsubst::locate_cmdsubst(&internal, 0) {
            Ok(None) => after_cmdsubst.push(internal),
            Ok(Some((open, _))) => {
                return Err(ExpandError {
                    cause: ErrorCause::CmdSubstForbidden,
                    offset: open,
                });
            }
            Err(error) => {
                return Err(ExpandError {
                    cause: ErrorCause::CmdSubstForbidden,
                    offset: error.offset,
                });
            }
        }
    } else {
        cmdsubst::expand_cmdsubst(env, internal, &mut after_cmdsubst)?;
    }

    // Variable expansion.
    let mut after_variables = Vec::new();
    for next in after_cmdsubst {
        if flags.contains(ExpandFlags::SKIP_VARIABLES) {
            after_variables.push(variable::skip_variables(next));
        } else {
            variable::expand_variables(env, next, &mut after_variables)?;
        }
    }

    // Brace expansion.
    let mut after_braces = Vec::new();
    for next in after_variables {
        brace::expand_braces(next, for_completions, &mut after_braces)?;
    }

    // Home directory and process expansion.
    let mut after_prefixes = Vec::new();
    for mut next in after_braces {
        if !flags.contains(ExpandFlags::SKIP_HOME) {
            tilde::expand_tilde(env, &mut next);
        }

        if next.first() == Some(&Wchar::ProcessExpand) {
            if for_completions {
                // Process completions trump everything else for this token.
                pid::complete_pid(env, &next, flags, output);
                return Ok(Outcome::Ok);
            }
            pid::expand_pid(env, &next, flags, &mut after_prefixes)?;
        } else {
            after_prefixes.push(next);
        }
    }

    // Wildcard expansion.
    let mut result = Outcome::Ok;
    let working_directory = WString::new();
    for next in after_prefixes {
        let skip_wildcards = flags.contains(ExpandFlags::SKIP_WILDCARDS);
        let next = remove_internal_separators(next, skip_wildcards);

        let wants_walk = (for_completions && !skip_wildcards) || next.has_wildcard();
        if !wants_walk {
            if !for_completions {
                output.push(Completion::new(next));
            }
            continue;
        }

        if for_completions {
            match wildcard_expand_string(env, &next, &working_directory, flags, output) {
                WildcardResult::Cancelled => {
                    return Err(ExpandError {
                        cause: ErrorCause::Cancelled,
                        offset: 0,
                    });
                }
                WildcardResult::Match | WildcardResult::NoMatch => {}
            }
        } else {
            let mut matches = Vec::new();
            match wildcard_expand_string(env, &next, &working_directory, flags, &mut matches) {
                WildcardResult::Cancelled => {
                    return Err(ExpandError {
                        cause: ErrorCause::Cancelled,
                        offset: 0,
                    });
                }
                WildcardResult::NoMatch => {
                    if result == Outcome::Ok {
                        result = Outcome::WildcardNoMatch;
                    }
                }
                WildcardResult::Match => {
                    result = Outcome::WildcardMatched;
                    matches.sort_by(|a, b| a.completion.cmp(&b.completion));
                    output.append(&mut matches);
                }
            }
        }
    }

    Ok(result)
}

/// Like [`expand_string`], but requires the expansion to produce exactly one
/// argument and returns it.
pub fn expand_one(env: &mut Env, input: &str, flags: ExpandFlags) -> Result<WString, ExpandError> {
    let mut completions = Vec::new();
    expand_string(env, input, flags, &mut completions)?;
    if completions.len() == 1 {
        Ok(completions.remove(0).completion)
    } else {
        Err(ExpandError {
            cause: ErrorCause::MultipleResults,
            offset: 0,
        })
    }
}

/// Expands a command token into the command and its arguments, without
/// running command substitutions. The first result is the command; a
/// list-valued variable like `$PAGER` fans out into command plus arguments.
pub fn expand_to_command_and_args(
    env: &mut Env,
    input: &str,
    flags: ExpandFlags,
) -> Result<(WString, Vec<WString>), ExpandError> {
    let mut completions = Vec::new();
    expand_string(
        env,
        input,
        flags | ExpandFlags::SKIP_CMDSUBST | ExpandFlags::SKIP_JOBS,
        &mut completions,
    )?;
    let mut items = completions.into_iter().map(|c| c.completion);
    let command = items.next().unwrap_or_default();
    Ok((command, items.collect()))
}
