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

//! Interface to the shell's parser and evaluator.
//!
//! Command substitution hands the text between parentheses to
//! [`Evaluator::eval_subshell`] and splices the captured output back into the
//! argument. Completion condition scripts and argument generators go through
//! the same interface; only the exit status matters for conditions.

use marlin_wstr::WString;
use thiserror::Error;

/// Captured result of running a subshell.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SubshellOutput {
    pub exit_status: i32,
    /// Standard output split on newlines, without the newlines.
    pub lines: Vec<WString>,
}

impl SubshellOutput {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.exit_status == 0
    }
}

/// Error from the evaluator.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum EvalError {
    #[error("error while evaluating command substitution")]
    SubshellFailed,
    #[error("command substitution is not supported in this context")]
    NotSupported,
}

/// The shell's parser and evaluator, reduced to what the core calls.
pub trait Evaluator: std::fmt::Debug {
    /// Runs `source` as a subshell and captures its output.
    fn eval_subshell(&mut self, source: &WString) -> Result<SubshellOutput, EvalError>;
}

/// Evaluator that rejects every subshell; the default in contexts that have
/// no interpreter wired in.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullEvaluator;

impl Evaluator for NullEvaluator {
    fn eval_subshell(&mut self, _source: &WString) -> Result<SubshellOutput, EvalError> {
        Err(EvalError::NotSupported)
    }
}
