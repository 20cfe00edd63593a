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

//! Tab completion for marlin.
//!
//! This crate turns a command line and a cursor position into a ranked list
//! of [`Completion`](marlin_env::completion::Completion) candidates. The
//! [`Completer`] classifies the token under the cursor and dispatches to
//! command, option, argument, variable, or user completion; the
//! [`CompletionRegistry`] stores the per-command option rules that the
//! `complete` builtin registers.
//!
//! A completion run never reports errors to the user: whatever cannot be
//! expanded simply contributes no candidates.

pub mod builtin;
mod completer;
pub mod parse_util;
mod registry;
pub mod syntax;

pub use builtin::{BuiltinResult, complete_builtin};
pub use completer::{Completer, complete};
pub use registry::{CompleteEntry, CompleteOption, CompletionRegistry, ResultMode};

/// Hook loading the completion definitions for a command on first use,
/// typically by evaluating a per-command completion file.
pub trait CompletionLoader: std::fmt::Debug {
    /// Loads definitions for `command` into the registry.
    fn load(&mut self, command: &str, registry: &mut CompletionRegistry);
}
