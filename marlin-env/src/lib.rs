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

//! Execution environment interface for the marlin string-processing core.
//!
//! The expansion pipeline and the completion resolver do not talk to the
//! operating system or to the rest of the shell directly; they go through the
//! [`Env`] aggregate defined here, which bundles:
//!
//! - a [`System`] implementation for file metadata and directory iteration
//!   ([`RealSystem`] for the live process, [`VirtualSystem`] for tests),
//! - the shell [`variable`](variable::VariableSet) store,
//! - the [`job`](job::JobList) table,
//! - the subshell [`Evaluator`](eval::Evaluator) used by command substitution
//!   and completion condition scripts,
//! - a cooperative [`CancelFlag`] polled by long-running walks.
//!
//! The crate also defines the [`Completion`](completion::Completion) record
//! shared by the wildcard walker and the completion resolver, and message
//! rendering for diagnostics with source offsets.

pub mod completion;
pub mod eval;
pub mod job;
pub mod message;
pub mod system;
pub mod variable;

use std::fmt;
use std::rc::Rc;

pub use completion::{CompleteFlags, Completion};
pub use system::r#virtual::VirtualSystem;
pub use system::real::RealSystem;
pub use system::{Dir, FileId, FileType, Metadata, System, User};

/// Cooperative cancellation checker.
///
/// The main thread installs a checker that reports whether the user pressed
/// interrupt; the completion worker installs one that reports whether a newer
/// request superseded this one. A default-constructed flag never cancels.
#[derive(Clone, Default)]
pub struct CancelFlag(Option<Rc<dyn Fn() -> bool>>);

impl CancelFlag {
    pub fn new(checker: impl Fn() -> bool + 'static) -> Self {
        CancelFlag(Some(Rc::new(checker)))
    }

    /// Snapshot of the cancellation state.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.as_ref().is_some_and(|f| f())
    }
}

impl fmt::Debug for CancelFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CancelFlag")
            .field(&self.0.as_ref().map(|_| "..."))
            .finish()
    }
}

/// Aggregate environment the core runs against.
pub struct Env {
    /// Operating system interface.
    pub system: Box<dyn System>,
    /// Shell variables.
    pub variables: variable::VariableSet,
    /// Job table.
    pub jobs: job::JobList,
    /// Subshell evaluator for command substitution and condition scripts.
    pub evaluator: Box<dyn eval::Evaluator>,
    /// Cancellation checker for the current request.
    pub cancel: CancelFlag,
}

impl Env {
    /// Creates an environment on the given system with no variables, no jobs,
    /// and an evaluator that rejects every subshell.
    #[must_use]
    pub fn with_system(system: Box<dyn System>) -> Self {
        Env {
            system,
            variables: variable::VariableSet::new(),
            jobs: job::JobList::new(),
            evaluator: Box::new(eval::NullEvaluator),
            cancel: CancelFlag::default(),
        }
    }

    /// Creates an environment on a fresh [`VirtualSystem`].
    #[must_use]
    pub fn new_virtual() -> Self {
        Self::with_system(Box::new(VirtualSystem::new()))
    }

    /// Whether the current request has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("system", &self.system)
            .field("variables", &self.variables)
            .field("jobs", &self.jobs)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}
