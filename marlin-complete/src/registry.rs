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

//! Per-command completion rules.
//!
//! The registry maps `(command, is_path)` to a rule: a set of option entries
//! plus a short-option string recording which letters take arguments. Rules
//! are registered by the `complete` builtin (usually from a per-command
//! completion file loaded on first use) and consumed by the resolver.

use crate::CompletionLoader;
use marlin_env::completion::CompleteFlags;
use marlin_escape::{EscapeFlags, escape};
use marlin_wstr::WString;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

/// How completing continues after an option entry matched.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ResultMode {
    /// The option's arguments are optional; other completions still apply.
    #[default]
    Shared,
    /// No file completion after this option.
    NoFiles,
    /// The option requires an argument from its generator.
    NoCommon,
    /// The option requires an argument and suppresses file completion.
    Exclusive,
}

impl ResultMode {
    /// Whether file completion remains allowed.
    #[must_use]
    pub fn allows_files(self) -> bool {
        matches!(self, ResultMode::Shared | ResultMode::NoCommon)
    }

    /// Whether non-argument completions remain allowed, i.e. the option does
    /// not require an argument.
    #[must_use]
    pub fn allows_common(self) -> bool {
        matches!(self, ResultMode::Shared | ResultMode::NoFiles)
    }

    #[must_use]
    pub fn requires_argument(self) -> bool {
        !self.allows_common()
    }
}

/// One registered option entry.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CompleteOption {
    pub short: Option<char>,
    pub long: Option<String>,
    /// Old-style long option: `-name` rather than `--name`.
    pub old_style: bool,
    pub result_mode: ResultMode,
    /// Script deciding whether the entry applies; empty means always.
    pub condition: Option<WString>,
    /// Script generating argument candidates.
    pub arguments: Option<WString>,
    pub description: String,
    pub flags: CompleteFlags,
}

/// Completion rule for one command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompleteEntry {
    /// All recognized short letters, each followed by `:` when the option
    /// requires an argument.
    pub short_options: String,
    pub options: Vec<CompleteOption>,
    /// Whether unknown options of this command are errors.
    pub authoritative: bool,
}

impl Default for CompleteEntry {
    fn default() -> Self {
        CompleteEntry {
            short_options: String::new(),
            options: Vec::new(),
            authoritative: true,
        }
    }
}

impl CompleteEntry {
    /// Whether the short letter is recognized, and whether it takes an
    /// argument.
    #[must_use]
    pub fn short_option(&self, letter: char) -> Option<ResultMode> {
        self.options
            .iter()
            .find(|o| o.short == Some(letter))
            .map(|o| o.result_mode)
    }
}

/// Process-wide store of completion rules.
#[derive(Debug, Default)]
pub struct CompletionRegistry {
    entries: BTreeMap<(String, bool), CompleteEntry>,
    loaded: HashSet<String>,
    loader: Option<Box<dyn CompletionLoader>>,
}

impl CompletionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the hook that loads per-command completion files.
    pub fn set_loader(&mut self, loader: Box<dyn CompletionLoader>) {
        self.loader = Some(loader);
    }

    /// Ensures definitions for `command` have been loaded, invoking the
    /// loader at most once per command until [`Self::invalidate`].
    pub fn load(&mut self, command: &str) {
        if self.loaded.insert(command.to_owned()) {
            if let Some(mut loader) = self.loader.take() {
                loader.load(command, self);
                self.loader = Some(loader);
            }
        }
    }

    /// Forgets that `command` was loaded, so the next lookup reloads it.
    /// Driven externally by file-modification-time tracking.
    pub fn invalidate(&mut self, command: &str) {
        self.loaded.remove(command);
    }

    /// Appends an option entry to the command's rule, creating the rule if
    /// needed.
    pub fn add(&mut self, command: &str, is_path: bool, option: CompleteOption) {
        let entry = self
            .entries
            .entry((command.to_owned(), is_path))
            .or_default();
        if let Some(letter) = option.short {
            entry.short_options.push(letter);
            if option.result_mode.requires_argument() {
                entry.short_options.push(':');
            }
        }
        entry.options.insert(0, option);
    }

    /// Sets the authoritative flag, creating an empty rule if none exists.
    pub fn set_authoritative(&mut self, command: &str, is_path: bool, authoritative: bool) {
        self.entries
            .entry((command.to_owned(), is_path))
            .or_default()
            .authoritative = authoritative;
    }

    /// Drops option entries matching the short or long key; with neither
    /// given, drops all of them. A rule left without options is removed.
    pub fn remove(
        &mut self,
        command: &str,
        is_path: bool,
        short: Option<char>,
        long: Option<&str>,
    ) {
        let key = (command.to_owned(), is_path);
        let Some(entry) = self.entries.get_mut(&key) else {
            return;
        };

        if short.is_none() && long.is_none() {
            entry.options.clear();
        } else {
            entry.options.retain(|option| {
                let matches_short = short.is_some() && option.short == short;
                let matches_long =
                    long.is_some() && option.long.as_deref() == long;
                if matches_short || matches_long {
                    if let Some(letter) = option.short {
                        remove_short_letter(&mut entry.short_options, letter);
                    }
                    false
                } else {
                    true
                }
            });
        }

        if entry.options.is_empty() {
            self.entries.remove(&key);
        }
    }

    /// The rule for the command, if any.
    #[must_use]
    pub fn lookup(&self, command: &str, is_path: bool) -> Option<&CompleteEntry> {
        self.entries.get(&(command.to_owned(), is_path))
    }

    /// All rules, keyed by `(command, is_path)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool, &CompleteEntry)> {
        self.entries
            .iter()
            .map(|((cmd, is_path), entry)| (cmd.as_str(), *is_path, entry))
    }

    /// Emits every rule as re-parseable `complete` commands, one per option
    /// entry.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for ((command, is_path), entry) in &self.entries {
            for option in &entry.options {
                out.push_str("complete");
                write_switch_str(&mut out, if *is_path { "path" } else { "command" }, command);
                match option.result_mode {
                    ResultMode::Shared => {}
                    ResultMode::NoFiles => out.push_str(" --no-files"),
                    ResultMode::NoCommon => out.push_str(" --require-parameter"),
                    ResultMode::Exclusive => out.push_str(" --exclusive"),
                }
                if let Some(letter) = option.short {
                    write_switch_str(&mut out, "short-option", &letter.to_string());
                }
                if let Some(long) = &option.long {
                    write_switch_str(
                        &mut out,
                        if option.old_style { "old-option" } else { "long-option" },
                        long,
                    );
                }
                if !option.description.is_empty() {
                    write_switch_str(&mut out, "description", &option.description);
                }
                if let Some(arguments) = &option.arguments {
                    write_switch(&mut out, "arguments", arguments);
                }
                if let Some(condition) = &option.condition {
                    write_switch(&mut out, "condition", condition);
                }
                out.push('\n');
            }
        }
        out
    }
}

fn remove_short_letter(short_options: &mut String, letter: char) {
    if let Some(pos) = short_options.find(letter) {
        let mut end = pos + letter.len_utf8();
        while short_options[end..].starts_with(':') {
            end += 1;
        }
        short_options.replace_range(pos..end, "");
    }
}

fn write_switch(out: &mut String, name: &str, value: &WString) {
    let _ = write!(out, " --{name} {}", escape(value, EscapeFlags::ALL));
}

fn write_switch_str(out: &mut String, name: &str, value: &str) {
    write_switch(out, name, &WString::from(value));
}
