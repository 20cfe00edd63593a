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

//! The `complete` builtin: the command-line surface of the option registry.
//!
//! ```text
//! complete --command NAME | --path PATH
//!          [--short-option X] [--long-option NAME | --old-option NAME]
//!          [--no-files] [--require-parameter] [--exclusive]
//!          [--arguments SCRIPT] [--description TEXT] [--condition SCRIPT]
//!          [--erase] [--authoritative] [--unauthoritative] [--print]
//! ```

use crate::registry::{CompleteOption, CompletionRegistry, ResultMode};
use crate::syntax::{OptionArgument, OptionSpec, parse_arguments};
use marlin_env::completion::CompleteFlags;
use marlin_wstr::WString;

/// Result of running the builtin.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BuiltinResult {
    pub exit_status: i32,
    /// Text for standard output (`--print`).
    pub output: String,
    /// Diagnostic for standard error.
    pub error: String,
}

impl BuiltinResult {
    fn success(output: String) -> Self {
        BuiltinResult {
            exit_status: 0,
            output,
            error: String::new(),
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        BuiltinResult {
            exit_status: 1,
            output: String::new(),
            error: error.into(),
        }
    }
}

const SPECS: &[OptionSpec<'static>] = &[
    OptionSpec::new()
        .short('c')
        .long("command")
        .argument(OptionArgument::Required),
    OptionSpec::new()
        .short('p')
        .long("path")
        .argument(OptionArgument::Required),
    OptionSpec::new()
        .short('s')
        .long("short-option")
        .argument(OptionArgument::Required),
    OptionSpec::new()
        .short('l')
        .long("long-option")
        .argument(OptionArgument::Required),
    OptionSpec::new()
        .short('o')
        .long("old-option")
        .argument(OptionArgument::Required),
    OptionSpec::new().short('f').long("no-files"),
    OptionSpec::new().short('r').long("require-parameter"),
    OptionSpec::new().short('x').long("exclusive"),
    OptionSpec::new()
        .short('a')
        .long("arguments")
        .argument(OptionArgument::Required),
    OptionSpec::new()
        .short('d')
        .long("description")
        .argument(OptionArgument::Required),
    OptionSpec::new()
        .short('n')
        .long("condition")
        .argument(OptionArgument::Required),
    OptionSpec::new().short('e').long("erase"),
    OptionSpec::new().long("authoritative"),
    OptionSpec::new().long("unauthoritative"),
    OptionSpec::new().long("print"),
];

/// Runs the `complete` builtin against the registry.
pub fn complete_builtin(registry: &mut CompletionRegistry, args: &[&str]) -> BuiltinResult {
    let (options, operands) = match parse_arguments(SPECS, args) {
        Ok(parsed) => parsed,
        Err(error) => return BuiltinResult::failure(format!("complete: {error}\n")),
    };
    if !operands.is_empty() {
        return BuiltinResult::failure(format!(
            "complete: too many arguments: {}\n",
            operands.join(" ")
        ));
    }

    let mut commands: Vec<(String, bool)> = Vec::new();
    let mut short = None;
    let mut long: Option<String> = None;
    let mut old_style = false;
    let mut no_files = false;
    let mut require_parameter = false;
    let mut arguments = None;
    let mut description = String::new();
    let mut condition = None;
    let mut erase = false;
    let mut authoritative = None;
    let mut print = false;

    for occurrence in &options {
        let value = || occurrence.argument.clone().unwrap_or_default();
        match occurrence.spec.get_long() {
            Some("command") => commands.push((value(), false)),
            Some("path") => commands.push((value(), true)),
            Some("short-option") => {
                let text = value();
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => short = Some(c),
                    _ => {
                        return BuiltinResult::failure(format!(
                            "complete: short option must be a single character: '{text}'\n"
                        ));
                    }
                }
            }
            Some("long-option") => {
                long = Some(value());
                old_style = false;
            }
            Some("old-option") => {
                long = Some(value());
                old_style = true;
            }
            Some("no-files") => no_files = true,
            Some("require-parameter") => require_parameter = true,
            Some("exclusive") => {
                no_files = true;
                require_parameter = true;
            }
            Some("arguments") => arguments = Some(WString::from(value())),
            Some("description") => description = value(),
            Some("condition") => condition = Some(WString::from(value())),
            Some("erase") => erase = true,
            Some("authoritative") => authoritative = Some(true),
            Some("unauthoritative") => authoritative = Some(false),
            Some("print") => print = true,
            _ => {}
        }
    }

    if print {
        return BuiltinResult::success(registry.describe());
    }

    if commands.is_empty() {
        return BuiltinResult::failure("complete: please specify a command with --command or --path\n");
    }

    let result_mode = match (require_parameter, no_files) {
        (false, false) => ResultMode::Shared,
        (false, true) => ResultMode::NoFiles,
        (true, false) => ResultMode::NoCommon,
        (true, true) => ResultMode::Exclusive,
    };

    for (command, is_path) in &commands {
        if let Some(authoritative) = authoritative {
            registry.set_authoritative(command, *is_path, authoritative);
        }
        if erase {
            registry.remove(command, *is_path, short, long.as_deref());
        } else {
            registry.add(
                command,
                *is_path,
                CompleteOption {
                    short,
                    long: long.clone(),
                    old_style,
                    result_mode,
                    condition: condition.clone(),
                    arguments: arguments.clone(),
                    description: description.clone(),
                    flags: CompleteFlags::empty(),
                },
            );
        }
    }

    BuiltinResult::success(String::new())
}
