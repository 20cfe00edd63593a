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

//! Command-line argument syntax parser for the `complete` builtin.
//!
//! To parse arguments, create a list of [option specs](OptionSpec) and call
//! [`parse_arguments`] with the arguments to parse. The function returns the
//! [option occurrences](OptionOccurrence) and the remaining operands, or a
//! [`ParseError`]. Short options may be clustered (`-fr`), a required
//! argument may be attached (`-dtext`) or separate, long options accept
//! `--name value` and `--name=value`, and `--` ends option parsing.

use thiserror::Error;

/// Whether an option takes an argument.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OptionArgument {
    /// The option does not take an argument.
    #[default]
    None,
    /// The option requires an argument.
    Required,
}

/// Specification of one option.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct OptionSpec<'a> {
    short: Option<char>,
    long: Option<&'a str>,
    argument: OptionArgument,
}

impl<'a> OptionSpec<'a> {
    pub const fn new() -> Self {
        OptionSpec {
            short: None,
            long: None,
            argument: OptionArgument::None,
        }
    }

    pub const fn short(mut self, name: char) -> Self {
        self.short = Some(name);
        self
    }

    pub const fn long(mut self, name: &'a str) -> Self {
        self.long = Some(name);
        self
    }

    pub const fn argument(mut self, argument: OptionArgument) -> Self {
        self.argument = argument;
        self
    }

    pub const fn get_short(&self) -> Option<char> {
        self.short
    }

    pub const fn get_long(&self) -> Option<&'a str> {
        self.long
    }
}

/// One option found in the arguments.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OptionOccurrence<'a> {
    pub spec: &'a OptionSpec<'a>,
    pub argument: Option<String>,
}

/// Error in the argument syntax.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ParseError {
    #[error("unknown option -{0}")]
    UnknownShort(char),
    #[error("unknown option --{0}")]
    UnknownLong(String),
    #[error("option {0} requires an argument")]
    MissingArgument(String),
    #[error("option --{0} does not take an argument")]
    UnexpectedArgument(String),
}

/// Parses `args` into option occurrences and operands.
pub fn parse_arguments<'a>(
    specs: &'a [OptionSpec<'a>],
    args: &[&str],
) -> Result<(Vec<OptionOccurrence<'a>>, Vec<String>), ParseError> {
    let mut options = Vec::new();
    let mut operands = Vec::new();
    let mut args = args.iter().copied();

    while let Some(arg) = args.next() {
        if arg == "--" {
            operands.extend(args.map(str::to_owned));
            break;
        }

        if let Some(rest) = arg.strip_prefix("--") {
            let (name, attached) = match rest.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (rest, None),
            };
            let spec = specs
                .iter()
                .find(|s| s.long == Some(name))
                .ok_or_else(|| ParseError::UnknownLong(name.to_owned()))?;
            let argument = match spec.argument {
                OptionArgument::None => {
                    if attached.is_some() {
                        return Err(ParseError::UnexpectedArgument(name.to_owned()));
                    }
                    None
                }
                OptionArgument::Required => Some(match attached {
                    Some(value) => value.to_owned(),
                    None => args
                        .next()
                        .ok_or_else(|| ParseError::MissingArgument(format!("--{name}")))?
                        .to_owned(),
                }),
            };
            options.push(OptionOccurrence { spec, argument });
            continue;
        }

        if let Some(rest) = arg.strip_prefix('-') {
            if rest.is_empty() {
                operands.push(arg.to_owned());
                continue;
            }
            let mut chars = rest.chars();
            while let Some(c) = chars.next() {
                let spec = specs
                    .iter()
                    .find(|s| s.short == Some(c))
                    .ok_or(ParseError::UnknownShort(c))?;
                match spec.argument {
                    OptionArgument::None => {
                        options.push(OptionOccurrence {
                            spec,
                            argument: None,
                        });
                    }
                    OptionArgument::Required => {
                        let attached: String = chars.collect();
                        let argument = if attached.is_empty() {
                            args.next()
                                .ok_or_else(|| ParseError::MissingArgument(format!("-{c}")))?
                                .to_owned()
                        } else {
                            attached
                        };
                        options.push(OptionOccurrence {
                            spec,
                            argument: Some(argument),
                        });
                        break;
                    }
                }
            }
            continue;
        }

        operands.push(arg.to_owned());
    }

    Ok((options, operands))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn specs() -> Vec<OptionSpec<'static>> {
        vec![
            OptionSpec::new().short('a'),
            OptionSpec::new().short('b').long("bar"),
            OptionSpec::new()
                .short('z')
                .long("baz")
                .argument(OptionArgument::Required),
        ]
    }

    #[test]
    fn short_options_cluster() {
        let specs = specs();
        let (options, operands) = parse_arguments(&specs, &["-ba"]).unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].spec.get_short(), Some('b'));
        assert_eq!(options[1].spec.get_short(), Some('a'));
        assert!(operands.is_empty());
    }

    #[test]
    fn long_option_with_separate_and_attached_argument() {
        let specs = specs();
        let (options, _) = parse_arguments(&specs, &["--baz", "v1", "--baz=v2"]).unwrap();
        assert_eq!(options[0].argument.as_deref(), Some("v1"));
        assert_eq!(options[1].argument.as_deref(), Some("v2"));
    }

    #[test]
    fn short_option_with_attached_argument() {
        let specs = specs();
        let (options, _) = parse_arguments(&specs, &["-zvalue"]).unwrap();
        assert_eq!(options[0].argument.as_deref(), Some("value"));
    }

    #[test]
    fn double_dash_ends_options() {
        let specs = specs();
        let (options, operands) = parse_arguments(&specs, &["-a", "--", "-b", "x"]).unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(operands, ["-b", "x"]);
    }

    #[test]
    fn errors_are_reported() {
        let specs = specs();
        assert_matches!(
            parse_arguments(&specs, &["-q"]),
            Err(ParseError::UnknownShort('q'))
        );
        assert_matches!(
            parse_arguments(&specs, &["--nope"]),
            Err(ParseError::UnknownLong(_))
        );
        assert_matches!(
            parse_arguments(&specs, &["--baz"]),
            Err(ParseError::MissingArgument(_))
        );
        assert_matches!(
            parse_arguments(&specs, &["--bar=x"]),
            Err(ParseError::UnexpectedArgument(_))
        );
    }
}
