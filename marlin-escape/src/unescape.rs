// This file is part of marlin, a friendly interactive shell.
// Copyright (C) 2025 the marlin developers

//! The surface-to-internal state machine. See the crate documentation for the
//! grammar; this module houses the implementation and its error type.

use crate::UnescapeFlags;
use marlin_wstr::{WString, Wchar};
use thiserror::Error;

/// Why [`unescape`] rejected its input.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnescapeReason {
    /// The input ended right after a backslash.
    TrailingBackslash,
    /// The input ended inside a quoted span.
    UnterminatedQuote,
    /// A numeric or control escape was out of range or malformed.
    InvalidEscape,
}

/// Error returned by [`unescape`], carrying the character offset the problem
/// was detected at.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("{reason:?} at offset {offset}")]
pub struct UnescapeError {
    pub offset: usize,
    pub reason: UnescapeReason,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Mode {
    Unquoted,
    SingleQuoted { start: usize },
    DoubleQuoted { start: usize },
}

/// Parses the surface string `input` into internal form.
///
/// With [`UnescapeFlags::SPECIAL`], structural characters become sentinel
/// atoms; without it they pass through as ordinary characters. With
/// [`UnescapeFlags::INCOMPLETE`], a trailing backslash or an unterminated
/// quote is accepted, which the completion path relies on when the user has
/// typed only half a token.
pub fn unescape(input: &str, flags: UnescapeFlags) -> Result<WString, UnescapeError> {
    let special = flags.contains(UnescapeFlags::SPECIAL);
    let incomplete = flags.contains(UnescapeFlags::INCOMPLETE);
    let chars: Vec<char> = input.chars().collect();

    let mut out = WString::with_capacity(chars.len());
    let mut mode = Mode::Unquoted;
    let mut brace_depth = 0u32;
    let mut brace_text_start = false;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match mode {
            Mode::Unquoted => match c {
                '\\' => {
                    i = read_unquoted_escape(&chars, i, &mut out, special, incomplete)?;
                    continue;
                }
                '~' if special && i == 0 => out.push(Wchar::HomeDirectory),
                '%' if special && i == 0 => out.push(Wchar::ProcessExpand),
                '*' if special => {
                    // Two adjacent stars collapse into the recursive wildcard.
                    if out.last() == Some(&Wchar::AnyString) {
                        out.pop();
                        out.push(Wchar::AnyStringRecursive);
                    } else {
                        out.push(Wchar::AnyString);
                    }
                }
                '?' if special => out.push(Wchar::AnyChar),
                '$' if special => out.push(Wchar::VariableExpand),
                '{' if special => {
                    brace_depth += 1;
                    out.push(Wchar::BraceBegin);
                }
                '}' if special => {
                    // The completion machinery hands us partial tokens, so an
                    // unmatched closer is not an error here.
                    brace_depth = brace_depth.saturating_sub(1);
                    brace_text_start = brace_text_start && brace_depth > 0;
                    out.push(Wchar::BraceEnd);
                }
                ',' if special && brace_depth > 0 => {
                    if out.last() == Some(&Wchar::BraceSep) {
                        brace_text_start = true;
                        out.push_char(',');
                    } else {
                        brace_text_start = false;
                        out.push(Wchar::BraceSep);
                    }
                }
                '\n' | '\t' | ' ' if special && brace_depth > 0 => {
                    if brace_text_start {
                        out.push_char(c);
                    }
                }
                '\'' => {
                    mode = Mode::SingleQuoted { start: i };
                    if special {
                        out.push(Wchar::InternalSep);
                    }
                }
                '"' => {
                    mode = Mode::DoubleQuoted { start: i };
                    if special {
                        out.push(Wchar::InternalSep);
                    }
                }
                _ => {
                    if special && brace_depth > 0 {
                        brace_text_start = true;
                    }
                    out.push_char(c);
                }
            },
            Mode::SingleQuoted { .. } => match c {
                '\\' => match chars.get(i + 1) {
                    Some(&e @ ('\\' | '\'')) => {
                        out.push_char(e);
                        i += 1;
                    }
                    Some('\n') => i += 1,
                    Some(_) => out.push_char('\\'),
                    None => {
                        if !incomplete {
                            return Err(UnescapeError {
                                offset: i,
                                reason: UnescapeReason::TrailingBackslash,
                            });
                        }
                        out.push_char('\\');
                    }
                },
                '\'' => {
                    mode = Mode::Unquoted;
                    if special {
                        out.push(Wchar::InternalSep);
                    }
                }
                _ => out.push_char(c),
            },
            Mode::DoubleQuoted { .. } => match c {
                '"' => {
                    mode = Mode::Unquoted;
                    if special {
                        out.push(Wchar::InternalSep);
                    }
                }
                '\\' => match chars.get(i + 1) {
                    Some(&e @ ('\\' | '$' | '"')) => {
                        out.push_char(e);
                        i += 1;
                    }
                    Some('\n') => i += 1,
                    Some(_) => out.push_char('\\'),
                    None => {
                        if !incomplete {
                            return Err(UnescapeError {
                                offset: i,
                                reason: UnescapeReason::TrailingBackslash,
                            });
                        }
                        out.push_char('\\');
                    }
                },
                '$' if special => out.push(Wchar::VariableExpandSingle),
                _ => out.push_char(c),
            },
        }
        i += 1;
    }

    match mode {
        Mode::Unquoted => Ok(out),
        Mode::SingleQuoted { start } | Mode::DoubleQuoted { start } => {
            if incomplete {
                Ok(out)
            } else {
                Err(UnescapeError {
                    offset: start,
                    reason: UnescapeReason::UnterminatedQuote,
                })
            }
        }
    }
}

/// Consumes one backslash escape starting at `chars[start] == '\\'` in
/// unquoted context, appending its expansion to `out`. Returns the position
/// of the first character after the escape.
fn read_unquoted_escape(
    chars: &[char],
    start: usize,
    out: &mut WString,
    special: bool,
    incomplete: bool,
) -> Result<usize, UnescapeError> {
    let Some(&c) = chars.get(start + 1) else {
        return if incomplete {
            Ok(start + 1)
        } else {
            Err(UnescapeError {
                offset: start,
                reason: UnescapeReason::TrailingBackslash,
            })
        };
    };
    let mut i = start + 2;

    match c {
        '0'..='7' | 'u' | 'U' | 'x' | 'X' => {
            let (base, max_digits, max_value, byte_literal) = match c {
                'u' => (16, 4, 0xFFFF, false),
                'U' => (16, 8, 0x0010_FFFF, false),
                'x' => (16, 2, 0x7F, false),
                'X' => (16, 2, 0xFF, true),
                _ => {
                    i -= 1; // the first octal digit is part of the number
                    (8, 3, 0x7F, false)
                }
            };

            let mut value: u32 = 0;
            for _ in 0..max_digits {
                let Some(d) = chars.get(i).and_then(|c| c.to_digit(base)) else {
                    break;
                };
                value = value * base + d;
                i += 1;
            }
            if value > max_value {
                return Err(UnescapeError {
                    offset: start,
                    reason: UnescapeReason::InvalidEscape,
                });
            }
            if byte_literal {
                out.push(Wchar::Byte(value as u8));
            } else {
                match char::from_u32(value) {
                    Some(decoded) => out.push_char(decoded),
                    None => {
                        return Err(UnescapeError {
                            offset: start,
                            reason: UnescapeReason::InvalidEscape,
                        });
                    }
                }
            }
        }
        'a' => out.push_char('\x07'),
        'b' => out.push_char('\x08'),
        'c' => match chars.get(i) {
            Some(&x @ 'a'..='z') => {
                out.push_char(char::from(x as u8 - b'a' + 1));
                i += 1;
            }
            Some(&x @ 'A'..='Z') => {
                out.push_char(char::from(x as u8 - b'A' + 1));
                i += 1;
            }
            _ => {
                return Err(UnescapeError {
                    offset: start,
                    reason: UnescapeReason::InvalidEscape,
                });
            }
        },
        'e' => out.push_char('\x1b'),
        'f' => out.push_char('\x0c'),
        'n' => out.push_char('\n'),
        'r' => out.push_char('\r'),
        't' => out.push_char('\t'),
        'v' => out.push_char('\x0b'),
        '\n' => {} // line continuation swallows both characters
        other => {
            if special {
                out.push(Wchar::InternalSep);
            }
            out.push_char(other);
        }
    }
    Ok(i)
}
