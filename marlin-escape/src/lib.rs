// This file is part of marlin, a friendly interactive shell.
// Copyright (C) 2025 the marlin developers

//! This crate converts between the surface syntax a user types (quotes,
//! backslash escapes, hex escapes, control letters) and the internal wide
//! form defined by [`marlin_wstr`].
//!
//! [`escape`] renders an internal string as surface text that re-parses to
//! the same value. [`unescape`] is the inverse state machine; with
//! [`UnescapeFlags::SPECIAL`] it additionally replaces structural characters
//! with their sentinel atoms (`*` becomes [`Wchar::AnyString`], a leading `~`
//! becomes [`Wchar::HomeDirectory`], quotes leave an [`Wchar::InternalSep`]
//! seam, and so on), which is how the expansion pipeline receives its input.
//!
//! The grammar implemented here:
//!
//! - Unquoted text understands `\n`, `\t`, `\r`, `\b`, `\v`, `\f`, `\a`,
//!   `\e`, `\cX` (control-X), up to three octal digits, `\xHH` and `\XHH`
//!   (the capital form producing a direct byte), `\uHHHH`, `\UHHHHHHHH`, a
//!   backslash-newline line continuation, and `\C` for any other `C`.
//! - Single quotes make everything literal except `\\`, `\'`, and the
//!   backslash-newline continuation.
//! - Double quotes make everything literal except `\\`, `\$`, `\"`, and the
//!   backslash-newline continuation; `$` keeps its expansion meaning.

use bitflags::bitflags;
use marlin_wstr::{WString, Wchar};

mod unescape;

pub use unescape::{UnescapeError, UnescapeReason, unescape};

bitflags! {
    /// Options for [`escape`].
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct EscapeFlags: u32 {
        /// Escape every character that could be special to the parser, not
        /// just the ones that would break the string.
        const ALL = 1 << 0;
        /// Never use the single-quoted presentation; always emit backslash
        /// escapes.
        const NO_QUOTED = 1 << 1;
        /// Leave `~` bare even under [`EscapeFlags::ALL`].
        const NO_TILDE = 1 << 2;
    }
}

bitflags! {
    /// Options for [`unescape`].
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct UnescapeFlags: u32 {
        /// Replace structural characters with their sentinel atoms.
        const SPECIAL = 1 << 0;
        /// Accept a trailing backslash or an unterminated quote, as happens
        /// when completing a partially typed command line.
        const INCOMPLETE = 1 << 1;
    }
}

/// Characters that receive a backslash under [`EscapeFlags::ALL`].
const QUOTABLE: &str = "&$ #^<>()[]{}?*|;\":%~";

fn push_hex_byte(out: &mut String, prefix: char, value: u8) {
    out.push('\\');
    out.push(prefix);
    out.push(char::from_digit(u32::from(value >> 4), 16).unwrap_or('0'));
    out.push(char::from_digit(u32::from(value & 0xf), 16).unwrap_or('0'));
}

/// Produces a surface form of `input` that is safe to hand back to the
/// parser.
///
/// If the whole string could be escaped with nothing but backslashes before
/// quotable characters, and [`EscapeFlags::NO_QUOTED`] is not set, the result
/// is instead the original text wrapped in single quotes, which most people
/// find easier to read. Re-parsing either presentation yields `input` again.
#[must_use]
pub fn escape(input: &WString, flags: EscapeFlags) -> String {
    let escape_all = flags.contains(EscapeFlags::ALL);
    let no_quoted = flags.contains(EscapeFlags::NO_QUOTED);
    let no_tilde = flags.contains(EscapeFlags::NO_TILDE);

    if !no_quoted && input.is_empty() {
        return "''".to_owned();
    }

    let mut out = String::with_capacity(input.len());
    let mut need_escape = false;
    let mut need_complex_escape = false;

    for atom in input.atoms() {
        match atom {
            Wchar::Byte(b) => {
                push_hex_byte(&mut out, 'X', b);
                need_escape = true;
                need_complex_escape = true;
            }
            Wchar::Char('\t') | Wchar::Char('\n') | Wchar::Char('\r') | Wchar::Char('\x08')
            | Wchar::Char('\x1b') => {
                out.push('\\');
                out.push(match atom {
                    Wchar::Char('\t') => 't',
                    Wchar::Char('\n') => 'n',
                    Wchar::Char('\r') => 'r',
                    Wchar::Char('\x08') => 'b',
                    _ => 'e',
                });
                need_escape = true;
                need_complex_escape = true;
            }
            Wchar::Char(c @ ('\\' | '\'')) => {
                if escape_all {
                    out.push('\\');
                }
                need_escape = true;
                need_complex_escape = true;
                out.push(c);
            }
            Wchar::AnyChar => out.push('?'),
            Wchar::AnyString => out.push('*'),
            Wchar::AnyStringRecursive => out.push_str("**"),
            Wchar::InternalSep => {}
            Wchar::HomeDirectory => out.push('~'),
            Wchar::ProcessExpand => out.push('%'),
            Wchar::VariableExpand | Wchar::VariableExpandSingle => out.push('$'),
            Wchar::BraceBegin => out.push('{'),
            Wchar::BraceEnd => out.push('}'),
            Wchar::BraceSep => out.push(','),
            Wchar::Char(c) if QUOTABLE.contains(c) => {
                let char_is_normal = c == '~' && no_tilde;
                if !char_is_normal {
                    need_escape = true;
                    if escape_all {
                        out.push('\\');
                    }
                }
                out.push(c);
            }
            Wchar::Char(c) if (c as u32) < 32 => {
                let v = c as u32;
                if v > 0 && v < 27 {
                    out.push('\\');
                    out.push('c');
                    out.push(char::from(b'a' + (v as u8) - 1));
                } else {
                    push_hex_byte(&mut out, 'x', v as u8);
                }
                need_escape = true;
                need_complex_escape = true;
            }
            Wchar::Char(c) => out.push(c),
        }
    }

    // Use quoted escaping if possible, since most people find it easier to
    // read.
    if !no_quoted && need_escape && !need_complex_escape && escape_all {
        let mut quoted = String::with_capacity(input.len() + 2);
        quoted.push('\'');
        quoted.push_str(&input.to_string());
        quoted.push('\'');
        return quoted;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escaped(s: &str, flags: EscapeFlags) -> String {
        escape(&WString::from(s), flags)
    }

    #[test]
    fn empty_string_is_quoted() {
        assert_eq!(escaped("", EscapeFlags::empty()), "''");
        assert_eq!(escaped("", EscapeFlags::NO_QUOTED), "");
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(escaped("abc_d-1", EscapeFlags::ALL), "abc_d-1");
    }

    #[test]
    fn quotable_characters_use_single_quotes_when_possible() {
        assert_eq!(escaped("a b*c", EscapeFlags::ALL), "'a b*c'");
    }

    #[test]
    fn no_quoted_falls_back_to_backslashes() {
        assert_eq!(
            escaped("a b*c", EscapeFlags::ALL | EscapeFlags::NO_QUOTED),
            "a\\ b\\*c"
        );
    }

    #[test]
    fn control_characters_force_complex_escapes() {
        assert_eq!(escaped("a\tb", EscapeFlags::ALL), "a\\tb");
        assert_eq!(escaped("x\ny", EscapeFlags::ALL), "x\\ny");
        assert_eq!(escaped("\x01", EscapeFlags::ALL), "\\ca");
        assert_eq!(escaped("\x1c", EscapeFlags::ALL), "\\x1c");
    }

    #[test]
    fn backslash_and_quote_are_complex() {
        assert_eq!(escaped("a'b", EscapeFlags::ALL), "a\\'b");
        assert_eq!(escaped("a\\b", EscapeFlags::ALL), "a\\\\b");
    }

    #[test]
    fn tilde_respects_no_tilde() {
        assert_eq!(escaped("~x", EscapeFlags::ALL | EscapeFlags::NO_QUOTED), "\\~x");
        assert_eq!(
            escaped(
                "~x",
                EscapeFlags::ALL | EscapeFlags::NO_QUOTED | EscapeFlags::NO_TILDE
            ),
            "~x"
        );
    }

    #[test]
    fn direct_bytes_become_capital_x_escapes() {
        let mut s = WString::from("a");
        s.push(Wchar::Byte(0xfe));
        assert_eq!(escape(&s, EscapeFlags::ALL), "a\\Xfe");
    }

    #[test]
    fn wildcard_atoms_render_as_bare_surface() {
        let mut s = WString::from("f");
        s.push(Wchar::AnyString);
        assert_eq!(escape(&s, EscapeFlags::ALL), "f*");
        let mut s = WString::from("g");
        s.push(Wchar::AnyStringRecursive);
        assert_eq!(escape(&s, EscapeFlags::ALL), "g**");
    }

    #[test]
    fn escape_unescape_round_trip() {
        for input in ["a b*c", "x'y\\z", "tab\there", "plain", "~home %pct"] {
            let w = WString::from(input);
            let surface = escape(&w, EscapeFlags::ALL);
            let back = unescape(&surface, UnescapeFlags::empty()).unwrap();
            assert_eq!(back, w, "round trip failed for {input:?}");
        }
    }
}
