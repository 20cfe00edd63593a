// This file is part of marlin, a friendly interactive shell.
// Copyright (C) 2025 the marlin developers

//! Conversion between host bytes and the internal wide form.
//!
//! Decoding walks the input left to right. Well-formed UTF-8 sequences become
//! ordinary [`Wchar::Char`] atoms; any byte that does not begin a valid
//! sequence becomes a [`Wchar::Byte`] atom and decoding resumes at the next
//! byte. NUL bytes decode to `Char('\0')`. Encoding is the inverse, except
//! that [`Wchar::InternalSep`] is elided and the structural sentinels emit
//! their surface characters. Neither direction can fail.

use crate::{WString, Wchar};

pub(crate) fn bytes_to_wstr(bytes: &[u8]) -> WString {
    let mut out = WString::with_capacity(bytes.len());
    let mut rest = bytes;
    while !rest.is_empty() {
        match std::str::from_utf8(rest) {
            Ok(s) => {
                out.push_str(s);
                break;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                if let Ok(s) = std::str::from_utf8(&rest[..valid]) {
                    out.push_str(s);
                }
                out.push(Wchar::Byte(rest[valid]));
                rest = &rest[valid + 1..];
            }
        }
    }
    out
}

pub(crate) fn wstr_to_bytes(s: &WString) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    let mut buf = [0u8; 4];
    for atom in s.atoms() {
        match atom {
            Wchar::Char(c) => out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes()),
            Wchar::Byte(b) => out.push(b),
            Wchar::InternalSep => {}
            Wchar::HomeDirectory => out.push(b'~'),
            Wchar::ProcessExpand => out.push(b'%'),
            Wchar::VariableExpand | Wchar::VariableExpandSingle => out.push(b'$'),
            Wchar::BraceBegin => out.push(b'{'),
            Wchar::BraceEnd => out.push(b'}'),
            Wchar::BraceSep => out.push(b','),
            Wchar::AnyChar => out.push(b'?'),
            Wchar::AnyString => out.push(b'*'),
            Wchar::AnyStringRecursive => out.extend_from_slice(b"**"),
        }
    }
    out
}
