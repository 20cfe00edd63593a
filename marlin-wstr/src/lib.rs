// This file is part of marlin, a friendly interactive shell.
// Copyright (C) 2025 the marlin developers

//! This crate defines the internal wide string the marlin expansion and
//! completion machinery operates on.
//!
//! A command-line argument travels through the shell as a sequence of
//! [`Wchar`] atoms. Most atoms are ordinary characters, but the unescape step
//! replaces structural surface characters with dedicated sentinel atoms
//! (`~` at the start of a token becomes [`Wchar::HomeDirectory`], `*` becomes
//! [`Wchar::AnyString`], and so on) so that later passes never confuse a
//! character the user quoted with one that carries meaning. Bytes that cannot
//! be decoded as UTF-8 are carried as [`Wchar::Byte`] atoms, which makes the
//! bytes → wide → bytes round trip lossless for arbitrary file names.
//!
//! Because the atoms are a tagged enum rather than reserved code points, no
//! user-typed character can collide with a sentinel; the well-formedness
//! invariant of the internal form holds by construction.

mod codec;

use std::borrow::Borrow;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;

/// Separator joining the elements of a list-valued variable when the list is
/// materialized as a single scalar string.
///
/// Only the variable-expansion pass gives this character meaning; everywhere
/// else it is an ordinary (if unusual) character.
pub const ARRAY_SEP: char = '\u{1e}';

/// One atom of the internal wide string.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Wchar {
    /// Ordinary character, including NUL.
    Char(char),
    /// Direct-byte-encoded input byte that could not be decoded.
    Byte(u8),
    /// A `~` at the start of a token, subject to home directory expansion.
    HomeDirectory,
    /// A `%` at the start of a token, subject to process expansion.
    ProcessExpand,
    /// A `$` in unquoted context; expands to zero or more arguments.
    VariableExpand,
    /// A `$` in double-quoted context; expands to exactly one argument.
    VariableExpandSingle,
    /// Start of a brace expansion.
    BraceBegin,
    /// End of a brace expansion.
    BraceEnd,
    /// Separator between brace expansion alternatives.
    BraceSep,
    /// Seam left where a quoted span was removed; prevents adjacent text from
    /// fusing with expansion output in later passes.
    InternalSep,
    /// Wildcard matching exactly one character other than `/`.
    AnyChar,
    /// Wildcard matching any run of characters other than `/`.
    AnyString,
    /// Wildcard matching any run of characters including `/`.
    AnyStringRecursive,
}

impl Wchar {
    /// Whether this atom is one of the three wildcard sentinels.
    #[must_use]
    pub fn is_wildcard(self) -> bool {
        matches!(
            self,
            Wchar::AnyChar | Wchar::AnyString | Wchar::AnyStringRecursive
        )
    }

    /// Returns the ordinary character, if this atom is one.
    #[must_use]
    pub fn as_char(self) -> Option<char> {
        match self {
            Wchar::Char(c) => Some(c),
            _ => None,
        }
    }

    /// Whether this atom is the ordinary character `c`.
    #[must_use]
    pub fn is_char(self, c: char) -> bool {
        self == Wchar::Char(c)
    }
}

impl From<char> for Wchar {
    fn from(c: char) -> Self {
        Wchar::Char(c)
    }
}

/// Internal wide string: a growable sequence of [`Wchar`] atoms.
///
/// Dereferences to `[Wchar]`, so slicing, indexing, and iterator adapters all
/// work directly on the atom sequence.
#[derive(Clone, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct WString(Vec<Wchar>);

impl WString {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        WString(Vec::with_capacity(capacity))
    }

    /// Decodes host bytes into internal form.
    ///
    /// See [`codec`](self) notes in the crate documentation: undecodable bytes
    /// become [`Wchar::Byte`] atoms and the conversion never fails.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        codec::bytes_to_wstr(bytes)
    }

    /// Encodes internal form back into host bytes.
    ///
    /// [`Wchar::InternalSep`] atoms are elided; [`Wchar::Byte`] atoms emit
    /// their original byte; other sentinels emit their surface characters.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        codec::wstr_to_bytes(self)
    }

    /// Converts to a `PathBuf` holding exactly [`Self::to_bytes`].
    #[must_use]
    pub fn to_path(&self) -> PathBuf {
        use std::os::unix::ffi::OsStringExt;
        PathBuf::from(std::ffi::OsString::from_vec(self.to_bytes()))
    }

    pub fn push(&mut self, atom: Wchar) {
        self.0.push(atom);
    }

    pub fn push_char(&mut self, c: char) {
        self.0.push(Wchar::Char(c));
    }

    pub fn push_str(&mut self, s: &str) {
        self.0.extend(s.chars().map(Wchar::Char));
    }

    pub fn push_wstr(&mut self, s: &[Wchar]) {
        self.0.extend_from_slice(s);
    }

    pub fn pop(&mut self) -> Option<Wchar> {
        self.0.pop()
    }

    pub fn insert(&mut self, index: usize, atom: Wchar) {
        self.0.insert(index, atom);
    }

    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Copying iterator over the atoms.
    pub fn atoms(&self) -> impl Iterator<Item = Wchar> + '_ {
        self.0.iter().copied()
    }

    /// Position of the first occurrence of `atom`, if any.
    #[must_use]
    pub fn find(&self, atom: Wchar) -> Option<usize> {
        self.0.iter().position(|&a| a == atom)
    }

    /// Whether any atom is a wildcard sentinel.
    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        self.0.iter().any(|a| a.is_wildcard())
    }

    /// A new string holding the atoms of `range`.
    #[must_use]
    pub fn substring(&self, range: std::ops::Range<usize>) -> WString {
        WString(self.0[range].to_vec())
    }
}

impl Deref for WString {
    type Target = [Wchar];
    fn deref(&self) -> &[Wchar] {
        &self.0
    }
}

impl DerefMut for WString {
    fn deref_mut(&mut self) -> &mut [Wchar] {
        &mut self.0
    }
}

impl Borrow<[Wchar]> for WString {
    fn borrow(&self) -> &[Wchar] {
        &self.0
    }
}

impl From<&str> for WString {
    fn from(s: &str) -> Self {
        WString(s.chars().map(Wchar::Char).collect())
    }
}

impl From<String> for WString {
    fn from(s: String) -> Self {
        WString::from(s.as_str())
    }
}

impl From<&[Wchar]> for WString {
    fn from(atoms: &[Wchar]) -> Self {
        WString(atoms.to_vec())
    }
}

impl From<Vec<Wchar>> for WString {
    fn from(atoms: Vec<Wchar>) -> Self {
        WString(atoms)
    }
}

impl FromIterator<Wchar> for WString {
    fn from_iter<I: IntoIterator<Item = Wchar>>(iter: I) -> Self {
        WString(iter.into_iter().collect())
    }
}

impl Extend<Wchar> for WString {
    fn extend<I: IntoIterator<Item = Wchar>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl<'a> IntoIterator for &'a WString {
    type Item = &'a Wchar;
    type IntoIter = std::slice::Iter<'a, Wchar>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for WString {
    type Item = Wchar;
    type IntoIter = std::vec::IntoIter<Wchar>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Compares against a plain string: equal iff every atom is an ordinary
/// character and the character sequences agree.
impl PartialEq<str> for WString {
    fn eq(&self, other: &str) -> bool {
        let mut chars = other.chars();
        for atom in &self.0 {
            match (atom.as_char(), chars.next()) {
                (Some(a), Some(b)) if a == b => {}
                _ => return false,
            }
        }
        chars.next().is_none()
    }
}

impl PartialEq<&str> for WString {
    fn eq(&self, other: &&str) -> bool {
        *self == **other
    }
}

/// Renders the string for display: sentinels are stripped or shown as their
/// surface characters, and direct bytes become U+FFFD.
impl fmt::Display for WString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &atom in &self.0 {
            match atom {
                Wchar::Char(c) => f.write_fmt(format_args!("{c}"))?,
                Wchar::Byte(_) => f.write_str("\u{FFFD}")?,
                Wchar::HomeDirectory => f.write_str("~")?,
                Wchar::ProcessExpand => f.write_str("%")?,
                Wchar::VariableExpand | Wchar::VariableExpandSingle => f.write_str("$")?,
                Wchar::BraceBegin => f.write_str("{")?,
                Wchar::BraceEnd => f.write_str("}")?,
                Wchar::BraceSep => f.write_str(",")?,
                Wchar::InternalSep => {}
                Wchar::AnyChar => f.write_str("?")?,
                Wchar::AnyString => f.write_str("*")?,
                Wchar::AnyStringRecursive => f.write_str("**")?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for WString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("w\"")?;
        for &atom in &self.0 {
            match atom {
                Wchar::Char(c) => f.write_fmt(format_args!("{}", c.escape_debug()))?,
                Wchar::Byte(b) => f.write_fmt(format_args!("<{b:02x}>"))?,
                Wchar::HomeDirectory => f.write_str("<~>")?,
                Wchar::ProcessExpand => f.write_str("<%>")?,
                Wchar::VariableExpand => f.write_str("<$>")?,
                Wchar::VariableExpandSingle => f.write_str("<$1>")?,
                Wchar::BraceBegin => f.write_str("<{>")?,
                Wchar::BraceEnd => f.write_str("<}>")?,
                Wchar::BraceSep => f.write_str("<,>")?,
                Wchar::InternalSep => f.write_str("<|>")?,
                Wchar::AnyChar => f.write_str("<?>")?,
                Wchar::AnyString => f.write_str("<*>")?,
                Wchar::AnyStringRecursive => f.write_str("<**>")?,
            }
        }
        f.write_str("\"")
    }
}
