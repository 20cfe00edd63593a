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

//! Shell variables as seen by the expansion pipeline.
//!
//! A variable holds either a single string or a list of strings. The
//! [`VariableSet`] is a stack of contexts: lookups search from the innermost
//! context outwards, so a local assignment hides a global one until its
//! context is popped.

use itertools::Itertools;
use marlin_wstr::{ARRAY_SEP, WString, Wchar};
use std::collections::HashMap;

/// Value of one variable.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Value {
    Scalar(WString),
    Array(Vec<WString>),
}

impl Value {
    /// The value as a list of elements.
    ///
    /// A scalar containing [`ARRAY_SEP`] separators is split on them; this is
    /// how a list-valued variable that was materialized into a single string
    /// round-trips back into its elements.
    #[must_use]
    pub fn items(&self) -> Vec<WString> {
        match self {
            Value::Array(items) => items.clone(),
            Value::Scalar(s) => {
                if s.contains(&Wchar::Char(ARRAY_SEP)) {
                    s.split(|&a| a == Wchar::Char(ARRAY_SEP))
                        .map(WString::from)
                        .collect()
                } else {
                    vec![s.clone()]
                }
            }
        }
    }

    /// The value joined into a single displayable string.
    #[must_use]
    pub fn joined(&self) -> WString {
        match self {
            Value::Scalar(s) => s.clone(),
            Value::Array(items) => {
                let mut out = WString::new();
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_char(' ');
                    }
                    out.push_wstr(item);
                }
                out
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(WString::from(s))
    }
}

/// Where an assignment lands.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Scope {
    /// The outermost context.
    #[default]
    Global,
    /// The innermost context.
    Local,
}

/// Stack of name-to-value contexts.
#[derive(Clone, Debug)]
pub struct VariableSet {
    contexts: Vec<HashMap<String, Value>>,
}

impl Default for VariableSet {
    fn default() -> Self {
        VariableSet {
            contexts: vec![HashMap::new()],
        }
    }
}

impl VariableSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks the name up, innermost context first.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.contexts.iter().rev().find_map(|c| c.get(name))
    }

    /// Assigns in the given scope.
    pub fn set(&mut self, name: &str, scope: Scope, value: Value) {
        let context = match scope {
            Scope::Global => self.contexts.first_mut(),
            Scope::Local => self.contexts.last_mut(),
        };
        if let Some(context) = context {
            context.insert(name.to_owned(), value);
        }
    }

    /// Removes the name from every context.
    pub fn unset(&mut self, name: &str) {
        for context in &mut self.contexts {
            context.remove(name);
        }
    }

    /// All visible names, sorted and deduplicated.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.contexts
            .iter()
            .flat_map(|c| c.keys())
            .unique()
            .cloned()
            .sorted()
            .collect()
    }

    /// Pushes a fresh local context.
    pub fn push_context(&mut self) {
        self.contexts.push(HashMap::new());
    }

    /// Pops the innermost context. The base context is never popped.
    pub fn pop_context(&mut self) {
        if self.contexts.len() > 1 {
            self.contexts.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_after_set() {
        let mut set = VariableSet::new();
        set.set("HOME", Scope::Global, Value::from("/home/alice"));
        assert_eq!(set.get("HOME"), Some(&Value::from("/home/alice")));
        assert_eq!(set.get("home"), None);
    }

    #[test]
    fn local_context_hides_global() {
        let mut set = VariableSet::new();
        set.set("x", Scope::Global, Value::from("outer"));
        set.push_context();
        set.set("x", Scope::Local, Value::from("inner"));
        assert_eq!(set.get("x"), Some(&Value::from("inner")));
        set.pop_context();
        assert_eq!(set.get("x"), Some(&Value::from("outer")));
    }

    #[test]
    fn names_are_sorted_and_unique() {
        let mut set = VariableSet::new();
        set.set("b", Scope::Global, Value::from("1"));
        set.set("a", Scope::Global, Value::from("2"));
        set.push_context();
        set.set("a", Scope::Local, Value::from("3"));
        assert_eq!(set.names(), ["a", "b"]);
    }

    #[test]
    fn scalar_with_separators_splits_into_items() {
        let mut s = WString::from("one");
        s.push_char(ARRAY_SEP);
        s.push_str("two");
        let value = Value::Scalar(s);
        assert_eq!(value.items(), [WString::from("one"), WString::from("two")]);
    }

    #[test]
    fn array_joins_with_spaces() {
        let value = Value::Array(vec![WString::from("a"), WString::from("b")]);
        assert_eq!(value.joined(), "a b");
        assert_eq!(value.items().len(), 2);
    }
}
