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

//! Variable expansion pass.
//!
//! The scan runs right to left so that `$$name` expands the inner variable
//! first. An unquoted expansion of a list fans the argument out into one
//! result per element; the double-quoted form joins the elements with spaces
//! into exactly one result. An unset variable elides the whole argument in
//! the unquoted form and substitutes the empty string in the quoted form.

use crate::slice;
use crate::ExpandError;
use marlin_env::Env;
use marlin_wstr::{WString, Wchar};

fn is_name_atom(atom: Wchar) -> bool {
    atom.as_char()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
}

/// Replaces variable sentinels with literal dollars, for
/// [`ExpandFlags::SKIP_VARIABLES`](crate::ExpandFlags::SKIP_VARIABLES).
pub(crate) fn skip_variables(input: WString) -> WString {
    input
        .atoms()
        .map(|a| match a {
            Wchar::VariableExpand | Wchar::VariableExpandSingle => Wchar::Char('$'),
            other => other,
        })
        .collect()
}

pub(crate) fn expand_variables(
    env: &Env,
    input: WString,
    out: &mut Vec<WString>,
) -> Result<(), ExpandError> {
    let last = input.len().wrapping_sub(1) as isize;
    expand_from(env, input, last, out)
}

fn expand_from(
    env: &Env,
    input: WString,
    last_idx: isize,
    out: &mut Vec<WString>,
) -> Result<(), ExpandError> {
    let mut i = last_idx.min(input.len() as isize - 1);
    while i >= 0 {
        let position = i as usize;
        let sentinel = input[position];
        if sentinel != Wchar::VariableExpand && sentinel != Wchar::VariableExpandSingle {
            i -= 1;
            continue;
        }
        let is_single = sentinel == Wchar::VariableExpandSingle;

        let start = position + 1;
        let mut stop = start;
        while stop < input.len() && is_name_atom(input[stop]) {
            stop += 1;
        }
        if stop == start {
            let found = match input.get(stop).and_then(|a| a.as_char()) {
                Some(c) => format!("'{c}'"),
                None => "the end of the token".to_owned(),
            };
            return Err(ExpandError::syntax(
                format!("Expected a variable name after '$', found {found}"),
                position,
            ));
        }

        let name: String = input[start..stop]
            .iter()
            .filter_map(|a| a.as_char())
            .collect();

        match env.variables.get(&name) {
            Some(value) => {
                let mut items = value.items();
                let mut stop = stop;

                if input.get(stop) == Some(&Wchar::Char('[')) {
                    let (indices, end) = slice::parse_slice(&input, stop)?;
                    let mut selected = Vec::with_capacity(indices.len());
                    for index in indices {
                        let resolved = slice::resolve_index(index, items.len())
                            .ok_or_else(|| ExpandError::syntax("Array index out of bounds", stop))?;
                        selected.push(items[resolved].clone());
                    }
                    items = selected;
                    stop = end;
                }

                if is_single {
                    // Join the elements into the surrounding text as one
                    // argument.
                    let mut result = input.substring(0..position);
                    result.push(Wchar::InternalSep);
                    for (j, item) in items.iter().enumerate() {
                        if j > 0 {
                            result.push_char(' ');
                        }
                        result.push_wstr(item);
                    }
                    result.extend(input[stop..].iter().copied());
                    return expand_from(env, result, i, out);
                }

                // Unquoted form: fan out into one result per element.
                for item in &items {
                    if position == 0 && stop == input.len() {
                        out.push(item.clone());
                    } else {
                        let mut new_input = input.substring(0..position);
                        // `$$name` keeps the two expansions adjacent so the
                        // outer one sees the substituted name.
                        if position >= 1 && input[position - 1] != Wchar::VariableExpand {
                            new_input.push(Wchar::InternalSep);
                        }
                        new_input.push_wstr(item);
                        new_input.extend(input[stop..].iter().copied());
                        expand_from(env, new_input, i, out)?;
                    }
                }
                return Ok(());
            }
            None => {
                if is_single {
                    // Quoted expansion of an unset variable is the empty
                    // string.
                    let mut result = input.substring(0..position);
                    result.extend(input[stop..].iter().copied());
                    return expand_from(env, result, i - 1, out);
                }
                // Unquoted expansion of an unset variable elides the whole
                // argument.
                return Ok(());
            }
        }
    }

    out.push(input);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use marlin_env::variable::{Scope, Value};

    fn env_with(vars: &[(&str, Value)]) -> Env {
        let mut env = Env::new_virtual();
        for (name, value) in vars {
            env.variables.set(name, Scope::Global, value.clone());
        }
        env
    }

    fn unquoted(name_text: &str) -> WString {
        // Builds `…$name…` with the unquoted sentinel standing for `$`.
        let mut out = WString::new();
        for c in name_text.chars() {
            if c == '$' {
                out.push(Wchar::VariableExpand);
            } else {
                out.push_char(c);
            }
        }
        out
    }

    fn expand(env: &Env, input: WString) -> Result<Vec<String>, ExpandError> {
        let mut out = Vec::new();
        expand_variables(env, input, &mut out)?;
        Ok(out.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn plain_text_is_unchanged() {
        let env = env_with(&[]);
        assert_eq!(expand(&env, WString::from("abc")).unwrap(), ["abc"]);
    }

    #[test]
    fn scalar_substitution() {
        let env = env_with(&[("HOME", Value::from("/home/alice"))]);
        assert_eq!(
            expand(&env, unquoted("$HOME/x")).unwrap(),
            ["/home/alice/x"]
        );
    }

    #[test]
    fn array_fans_out() {
        let env = env_with(&[(
            "v",
            Value::Array(vec![WString::from("a"), WString::from("b")]),
        )]);
        assert_eq!(expand(&env, unquoted("$v.txt")).unwrap(), ["a.txt", "b.txt"]);
    }

    #[test]
    fn whole_token_array_has_no_seam() {
        let env = env_with(&[(
            "v",
            Value::Array(vec![WString::from("a"), WString::from("b")]),
        )]);
        let mut out = Vec::new();
        expand_variables(&env, unquoted("$v"), &mut out).unwrap();
        assert_eq!(out, [WString::from("a"), WString::from("b")]);
    }

    #[test]
    fn quoted_form_joins_with_spaces() {
        let env = env_with(&[(
            "v",
            Value::Array(vec![WString::from("a"), WString::from("b")]),
        )]);
        let mut input = WString::new();
        input.push(Wchar::VariableExpandSingle);
        input.push_str("v");
        assert_eq!(expand(&env, input).unwrap(), ["a b"]);
    }

    #[test]
    fn unset_unquoted_elides_the_argument() {
        let env = env_with(&[]);
        assert_eq!(expand(&env, unquoted("pre$UNSET post")).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn unset_quoted_is_empty_string() {
        let env = env_with(&[]);
        let mut input = WString::new();
        input.push(Wchar::VariableExpandSingle);
        input.push_str("UNSET");
        assert_eq!(expand(&env, input).unwrap(), [""]);
    }

    #[test]
    fn double_dollar_expands_twice() {
        let env = env_with(&[
            ("inner", Value::from("outer")),
            ("outer", Value::from("gold")),
        ]);
        assert_eq!(expand(&env, unquoted("$$inner")).unwrap(), ["gold"]);
    }

    #[test]
    fn slices_select_elements() {
        let env = env_with(&[(
            "v",
            Value::Array(vec![
                WString::from("a"),
                WString::from("b"),
                WString::from("c"),
            ]),
        )]);
        assert_eq!(expand(&env, unquoted("$v[2]")).unwrap(), ["b"]);
        assert_eq!(expand(&env, unquoted("$v[-1 1]")).unwrap(), ["c", "a"]);
    }

    #[test]
    fn out_of_bounds_slice_is_an_error() {
        let env = env_with(&[("v", Value::from("only"))]);
        let err = expand(&env, unquoted("$v[2]")).unwrap_err();
        assert_matches!(err.cause, crate::ErrorCause::Syntax(_));
    }

    #[test]
    fn zero_index_is_an_error() {
        let env = env_with(&[("v", Value::from("only"))]);
        assert!(expand(&env, unquoted("$v[0]")).is_err());
    }

    #[test]
    fn missing_name_is_an_error() {
        let env = env_with(&[]);
        let err = expand(&env, unquoted("$ x")).unwrap_err();
        assert_matches!(err.cause, crate::ErrorCause::Syntax(message) => {
            assert!(message.contains("' '"), "message was {message:?}");
        });
        assert!(expand(&env, unquoted("$")).is_err());
    }
}
