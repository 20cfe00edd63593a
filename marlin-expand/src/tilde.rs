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

//! Home directory expansion.
//!
//! A [`Wchar::HomeDirectory`] atom at the start of the token stands for the
//! current user's home (`$HOME`, or the password database when `HOME` is
//! unset); `~user` is the named user's home. An unknown user leaves the
//! token as typed.

use marlin_env::Env;
use marlin_wstr::{WString, Wchar};

pub(crate) fn expand_tilde(env: &Env, input: &mut WString) {
    if input.first() != Some(&Wchar::HomeDirectory) {
        return;
    }

    let (home, tail_idx) = match input.get(1) {
        None | Some(Wchar::Char('/')) => {
            let home = env
                .variables
                .get("HOME")
                .map(|v| v.joined())
                .filter(|h| !h.is_empty())
                .or_else(|| env.system.own_home_directory());
            (home, 1)
        }
        Some(_) => {
            let name_end = input
                .iter()
                .position(|a| a.is_char('/'))
                .unwrap_or(input.len());
            let name: String = input[1..name_end]
                .iter()
                .filter_map(|a| a.as_char())
                .collect();
            (env.system.user_home_directory(&name), name_end)
        }
    };

    match home {
        Some(home) => {
            let mut result = home;
            result.extend(input[tail_idx..].iter().copied());
            *input = result;
        }
        None => {
            // Unknown user or no home at all: leave the tilde as typed.
            input[0] = Wchar::Char('~');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marlin_env::variable::{Scope, Value};
    use marlin_env::{User, VirtualSystem};

    fn tilde_input(rest: &str) -> WString {
        let mut input = WString::new();
        input.push(Wchar::HomeDirectory);
        input.push_str(rest);
        input
    }

    #[test]
    fn home_variable_wins() {
        let mut env = Env::new_virtual();
        env.variables
            .set("HOME", Scope::Global, Value::from("/home/alice"));
        let mut input = tilde_input("/x");
        expand_tilde(&env, &mut input);
        assert_eq!(input, "/home/alice/x");
    }

    #[test]
    fn bare_tilde_expands_to_home() {
        let mut env = Env::new_virtual();
        env.variables
            .set("HOME", Scope::Global, Value::from("/home/alice"));
        let mut input = tilde_input("");
        expand_tilde(&env, &mut input);
        assert_eq!(input, "/home/alice");
    }

    #[test]
    fn password_database_is_the_fallback() {
        let system = VirtualSystem::new();
        system.state.borrow_mut().own_home = Some(WString::from("/root"));
        let env = Env::with_system(Box::new(system));
        let mut input = tilde_input("/y");
        expand_tilde(&env, &mut input);
        assert_eq!(input, "/root/y");
    }

    #[test]
    fn named_user_lookup() {
        let system = VirtualSystem::new();
        system.state.borrow_mut().users.push(User {
            name: "bob".to_owned(),
            home: WString::from("/home/bob"),
        });
        let env = Env::with_system(Box::new(system));
        let mut input = tilde_input("bob/f");
        expand_tilde(&env, &mut input);
        assert_eq!(input, "/home/bob/f");
    }

    #[test]
    fn unknown_user_stays_literal() {
        let env = Env::new_virtual();
        let mut input = tilde_input("ghost/f");
        expand_tilde(&env, &mut input);
        assert_eq!(input, "~ghost/f");
    }

    #[test]
    fn plain_tokens_are_untouched() {
        let env = Env::new_virtual();
        let mut input = WString::from("~not-first");
        expand_tilde(&env, &mut input);
        assert_eq!(input, "~not-first");
    }
}
