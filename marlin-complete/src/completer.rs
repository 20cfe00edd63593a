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

//! The completion resolver.
//!
//! Given a command line and a cursor position, [`Completer::complete`]
//! classifies the token under the cursor and produces candidates:
//!
//! - a token ending in `$name` completes variable names,
//! - a token `~name` with no slash completes user names,
//! - the command position completes executables on `PATH`, functions,
//!   builtins, and (for implicit `cd`) directories on `CDPATH`,
//! - an argument position consults the command's registered option rule and
//!   falls back to file completion.
//!
//! Errors never escape: a failed expansion simply contributes no
//! candidates. Option preconditions are evaluated at most once per run
//! through a condition cache owned by the run itself.

use crate::parse_util::{self, TokenKind};
use crate::registry::{CompleteEntry, CompleteOption, CompletionRegistry};
use marlin_env::Env;
use marlin_env::completion::{
    CompleteFlags, Completion, dedup_completions, sort_completions,
};
use marlin_escape::{EscapeFlags, UnescapeFlags, escape, unescape};
use marlin_expand::{ExpandFlags, expand_one, expand_string, wildcard_complete};
use marlin_wildcard::{FuzzyMatch, wildcard_match};
use marlin_wstr::WString;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Soft deadline for scanning the password database.
const USER_COMPLETION_DEADLINE: Duration = Duration::from_millis(200);

/// One completion run's worth of state.
pub struct Completer<'a> {
    env: &'a mut Env,
    registry: &'a mut CompletionRegistry,
    /// Names of defined shell functions, for command completion.
    pub functions: Vec<String>,
    /// Names of builtins, for command completion.
    pub builtins: Vec<String>,
    /// Cached results of option precondition scripts; lives for one run.
    condition_cache: HashMap<WString, bool>,
}

/// Convenience wrapper running one completion request.
pub fn complete(
    env: &mut Env,
    registry: &mut CompletionRegistry,
    cmdline: &str,
    cursor: usize,
) -> Vec<Completion> {
    Completer::new(env, registry).complete(cmdline, cursor)
}

impl<'a> Completer<'a> {
    pub fn new(env: &'a mut Env, registry: &'a mut CompletionRegistry) -> Self {
        Completer {
            env,
            registry,
            functions: Vec::new(),
            builtins: Vec::new(),
            condition_cache: HashMap::new(),
        }
    }

    /// Produces the candidate list for `cmdline` with the cursor at the
    /// character offset `cursor`.
    pub fn complete(&mut self, cmdline: &str, cursor: usize) -> Vec<Completion> {
        let chars: Vec<char> = cmdline.chars().collect();
        let cursor = cursor.min(chars.len());
        let mut out = Vec::new();

        let sub_range = parse_util::cmdsubst_extent(&chars, cursor);
        let (token_range, prev_range) = parse_util::token_extent(&chars, cursor, sub_range.clone());
        let current_token: String = chars[token_range.start..cursor].iter().collect();
        let prev_token: String = chars[prev_range].iter().collect();

        if !self.try_complete_variable(&current_token, &mut out)
            && !self.try_complete_user(&current_token, &mut out)
        {
            self.complete_command_or_argument(
                &chars,
                cursor,
                sub_range,
                &current_token,
                &prev_token,
                &mut out,
            );
        }

        sort_completions(&mut out);
        dedup_completions(&mut out);
        self.condition_cache.clear();
        out
    }

    fn complete_command_or_argument(
        &mut self,
        chars: &[char],
        cursor: usize,
        sub_range: std::ops::Range<usize>,
        current_token: &str,
        prev_token: &str,
        out: &mut Vec<Completion>,
    ) {
        let pos = cursor - sub_range.start;
        let slice: Vec<char> = chars[sub_range].to_vec();

        let mut had_cmd = false;
        let mut had_ddash = false;
        let mut on_command = false;
        let mut current_command = String::new();
        let mut use_command = true;
        let mut use_function = true;
        let mut use_builtin = true;

        for token in parse_util::tokenize(&slice) {
            match token.kind {
                TokenKind::String => {
                    let text: String = slice[token.offset..token.end()].iter().collect();
                    let is_ddash = text == "--" && token.end() < pos;
                    if !had_cmd {
                        // The `builtin` and `command` keywords restrict which
                        // candidate classes the following word may come from.
                        if text == "builtin" {
                            use_function = false;
                            use_command = false;
                            use_builtin = true;
                        } else if text == "command" {
                            use_command = true;
                            use_function = false;
                            use_builtin = false;
                        } else if !is_ddash || (use_command && use_function && use_builtin) {
                            current_command = text;
                            on_command = pos <= token.end();
                            had_cmd = true;
                        }
                    } else if is_ddash {
                        had_ddash = true;
                    }
                }
                TokenKind::End | TokenKind::Pipe | TokenKind::Background => {
                    had_cmd = false;
                    had_ddash = false;
                    use_command = true;
                    use_function = true;
                    use_builtin = true;
                }
                TokenKind::Error => break,
            }
            if token.offset >= pos {
                break;
            }
        }

        // A switch typed right after `builtin` or `command` completes against
        // that keyword's own options.
        if (on_command || current_token == "--")
            && current_token.starts_with('-')
            && !(use_command && use_function && use_builtin)
        {
            current_command = if use_command { "command" } else { "builtin" }.to_owned();
            on_command = false;
            had_cmd = true;
        }

        if !had_cmd {
            on_command = true;
        }

        if on_command {
            self.complete_cmd(current_token, use_function, use_builtin, use_command, out);
        } else {
            let mut do_file = false;
            let unescaped = (
                unescape(&current_command, UnescapeFlags::empty()),
                unescape(prev_token, UnescapeFlags::empty()),
                unescape(current_token, UnescapeFlags::INCOMPLETE),
            );
            if let (Ok(cmd), Ok(prev), Ok(token)) = unescaped {
                do_file = self.complete_param(
                    &cmd.to_string(),
                    &prev.to_string(),
                    &token.to_string(),
                    !had_ddash,
                    out,
                );
            }
            // With no command specific completions at all, fall back to
            // files.
            if out.is_empty() {
                do_file = true;
            }
            self.complete_param_expand(current_token, do_file, out);
        }
    }

    /// Completes the command position.
    fn complete_cmd(
        &mut self,
        typed: &str,
        use_function: bool,
        use_builtin: bool,
        use_command: bool,
        out: &mut Vec<Completion>,
    ) {
        if typed.contains('/') || typed.starts_with('~') {
            if use_command {
                let _ = expand_string(
                    self.env,
                    typed,
                    ExpandFlags::FOR_COMPLETIONS | ExpandFlags::EXECUTABLES_ONLY,
                    out,
                );
            }
        } else {
            if use_command {
                if let Some(path) = self.env.variables.get("PATH").cloned() {
                    for dir in path.items() {
                        if dir.is_empty() {
                            continue;
                        }
                        self.complete_in_dir(&dir, typed, ExpandFlags::EXECUTABLES_ONLY, out);
                    }
                }
            }
            if use_function {
                let underscored = typed.starts_with('_');
                let functions: Vec<String> = self
                    .functions
                    .iter()
                    .filter(|name| underscored || !name.starts_with('_'))
                    .cloned()
                    .collect();
                self.complete_strings(typed, &functions, "Function", out);
            }
            if use_builtin {
                let builtins = self.builtins.clone();
                self.complete_strings(typed, &builtins, "Builtin", out);
            }
        }

        // Implicit cd: directories from CDPATH complete in command position.
        let cd_available =
            use_builtin || (use_function && self.functions.iter().any(|f| f == "cd"));
        if cd_available && !typed.starts_with('/') && !typed.starts_with("./") {
            let cdpath = self
                .env
                .variables
                .get("CDPATH")
                .cloned()
                .map_or_else(|| vec![WString::from(".")], |v| v.items());
            for dir in cdpath {
                if dir.is_empty() {
                    continue;
                }
                self.complete_in_dir(
                    &dir,
                    typed,
                    ExpandFlags::DIRECTORIES_ONLY | ExpandFlags::NO_DESCRIPTIONS,
                    out,
                );
            }
        }
    }

    /// Expands `<dir>/<typed>` in completion mode, then strips the directory
    /// prefix from candidates that replace the token.
    fn complete_in_dir(
        &mut self,
        dir: &WString,
        typed: &str,
        extra_flags: ExpandFlags,
        out: &mut Vec<Completion>,
    ) {
        let mut pattern = escape(dir, EscapeFlags::ALL | EscapeFlags::NO_QUOTED);
        let add_slash = !pattern.ends_with('/');
        if add_slash {
            pattern.push('/');
        }
        pattern.push_str(typed);

        let before = out.len();
        if expand_string(
            self.env,
            &pattern,
            ExpandFlags::FOR_COMPLETIONS | extra_flags,
            out,
        )
        .is_ok()
        {
            let strip = dir.len() + usize::from(add_slash);
            for completion in &mut out[before..] {
                if completion.flags.contains(CompleteFlags::REPLACES_TOKEN)
                    && completion.completion.len() >= strip
                {
                    completion.completion = completion
                        .completion
                        .substring(strip..completion.completion.len());
                }
            }
        }
    }

    /// Offers each of `names` that the typed token is a (possibly fuzzy)
    /// prefix of.
    fn complete_strings(
        &mut self,
        typed: &str,
        names: &[String],
        description: &str,
        out: &mut Vec<Completion>,
    ) {
        let Ok(wc) = expand_one(
            self.env,
            typed,
            ExpandFlags::SKIP_CMDSUBST | ExpandFlags::SKIP_WILDCARDS,
        ) else {
            return;
        };
        for name in names {
            wildcard_complete(
                &WString::from(name.as_str()),
                &wc,
                description,
                Some(out),
                ExpandFlags::empty(),
                CompleteFlags::empty(),
            );
        }
    }

    /// Argument completion from the command's registered rule. Returns
    /// whether file completion should follow.
    fn complete_param(
        &mut self,
        cmd: &str,
        prev: &str,
        typed: &str,
        use_switches: bool,
        out: &mut Vec<Completion>,
    ) -> bool {
        let base = cmd.rsplit('/').next().unwrap_or(cmd);
        self.registry.load(base);

        let cmd_w = WString::from(cmd);
        let base_w = WString::from(base);
        let entries: Vec<CompleteEntry> = self
            .registry
            .iter()
            .filter(|(name, is_path, _)| {
                // A rule name is itself a pattern, so `complete --path
                // '*/git'` style registrations work.
                let target = if *is_path { &cmd_w } else { &base_w };
                let pattern = unescape(name, UnescapeFlags::SPECIAL)
                    .unwrap_or_else(|_| WString::from(*name));
                wildcard_match(target, &pattern)
            })
            .map(|(_, _, entry)| entry.clone())
            .collect();

        let mut use_files = true;

        for entry in &entries {
            let mut use_common = true;

            if use_switches {
                if typed.starts_with('-') {
                    // A combined option and argument, like `--color=auto`.
                    for option in &entry.options {
                        if let Some(argument) = param_match_combined(option, typed) {
                            if self.condition_test(&option.condition) {
                                use_common &= option.result_mode.allows_common();
                                use_files &= option.result_mode.allows_files();
                                self.complete_from_args(&argument, option, out);
                            }
                        }
                    }
                } else if prev.starts_with('-') {
                    // The previous token was a switch; maybe we are its
                    // argument. Old-style options go first.
                    let mut old_style_match = false;
                    for option in entry.options.iter().filter(|o| o.old_style) {
                        if param_match_old(option, prev) && self.condition_test(&option.condition) {
                            old_style_match = true;
                            use_common &= option.result_mode.allows_common();
                            use_files &= option.result_mode.allows_files();
                            self.complete_from_args(typed, option, out);
                        }
                    }
                    if !old_style_match {
                        for option in &entry.options {
                            // A long option with an optional argument must
                            // use the `=` form to be distinguishable from a
                            // free argument.
                            if !option.old_style
                                && option.long.is_some()
                                && !option.result_mode.requires_argument()
                            {
                                continue;
                            }
                            if param_match(option, prev) && self.condition_test(&option.condition) {
                                use_common &= option.result_mode.allows_common();
                                use_files &= option.result_mode.allows_files();
                                self.complete_from_args(typed, option, out);
                            }
                        }
                    }
                }
            }

            if !use_common {
                continue;
            }

            for option in &entry.options {
                if !self.condition_test(&option.condition) {
                    continue;
                }

                // An entry without switches completes free arguments.
                if option.short.is_none() && option.long.is_none() {
                    use_files &= option.result_mode.allows_files();
                    self.complete_from_args(typed, option, out);
                }

                if typed.is_empty() || !use_switches {
                    continue;
                }

                if let Some(letter) = option.short {
                    if short_ok(typed, letter, &entry.short_options) {
                        out.push(Completion::with_details(
                            WString::from(letter.to_string()),
                            option.description.clone(),
                            CompleteFlags::empty(),
                            FuzzyMatch::exact(),
                        ));
                    }
                }

                if let Some(long) = &option.long {
                    let dashes = if option.old_style { "-" } else { "--" };
                    let whole = format!("{dashes}{long}");
                    if let Some(suffix) = whole.strip_prefix(typed) {
                        let has_arg = option.arguments.is_some();
                        if !option.old_style && has_arg && !option.result_mode.requires_argument() {
                            out.push(Completion::with_details(
                                WString::from(format!("{suffix}=")),
                                option.description.clone(),
                                CompleteFlags::empty(),
                                FuzzyMatch::exact(),
                            ));
                        }
                        out.push(Completion::with_details(
                            WString::from(suffix),
                            option.description.clone(),
                            CompleteFlags::empty(),
                            FuzzyMatch::exact(),
                        ));
                    } else if whole.to_lowercase().starts_with(&typed.to_lowercase()) {
                        out.push(Completion::with_details(
                            WString::from(whole),
                            option.description.clone(),
                            CompleteFlags::NO_CASE
                                | CompleteFlags::REPLACES_TOKEN
                                | CompleteFlags::DONT_ESCAPE,
                            FuzzyMatch::exact(),
                        ));
                    }
                }
            }
        }

        use_files
    }

    /// File completion for the current token.
    fn complete_param_expand(&mut self, typed: &str, do_file: bool, out: &mut Vec<Completion>) {
        // For `--switch=value`, complete the value part only.
        let to_expand = match typed.strip_prefix("--") {
            Some(rest) => match rest.split_once('=') {
                Some((_, value)) => value,
                None => typed,
            },
            None => typed,
        };

        let mut flags = ExpandFlags::SKIP_CMDSUBST | ExpandFlags::FOR_COMPLETIONS;
        if !do_file {
            flags |= ExpandFlags::SKIP_WILDCARDS;
        }
        let _ = expand_string(self.env, to_expand, flags, out);
    }

    /// Generates candidates from an option's argument generator script.
    fn complete_from_args(&mut self, typed: &str, option: &CompleteOption, out: &mut Vec<Completion>) {
        let Some(script) = &option.arguments else {
            return;
        };
        if script.is_empty() {
            return;
        }

        let surface = script.to_string();
        let chars: Vec<char> = surface.chars().collect();
        let mut candidates: Vec<WString> = Vec::new();
        for token in parse_util::tokenize(&chars) {
            if token.kind != TokenKind::String {
                continue;
            }
            let text: String = chars[token.offset..token.end()].iter().collect();
            let mut values = Vec::new();
            if expand_string(self.env, &text, ExpandFlags::SKIP_JOBS, &mut values).is_ok() {
                candidates.extend(values.into_iter().map(|c| c.completion));
            }
        }

        let Ok(wc) = expand_one(
            self.env,
            typed,
            ExpandFlags::SKIP_CMDSUBST | ExpandFlags::SKIP_WILDCARDS,
        ) else {
            return;
        };
        for candidate in &candidates {
            wildcard_complete(
                candidate,
                &wc,
                &option.description,
                Some(out),
                ExpandFlags::empty(),
                option.flags,
            );
        }
    }

    /// Evaluates an option's precondition, caching the result for the rest
    /// of this run.
    fn condition_test(&mut self, condition: &Option<WString>) -> bool {
        let Some(script) = condition else {
            return true;
        };
        if script.is_empty() {
            return true;
        }
        if let Some(&cached) = self.condition_cache.get(script) {
            return cached;
        }
        let result = self
            .env
            .evaluator
            .eval_subshell(script)
            .map(|output| output.succeeded())
            .unwrap_or(false);
        self.condition_cache.insert(script.clone(), result);
        result
    }

    /// Variable name completion for a token ending in `$name`.
    fn try_complete_variable(&mut self, typed: &str, out: &mut Vec<Completion>) -> bool {
        let chars: Vec<char> = typed.chars().collect();
        let mut i = chars.len();
        while i > 0 {
            let c = chars[i - 1];
            if c == '$' {
                return self.complete_variable(&chars, i, out);
            }
            if !c.is_alphanumeric() && c != '_' {
                return false;
            }
            i -= 1;
        }
        false
    }

    fn complete_variable(
        &mut self,
        whole: &[char],
        start_offset: usize,
        out: &mut Vec<Completion>,
    ) -> bool {
        let var: String = whole[start_offset..].iter().collect();
        let mut found = false;

        for name in self.env.variables.names() {
            let Some(value) = self.env.variables.get(&name) else {
                continue;
            };
            let description = format!("Variable: {}", value.joined());

            if let Some(suffix) = name.strip_prefix(&var) {
                out.push(Completion::with_details(
                    WString::from(suffix),
                    description,
                    CompleteFlags::empty(),
                    FuzzyMatch::exact(),
                ));
                found = true;
            } else if name.to_lowercase().starts_with(&var.to_lowercase()) {
                let mut replacement: WString = whole[..start_offset]
                    .iter()
                    .map(|&c| marlin_wstr::Wchar::Char(c))
                    .collect();
                replacement.push_str(&name);
                out.push(Completion::with_details(
                    replacement,
                    description,
                    CompleteFlags::NO_CASE
                        | CompleteFlags::DONT_ESCAPE
                        | CompleteFlags::REPLACES_TOKEN,
                    FuzzyMatch::exact(),
                ));
                found = true;
            }
        }
        found
    }

    /// User name completion for a `~name` token.
    fn try_complete_user(&mut self, typed: &str, out: &mut Vec<Completion>) -> bool {
        let Some(name) = typed.strip_prefix('~') else {
            return false;
        };
        if typed.contains('/') || name.contains('~') {
            return false;
        }

        let start_time = Instant::now();
        let mut found = false;
        for user in self.env.system.users() {
            if start_time.elapsed() > USER_COMPLETION_DEADLINE {
                return true;
            }

            if let Some(suffix) = user.name.strip_prefix(name) {
                out.push(Completion::with_details(
                    WString::from(suffix),
                    "User home",
                    CompleteFlags::NO_SPACE,
                    FuzzyMatch::exact(),
                ));
                found = true;
            } else if user.name.to_lowercase().starts_with(&name.to_lowercase()) {
                out.push(Completion::with_details(
                    WString::from(format!("~{}", user.name)),
                    "User home",
                    CompleteFlags::NO_CASE
                        | CompleteFlags::DONT_ESCAPE
                        | CompleteFlags::NO_SPACE
                        | CompleteFlags::REPLACES_TOKEN,
                    FuzzyMatch::exact(),
                ));
                found = true;
            }
        }
        found
    }
}

fn param_match_combined(option: &CompleteOption, typed: &str) -> Option<String> {
    if option.old_style {
        return None;
    }
    let long = option.long.as_deref()?;
    let rest = typed.strip_prefix("--")?.strip_prefix(long)?;
    rest.strip_prefix('=').map(str::to_owned)
}

fn param_match(option: &CompleteOption, prev: &str) -> bool {
    if let Some(letter) = option.short {
        if prev.starts_with('-') && !prev.starts_with("--") && prev[1..].contains(letter) {
            return true;
        }
    }
    if let Some(long) = &option.long {
        if !option.old_style && prev.strip_prefix("--") == Some(long) {
            return true;
        }
    }
    false
}

fn param_match_old(option: &CompleteOption, prev: &str) -> bool {
    match &option.long {
        Some(long) => prev.strip_prefix('-') == Some(long.as_str()),
        None => false,
    }
}

/// Whether the short option `letter` may be appended to the cluster `typed`:
/// every letter already present must be a known short option that takes no
/// argument, and `letter` must not repeat.
fn short_ok(typed: &str, letter: char, short_options: &str) -> bool {
    let Some(rest) = typed.strip_prefix('-') else {
        return false;
    };
    if rest.starts_with('-') {
        return false;
    }
    if typed.contains(letter) {
        return false;
    }
    rest.chars().all(|c| {
        short_options
            .find(c)
            .is_some_and(|pos| !short_options[pos + c.len_utf8()..].starts_with(':'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ResultMode;
    use marlin_env::VirtualSystem;
    use marlin_env::eval::{EvalError, Evaluator, SubshellOutput};
    use marlin_env::variable::{Scope, Value};
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct CountingEvaluator {
        calls: Rc<Cell<u32>>,
        succeed: bool,
    }

    impl Evaluator for CountingEvaluator {
        fn eval_subshell(&mut self, _source: &WString) -> Result<SubshellOutput, EvalError> {
            self.calls.set(self.calls.get() + 1);
            Ok(SubshellOutput {
                exit_status: if self.succeed { 0 } else { 1 },
                lines: Vec::new(),
            })
        }
    }

    fn sample_env() -> Env {
        let system = VirtualSystem::new();
        system.create_file_with("bin/echo", 16, true);
        system.create_file_with("bin/ls", 16, true);
        system.create_file("notes.txt");
        system.mkdir_p("projects");
        let mut env = Env::with_system(Box::new(system));
        env.variables
            .set("PATH", Scope::Global, Value::from("/bin"));
        env
    }

    fn texts(completions: &[Completion]) -> Vec<String> {
        completions.iter().map(|c| c.completion.to_string()).collect()
    }

    #[test]
    fn command_position_completes_path_executables() {
        let mut env = sample_env();
        let mut registry = CompletionRegistry::new();
        let out = complete(&mut env, &mut registry, "ec", 2);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].completion, "ho");
        assert!(out[0].description.starts_with("Executable"));
        assert!(!out[0].flags.contains(CompleteFlags::REPLACES_TOKEN));
    }

    #[test]
    fn command_position_completes_functions_and_builtins() {
        let mut env = sample_env();
        let mut registry = CompletionRegistry::new();
        let mut completer = Completer::new(&mut env, &mut registry);
        completer.functions = vec!["fish_prompt".to_owned(), "frob".to_owned()];
        completer.builtins = vec!["for".to_owned(), "function".to_owned()];
        let out = completer.complete("f", 1);
        let names = texts(&out);
        assert!(names.contains(&"rob".to_owned()));
        assert!(names.contains(&"or".to_owned()));
        assert!(names.contains(&"unction".to_owned()));
    }

    #[test]
    fn underscore_functions_are_hidden_by_default() {
        let mut env = sample_env();
        let mut registry = CompletionRegistry::new();
        let mut completer = Completer::new(&mut env, &mut registry);
        completer.functions = vec!["_hidden".to_owned()];
        assert!(completer.complete("h", 1).is_empty());
        let out = completer.complete("_h", 2);
        assert_eq!(texts(&out), ["idden"]);
    }

    #[test]
    fn builtin_keyword_restricts_candidates() {
        let mut env = sample_env();
        let mut registry = CompletionRegistry::new();
        let mut completer = Completer::new(&mut env, &mut registry);
        completer.builtins = vec!["echo".to_owned()];
        let out = completer.complete("builtin ec", 10);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].description, "Builtin");
    }

    #[test]
    fn argument_position_falls_back_to_files() {
        let mut env = sample_env();
        let mut registry = CompletionRegistry::new();
        let out = complete(&mut env, &mut registry, "cat no", 6);
        assert_eq!(texts(&out), ["tes.txt"]);
    }

    #[test]
    fn variable_completion_lists_names_with_values() {
        let mut env = sample_env();
        env.variables
            .set("PAGER", Scope::Global, Value::from("less"));
        let mut registry = CompletionRegistry::new();
        let out = complete(&mut env, &mut registry, "echo $PA", 8);
        let pager = out.iter().find(|c| c.completion == "GER").unwrap();
        assert_eq!(pager.description, "Variable: less");
        // PATH also matches the prefix.
        assert!(out.iter().any(|c| c.completion == "TH"));
    }

    #[test]
    fn case_insensitive_variable_match_replaces_the_token() {
        let mut env = sample_env();
        env.variables
            .set("PAGER", Scope::Global, Value::from("less"));
        let mut registry = CompletionRegistry::new();
        let out = complete(&mut env, &mut registry, "echo $pag", 9);
        let c = out.iter().find(|c| c.completion == "$PAGER").unwrap();
        assert!(c.flags.contains(CompleteFlags::REPLACES_TOKEN));
        assert!(c.flags.contains(CompleteFlags::NO_CASE));
    }

    #[test]
    fn user_completion_offers_login_names() {
        let mut env = sample_env();
        let system = VirtualSystem::new();
        system.state.borrow_mut().users.push(marlin_env::User {
            name: "alice".to_owned(),
            home: WString::from("/home/alice"),
        });
        system.state.borrow_mut().users.push(marlin_env::User {
            name: "bob".to_owned(),
            home: WString::from("/home/bob"),
        });
        env.system = Box::new(system);

        let mut registry = CompletionRegistry::new();
        let out = complete(&mut env, &mut registry, "echo ~al", 8);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].completion, "ice");
        assert!(out[0].flags.contains(CompleteFlags::NO_SPACE));
    }

    #[test]
    fn registered_long_options_complete() {
        let mut env = sample_env();
        let mut registry = CompletionRegistry::new();
        registry.add(
            "mytool",
            false,
            CompleteOption {
                long: Some("verbose".to_owned()),
                description: "Talk more".to_owned(),
                ..CompleteOption::default()
            },
        );
        let out = complete(&mut env, &mut registry, "mytool --ver", 12);
        let c = out.iter().find(|c| c.completion == "bose").unwrap();
        assert_eq!(c.description, "Talk more");
    }

    #[test]
    fn short_options_respect_the_cluster() {
        let mut env = sample_env();
        let mut registry = CompletionRegistry::new();
        registry.add(
            "mytool",
            false,
            CompleteOption {
                short: Some('a'),
                ..CompleteOption::default()
            },
        );
        registry.add(
            "mytool",
            false,
            CompleteOption {
                short: Some('b'),
                ..CompleteOption::default()
            },
        );
        let out = complete(&mut env, &mut registry, "mytool -a", 9);
        assert!(texts(&out).contains(&"b".to_owned()));
        // The letter already present is not offered again.
        assert!(!texts(&out).contains(&"a".to_owned()));
    }

    #[test]
    fn option_argument_generator_runs_for_equals_form() {
        let mut env = sample_env();
        let mut registry = CompletionRegistry::new();
        registry.add(
            "mytool",
            false,
            CompleteOption {
                long: Some("color".to_owned()),
                result_mode: ResultMode::Exclusive,
                arguments: Some(WString::from("auto never always")),
                ..CompleteOption::default()
            },
        );
        let out = complete(&mut env, &mut registry, "mytool --color=a", 16);
        let names = texts(&out);
        assert!(names.contains(&"uto".to_owned()));
        assert!(names.contains(&"lways".to_owned()));
        assert!(!names.contains(&"never".to_owned()));
    }

    #[test]
    fn required_argument_of_previous_option_completes() {
        let mut env = sample_env();
        let mut registry = CompletionRegistry::new();
        registry.add(
            "mytool",
            false,
            CompleteOption {
                short: Some('m'),
                result_mode: ResultMode::Exclusive,
                arguments: Some(WString::from("fast slow")),
                ..CompleteOption::default()
            },
        );
        let out = complete(&mut env, &mut registry, "mytool -m f", 11);
        assert_eq!(texts(&out), ["ast"]);
    }

    #[test]
    fn conditions_gate_options_and_are_cached() {
        let calls = Rc::new(Cell::new(0));
        let mut env = sample_env();
        env.evaluator = Box::new(CountingEvaluator {
            calls: Rc::clone(&calls),
            succeed: false,
        });

        let mut registry = CompletionRegistry::new();
        let condition = Some(WString::from("test -e marker"));
        for letter in ['x', 'y', 'z'] {
            registry.add(
                "mytool",
                false,
                CompleteOption {
                    short: Some(letter),
                    condition: condition.clone(),
                    ..CompleteOption::default()
                },
            );
        }

        let out = complete(&mut env, &mut registry, "mytool -x", 9);
        // All entries share one condition script: one evaluation, no
        // candidates because it failed.
        assert_eq!(calls.get(), 1);
        assert!(!texts(&out).contains(&"y".to_owned()));
    }

    #[test]
    fn double_dash_disables_switch_completion() {
        let mut env = sample_env();
        let mut registry = CompletionRegistry::new();
        registry.add(
            "mytool",
            false,
            CompleteOption {
                long: Some("verbose".to_owned()),
                ..CompleteOption::default()
            },
        );
        let out = complete(&mut env, &mut registry, "mytool -- --v", 13);
        assert!(!texts(&out).iter().any(|t| t.contains("erbose")));
    }

    #[test]
    fn results_are_sorted_and_deduplicated() {
        let mut env = sample_env();
        let mut registry = CompletionRegistry::new();
        let mut completer = Completer::new(&mut env, &mut registry);
        completer.builtins = vec!["echo".to_owned()];
        let out = completer.complete("ec", 2);
        // `echo` the builtin and `/bin/echo` both produce "ho"; merged.
        assert_eq!(texts(&out), ["ho"]);
    }
}
