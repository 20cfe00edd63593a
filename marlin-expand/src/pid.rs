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

//! Process expansion.
//!
//! A token beginning with [`Wchar::ProcessExpand`] names a process: `%self`
//! is the shell itself, `%last` the most recently backgrounded job, `%N` the
//! job with that id (expanding to its process group id), and any other text
//! matches the command lines of known jobs and their processes. In
//! completion mode the same matching produces candidates instead of
//! substituting.

use crate::{ExpandError, ExpandFlags};
use marlin_env::Env;
use marlin_env::completion::{CompleteFlags, Completion};
use marlin_wstr::{WString, Wchar};

const SELF_STR: &str = "self";
const LAST_STR: &str = "last";

fn token_of(input: &WString) -> String {
    input[1..].iter().filter_map(|a| a.as_char()).collect()
}

fn pid_string(pid: i32) -> WString {
    WString::from(pid.to_string())
}

/// First whitespace-delimited token of a command line, for matching a typed
/// prefix against the command rather than its arguments.
fn first_token(command: &WString) -> WString {
    command
        .iter()
        .copied()
        .take_while(|a| !matches!(a.as_char(), Some(' ' | '\t' | '\n')))
        .collect()
}

/// Matches `typed` against a job command line: either as a prefix of the
/// whole line, or as a prefix of the basename of its first token. Returns
/// the character offset the match starts at.
fn match_pid(command: &WString, typed: &str) -> Option<usize> {
    let typed_atoms = WString::from(typed);
    if command.len() >= typed_atoms.len() && command[..typed_atoms.len()] == typed_atoms[..] {
        return Some(0);
    }

    let first = first_token(command);
    let base_start = first.iter().rposition(|a| a.is_char('/'))? + 1;
    let base = &first[base_start..];
    if base.len() >= typed_atoms.len() && base[..typed_atoms.len()] == typed_atoms[..] {
        return Some(base_start);
    }
    None
}

/// Evaluation-mode process expansion; pushes the replacement strings.
pub(crate) fn expand_pid(
    env: &Env,
    input: &WString,
    flags: ExpandFlags,
    out: &mut Vec<WString>,
) -> Result<(), ExpandError> {
    debug_assert_eq!(input.first(), Some(&Wchar::ProcessExpand));
    let token = token_of(input);

    if token == SELF_STR {
        out.push(pid_string(env.system.getpid()));
        return Ok(());
    }
    if token == LAST_STR {
        if let Some(pid) = env.jobs.last_background_pid {
            out.push(pid_string(pid));
        }
        return Ok(());
    }

    if flags.contains(ExpandFlags::SKIP_JOBS) {
        return Err(ExpandError::syntax(
            format!("Job expansion of '%{token}' is not allowed here"),
            0,
        ));
    }

    let mut found = false;

    // A numeric token is a job id.
    if !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()) {
        if let Some(job) = token.parse().ok().and_then(|id| env.jobs.get(id)) {
            out.push(pid_string(job.pgid));
            found = true;
        }
    }

    // Otherwise match against job command lines, then against the processes
    // inside each job.
    if !found {
        for job in env.jobs.iter() {
            if match_pid(&job.command, &token).is_some() {
                out.push(pid_string(job.pgid));
                found = true;
            }
        }
    }
    if !found {
        for job in env.jobs.iter() {
            for process in &job.processes {
                if match_pid(&process.command, &token).is_some() {
                    out.push(pid_string(process.pid));
                    found = true;
                }
            }
        }
    }

    if found {
        Ok(())
    } else {
        Err(ExpandError::syntax(
            format!("No matching job or process for '%{token}'"),
            0,
        ))
    }
}

/// Completion-mode process expansion; pushes candidates extending the typed
/// token.
pub(crate) fn complete_pid(
    env: &Env,
    input: &WString,
    flags: ExpandFlags,
    out: &mut Vec<Completion>,
) {
    debug_assert_eq!(input.first(), Some(&Wchar::ProcessExpand));
    let token = token_of(input);

    for (word, desc) in [(SELF_STR, "Shell process"), (LAST_STR, "Last background job")] {
        if word.starts_with(&token) {
            out.push(Completion::with_details(
                WString::from(&word[token.len()..]),
                desc,
                CompleteFlags::empty(),
                marlin_wildcard::FuzzyMatch::exact(),
            ));
        }
    }

    if flags.contains(ExpandFlags::SKIP_JOBS) {
        return;
    }

    if token.is_empty() || token.chars().all(|c| c.is_ascii_digit()) {
        for job in env.jobs.iter() {
            let jid = job.job_id.to_string();
            if jid.starts_with(&token) && !job.command.is_empty() {
                out.push(Completion::with_details(
                    WString::from(&jid[token.len()..]),
                    format!("Job: {}", job.command),
                    CompleteFlags::empty(),
                    marlin_wildcard::FuzzyMatch::exact(),
                ));
            }
        }
    }

    for job in env.jobs.iter() {
        if let Some(offset) = match_pid(&job.command, &token) {
            let rest = job.command.substring(offset + token.chars().count()..job.command.len());
            out.push(Completion::with_details(
                rest,
                "Job",
                CompleteFlags::empty(),
                marlin_wildcard::FuzzyMatch::exact(),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marlin_env::VirtualSystem;
    use marlin_env::job::{Job, JobList, Process};

    fn process_token(text: &str) -> WString {
        let mut input = WString::new();
        input.push(Wchar::ProcessExpand);
        input.push_str(text);
        input
    }

    fn env_with_jobs() -> Env {
        let mut env = {
            let system = VirtualSystem::new();
            system.state.borrow_mut().pid = 1234;
            Env::with_system(Box::new(system))
        };
        let mut jobs = JobList::new();
        jobs.add(Job {
            job_id: 1,
            pgid: 100,
            command: WString::from("sleep 10"),
            processes: vec![Process {
                pid: 100,
                command: WString::from("sleep 10"),
            }],
        });
        jobs.add(Job {
            job_id: 2,
            pgid: 200,
            command: WString::from("/usr/bin/make all"),
            processes: vec![Process {
                pid: 201,
                command: WString::from("/usr/bin/make all"),
            }],
        });
        jobs.last_background_pid = Some(200);
        env.jobs = jobs;
        env
    }

    fn expand(env: &Env, text: &str) -> Result<Vec<String>, ExpandError> {
        let mut out = Vec::new();
        expand_pid(env, &process_token(text), ExpandFlags::empty(), &mut out)?;
        Ok(out.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn percent_self_is_the_shell_pid() {
        let env = env_with_jobs();
        assert_eq!(expand(&env, "self").unwrap(), ["1234"]);
    }

    #[test]
    fn percent_last_is_the_background_pid() {
        let env = env_with_jobs();
        assert_eq!(expand(&env, "last").unwrap(), ["200"]);
    }

    #[test]
    fn numeric_token_resolves_a_job_id() {
        let env = env_with_jobs();
        assert_eq!(expand(&env, "2").unwrap(), ["200"]);
    }

    #[test]
    fn prefix_matches_command_lines() {
        let env = env_with_jobs();
        assert_eq!(expand(&env, "sle").unwrap(), ["100"]);
    }

    #[test]
    fn basename_of_first_token_matches() {
        let env = env_with_jobs();
        assert_eq!(expand(&env, "make").unwrap(), ["200"]);
    }

    #[test]
    fn unknown_process_is_an_error() {
        let env = env_with_jobs();
        assert!(expand(&env, "nothing").is_err());
    }

    #[test]
    fn completion_extends_self_and_last() {
        let env = env_with_jobs();
        let mut out = Vec::new();
        complete_pid(&env, &process_token("se"), ExpandFlags::empty(), &mut out);
        assert!(out.iter().any(|c| c.completion == "lf"));
    }

    #[test]
    fn completion_extends_job_ids_and_commands() {
        let env = env_with_jobs();
        let mut out = Vec::new();
        complete_pid(&env, &process_token(""), ExpandFlags::empty(), &mut out);
        let texts: Vec<String> = out.iter().map(|c| c.completion.to_string()).collect();
        assert!(texts.contains(&"1".to_owned()));
        assert!(texts.contains(&"2".to_owned()));
        assert!(texts.contains(&"sleep 10".to_owned()));
    }
}
