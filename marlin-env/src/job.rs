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

//! Job table as seen by process expansion.
//!
//! Process expansion (`%`) needs to look jobs up by job id and match their
//! command lines; actual job control lives elsewhere in the shell.

use marlin_wstr::WString;

/// One process within a job.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Process {
    pub pid: i32,
    /// The command this process is running, as typed.
    pub command: WString,
}

/// One job.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Job {
    pub job_id: u32,
    pub pgid: i32,
    /// Full command line of the job.
    pub command: WString,
    pub processes: Vec<Process>,
}

/// Table of known jobs.
#[derive(Clone, Debug, Default)]
pub struct JobList {
    jobs: Vec<Job>,
    /// Process id of the most recently backgrounded job, if any.
    pub last_background_pid: Option<i32>,
}

impl JobList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, job: Job) {
        self.jobs.push(job);
    }

    #[must_use]
    pub fn get(&self, job_id: u32) -> Option<&Job> {
        self.jobs.iter().find(|j| j.job_id == job_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: u32, pgid: i32, command: &str) -> Job {
        Job {
            job_id: id,
            pgid,
            command: WString::from(command),
            processes: vec![Process {
                pid: pgid,
                command: WString::from(command),
            }],
        }
    }

    #[test]
    fn lookup_by_job_id() {
        let mut jobs = JobList::new();
        jobs.add(job(1, 100, "sleep 10"));
        jobs.add(job(2, 200, "make"));
        assert_eq!(jobs.get(2).map(|j| j.pgid), Some(200));
        assert_eq!(jobs.get(3), None);
    }
}
