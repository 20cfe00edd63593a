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

//! Operating system interface used by the wildcard walker and the completion
//! resolver.
//!
//! All file access in the core goes through the [`System`] trait so that the
//! walker can be exercised against the in-memory [`VirtualSystem`] in tests
//! while the shell runs on [`RealSystem`]. The calls mirror the platform
//! primitives the walker needs: `stat`, `lstat`, `opendir`/`readdir`,
//! `access`, the process id, and password-database lookups.

pub mod real;
pub mod r#virtual;

use errno::Errno;
use marlin_wstr::WString;
use std::fmt::Debug;
use std::path::Path;

/// Identity of a file, used to detect directories already visited during one
/// wildcard walk (symlink loops).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct FileId {
    pub device: u64,
    pub inode: u64,
    pub mtime_seconds: i64,
    pub mtime_nanos: i64,
}

/// Classification of a directory entry.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FileType {
    Regular,
    Directory,
    Symlink,
    CharDevice,
    BlockDevice,
    Fifo,
    Socket,
    Other,
}

/// Subset of `struct stat` the core consumes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Metadata {
    pub file_type: FileType,
    pub size: u64,
    /// Whether any execute permission bit is set.
    pub executable: bool,
    pub id: FileId,
}

impl Metadata {
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    #[must_use]
    pub fn is_regular(&self) -> bool {
        self.file_type == FileType::Regular
    }
}

/// One password-database entry, as much of it as the core needs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct User {
    pub name: String,
    pub home: WString,
}

/// Open directory handle.
///
/// Entries are yielded in an unspecified order and never include `.` or `..`.
/// Dropping the handle releases it.
pub trait Dir: Debug {
    fn next(&mut self) -> Result<Option<WString>, Errno>;
}

/// Interface to the operating system.
///
/// Every method takes `&self`; implementations requiring interior mutability
/// (the virtual file system) manage it themselves. All calls may block.
pub trait System: Debug {
    /// Process id of the shell.
    fn getpid(&self) -> i32;

    /// `stat`: follows symlinks.
    fn stat(&self, path: &Path) -> Result<Metadata, Errno>;

    /// `lstat`: does not follow the final symlink.
    fn lstat(&self, path: &Path) -> Result<Metadata, Errno>;

    /// `access(path, X_OK)`.
    fn is_executable(&self, path: &Path) -> bool;

    /// `access(path, F_OK)`.
    fn exists(&self, path: &Path) -> bool;

    /// Opens a directory for iteration.
    fn opendir(&self, path: &Path) -> Result<Box<dyn Dir>, Errno>;

    /// Home directory of the shell's own user, from the password database.
    ///
    /// This is the fallback when the `HOME` variable is unset.
    fn own_home_directory(&self) -> Option<WString>;

    /// Home directory of the named user, or `None` if no such user exists.
    fn user_home_directory(&self, name: &str) -> Option<WString>;

    /// Snapshot of the password database, for `~user` completion.
    fn users(&self) -> Vec<User>;
}
