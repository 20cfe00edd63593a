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

//! [`System`] implementation backed by the live operating system.

use super::{Dir, FileId, FileType, Metadata, System, User};
use errno::Errno;
use marlin_wstr::WString;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// The live operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct RealSystem;

impl RealSystem {
    #[must_use]
    pub fn new() -> Self {
        RealSystem
    }
}

fn errno_of(error: &std::io::Error) -> Errno {
    Errno(error.raw_os_error().unwrap_or(libc::EIO))
}

fn metadata_of(meta: &std::fs::Metadata) -> Metadata {
    use std::os::unix::fs::FileTypeExt;
    use std::os::unix::fs::MetadataExt;

    let ft = meta.file_type();
    let file_type = if ft.is_dir() {
        FileType::Directory
    } else if ft.is_file() {
        FileType::Regular
    } else if ft.is_symlink() {
        FileType::Symlink
    } else if ft.is_char_device() {
        FileType::CharDevice
    } else if ft.is_block_device() {
        FileType::BlockDevice
    } else if ft.is_fifo() {
        FileType::Fifo
    } else if ft.is_socket() {
        FileType::Socket
    } else {
        FileType::Other
    };

    Metadata {
        file_type,
        size: meta.size(),
        executable: meta.mode() & 0o111 != 0,
        id: FileId {
            device: meta.dev(),
            inode: meta.ino(),
            mtime_seconds: meta.mtime(),
            mtime_nanos: meta.mtime_nsec(),
        },
    }
}

fn access(path: &Path, mode: libc::c_int) -> bool {
    let Ok(cpath) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: cpath is a valid NUL-terminated string for the duration of the
    // call.
    unsafe { libc::access(cpath.as_ptr(), mode) == 0 }
}

fn home_from_passwd(entry: *const libc::passwd) -> Option<WString> {
    if entry.is_null() {
        return None;
    }
    // SAFETY: a non-null getpw* result points to a valid passwd record.
    let dir = unsafe { (*entry).pw_dir };
    if dir.is_null() {
        return None;
    }
    // SAFETY: pw_dir is a NUL-terminated string owned by the C library.
    let bytes = unsafe { std::ffi::CStr::from_ptr(dir) }.to_bytes();
    Some(WString::from_bytes(bytes))
}

#[derive(Debug)]
struct RealDir(std::fs::ReadDir);

impl Dir for RealDir {
    fn next(&mut self) -> Result<Option<WString>, Errno> {
        match self.0.next() {
            None => Ok(None),
            Some(Err(error)) => Err(errno_of(&error)),
            Some(Ok(entry)) => Ok(Some(WString::from_bytes(
                entry.file_name().as_os_str().as_bytes(),
            ))),
        }
    }
}

impl System for RealSystem {
    fn getpid(&self) -> i32 {
        std::process::id() as i32
    }

    fn stat(&self, path: &Path) -> Result<Metadata, Errno> {
        std::fs::metadata(path)
            .map(|m| metadata_of(&m))
            .map_err(|e| errno_of(&e))
    }

    fn lstat(&self, path: &Path) -> Result<Metadata, Errno> {
        std::fs::symlink_metadata(path)
            .map(|m| metadata_of(&m))
            .map_err(|e| errno_of(&e))
    }

    fn is_executable(&self, path: &Path) -> bool {
        access(path, libc::X_OK)
    }

    fn exists(&self, path: &Path) -> bool {
        access(path, libc::F_OK)
    }

    fn opendir(&self, path: &Path) -> Result<Box<dyn Dir>, Errno> {
        std::fs::read_dir(path)
            .map(|rd| Box::new(RealDir(rd)) as Box<dyn Dir>)
            .map_err(|e| errno_of(&e))
    }

    fn own_home_directory(&self) -> Option<WString> {
        // SAFETY: getuid has no preconditions; getpwuid returns a library
        // owned record or null.
        let entry = unsafe { libc::getpwuid(libc::getuid()) };
        home_from_passwd(entry)
    }

    fn user_home_directory(&self, name: &str) -> Option<WString> {
        let Ok(cname) = CString::new(name) else {
            return None;
        };
        // SAFETY: cname is valid for the duration of the call.
        let entry = unsafe { libc::getpwnam(cname.as_ptr()) };
        home_from_passwd(entry)
    }

    fn users(&self) -> Vec<User> {
        let mut out = Vec::new();
        // SAFETY: setpwent/getpwent/endpwent form the standard enumeration
        // protocol; records returned by getpwent stay valid until the next
        // call, so each is copied out immediately.
        unsafe {
            libc::setpwent();
            loop {
                let entry = libc::getpwent();
                if entry.is_null() {
                    break;
                }
                let name_ptr = (*entry).pw_name;
                if name_ptr.is_null() {
                    continue;
                }
                let name = std::ffi::CStr::from_ptr(name_ptr)
                    .to_string_lossy()
                    .into_owned();
                let Some(home) = home_from_passwd(entry) else {
                    continue;
                };
                out.push(User { name, home });
            }
            libc::endpwent();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_reports_directory_type() {
        let dir = tempfile::tempdir().unwrap();
        let meta = RealSystem.stat(dir.path()).unwrap();
        assert!(meta.is_dir());
    }

    #[test]
    fn lstat_distinguishes_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("t");
        let link = dir.path().join("l");
        std::fs::write(&target, b"x").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert_eq!(RealSystem.lstat(&link).unwrap().file_type, FileType::Symlink);
        assert_eq!(RealSystem.stat(&link).unwrap().file_type, FileType::Regular);
    }

    #[test]
    fn opendir_lists_entries_without_dot() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), b"").unwrap();
        std::fs::write(dir.path().join("b"), b"").unwrap();

        let mut names = Vec::new();
        let mut handle = RealSystem.opendir(dir.path()).unwrap();
        while let Some(name) = handle.next().unwrap() {
            names.push(name.to_string());
        }
        names.sort();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn missing_file_yields_enoent() {
        let dir = tempfile::tempdir().unwrap();
        let err = RealSystem.stat(&dir.path().join("nope")).unwrap_err();
        assert_eq!(err.0, libc::ENOENT);
    }
}
