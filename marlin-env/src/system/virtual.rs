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

//! In-memory [`System`] implementation for tests.
//!
//! The virtual file system is a single tree; relative paths and absolute
//! paths resolve from the same root, which stands in for the working
//! directory. Symlink targets are resolved from the root as well. Inode
//! numbers are allocated sequentially, so [`FileId`]s behave like the real
//! thing for symlink-loop detection.

use super::{Dir, FileId, FileType, Metadata, System, User};
use errno::Errno;
use marlin_wstr::WString;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;

const ROOT: usize = 0;
const SYMLINK_FUEL: u32 = 32;

#[derive(Debug)]
enum NodeKind {
    Regular { size: u64, executable: bool },
    Directory { entries: BTreeMap<String, usize> },
    Symlink { target: String },
    Special { file_type: FileType },
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    mtime: i64,
}

/// Mutable state behind a [`VirtualSystem`].
#[derive(Debug)]
pub struct State {
    nodes: Vec<Node>,
    /// Password database served by [`System::users`].
    pub users: Vec<User>,
    /// Result of [`System::own_home_directory`].
    pub own_home: Option<WString>,
    /// Result of [`System::getpid`].
    pub pid: i32,
}

impl Default for State {
    fn default() -> Self {
        State {
            nodes: vec![Node {
                kind: NodeKind::Directory {
                    entries: BTreeMap::new(),
                },
                mtime: 0,
            }],
            users: Vec::new(),
            own_home: None,
            pid: 2,
        }
    }
}

/// In-memory system; cloning shares the state.
#[derive(Clone, Debug, Default)]
pub struct VirtualSystem {
    pub state: Rc<RefCell<State>>,
}

impl VirtualSystem {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the directory path, including parents, and returns its inode.
    pub fn mkdir_p(&self, path: &str) -> usize {
        let mut state = self.state.borrow_mut();
        let mut current = ROOT;
        for comp in components(path) {
            current = state.child_dir(current, &comp);
        }
        current
    }

    /// Creates an empty regular file, including parent directories.
    pub fn create_file(&self, path: &str) {
        self.create_file_with(path, 0, false);
    }

    /// Creates an executable regular file, including parent directories.
    pub fn create_executable(&self, path: &str) {
        self.create_file_with(path, 0, true);
    }

    /// Creates a regular file with the given size and execute permission.
    pub fn create_file_with(&self, path: &str, size: u64, executable: bool) {
        self.add_node(path, NodeKind::Regular { size, executable });
    }

    /// Creates a symlink. `target` is resolved from the root of the tree.
    pub fn symlink(&self, path: &str, target: &str) {
        self.add_node(
            path,
            NodeKind::Symlink {
                target: target.to_owned(),
            },
        );
    }

    /// Creates a device, fifo, or socket node.
    pub fn create_special(&self, path: &str, file_type: FileType) {
        self.add_node(path, NodeKind::Special { file_type });
    }

    fn add_node(&self, path: &str, kind: NodeKind) {
        let mut comps = components(path);
        let Some(name) = comps.pop_back() else {
            return;
        };
        let mut state = self.state.borrow_mut();
        let mut parent = ROOT;
        for comp in comps {
            parent = state.child_dir(parent, &comp);
        }
        let inode = state.push_node(kind);
        if let NodeKind::Directory { entries } = &mut state.nodes[parent].kind {
            entries.insert(name, inode);
        }
    }

    fn resolve(&self, path: &Path, follow_last: bool) -> Result<usize, Errno> {
        let Some(s) = path.to_str() else {
            return Err(Errno(libc::ENOENT));
        };
        let state = self.state.borrow();
        state.resolve(s, follow_last)
    }

    fn metadata(&self, inode: usize) -> Metadata {
        let state = self.state.borrow();
        state.metadata(inode)
    }
}

fn components(path: &str) -> VecDeque<String> {
    path.split('/')
        .filter(|c| !c.is_empty() && *c != ".")
        .map(str::to_owned)
        .collect()
}

impl State {
    fn push_node(&mut self, kind: NodeKind) -> usize {
        self.nodes.push(Node { kind, mtime: 0 });
        self.nodes.len() - 1
    }

    fn child_dir(&mut self, parent: usize, name: &str) -> usize {
        if let NodeKind::Directory { entries } = &self.nodes[parent].kind {
            if let Some(&existing) = entries.get(name) {
                return existing;
            }
        }
        let inode = self.push_node(NodeKind::Directory {
            entries: BTreeMap::new(),
        });
        if let NodeKind::Directory { entries } = &mut self.nodes[parent].kind {
            entries.insert(name.to_owned(), inode);
        }
        inode
    }

    fn resolve(&self, path: &str, follow_last: bool) -> Result<usize, Errno> {
        let mut comps = components(path);
        let mut current = ROOT;
        let mut fuel = SYMLINK_FUEL;

        while let Some(comp) = comps.pop_front() {
            let NodeKind::Directory { entries } = &self.nodes[current].kind else {
                return Err(Errno(libc::ENOTDIR));
            };
            let Some(&next) = entries.get(&comp) else {
                return Err(Errno(libc::ENOENT));
            };
            if let NodeKind::Symlink { target } = &self.nodes[next].kind {
                if follow_last || !comps.is_empty() {
                    fuel = fuel.checked_sub(1).ok_or(Errno(libc::ELOOP))?;
                    let mut rewritten = components(target);
                    rewritten.append(&mut comps);
                    comps = rewritten;
                    current = ROOT;
                    continue;
                }
            }
            current = next;
        }
        Ok(current)
    }

    fn metadata(&self, inode: usize) -> Metadata {
        let node = &self.nodes[inode];
        let (file_type, size, executable) = match &node.kind {
            NodeKind::Regular { size, executable } => (FileType::Regular, *size, *executable),
            NodeKind::Directory { .. } => (FileType::Directory, 0, true),
            NodeKind::Symlink { target } => (FileType::Symlink, target.len() as u64, false),
            NodeKind::Special { file_type } => (*file_type, 0, false),
        };
        Metadata {
            file_type,
            size,
            executable,
            id: FileId {
                device: 1,
                inode: inode as u64,
                mtime_seconds: node.mtime,
                mtime_nanos: 0,
            },
        }
    }
}

#[derive(Debug)]
struct VirtualDir {
    names: std::vec::IntoIter<String>,
}

impl Dir for VirtualDir {
    fn next(&mut self) -> Result<Option<WString>, Errno> {
        Ok(self.names.next().map(|n| WString::from(n.as_str())))
    }
}

impl System for VirtualSystem {
    fn getpid(&self) -> i32 {
        self.state.borrow().pid
    }

    fn stat(&self, path: &Path) -> Result<Metadata, Errno> {
        self.resolve(path, true).map(|inode| self.metadata(inode))
    }

    fn lstat(&self, path: &Path) -> Result<Metadata, Errno> {
        self.resolve(path, false).map(|inode| self.metadata(inode))
    }

    fn is_executable(&self, path: &Path) -> bool {
        self.stat(path).is_ok_and(|m| m.executable)
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path, true).is_ok()
    }

    fn opendir(&self, path: &Path) -> Result<Box<dyn Dir>, Errno> {
        let inode = self.resolve(path, true)?;
        let state = self.state.borrow();
        let NodeKind::Directory { entries } = &state.nodes[inode].kind else {
            return Err(Errno(libc::ENOTDIR));
        };
        let names: Vec<String> = entries.keys().cloned().collect();
        Ok(Box::new(VirtualDir {
            names: names.into_iter(),
        }))
    }

    fn own_home_directory(&self) -> Option<WString> {
        self.state.borrow().own_home.clone()
    }

    fn user_home_directory(&self, name: &str) -> Option<WString> {
        let state = self.state.borrow();
        state
            .users
            .iter()
            .find(|u| u.name == name)
            .map(|u| u.home.clone())
    }

    fn users(&self) -> Vec<User> {
        self.state.borrow().users.clone()
    }
}
