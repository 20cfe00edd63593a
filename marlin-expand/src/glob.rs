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

//! Wildcard expansion against the file system.
//!
//! The walker splits the pattern at each `/` and processes one segment per
//! directory level. Literal segments are appended without scanning; segments
//! containing wildcards scan the directory and match each entry; the
//! recursive wildcard additionally descends into every matching
//! subdirectory with the whole remaining pattern. A per-walk set of file
//! identities keeps symlink cycles from recursing forever, and a
//! cancellation checker is polled on every directory entry.
//!
//! In completion mode the walker produces [`Completion`] candidates instead
//! of paths: the last segment completes partially typed names (fuzzily when
//! allowed), intermediate literal segments can be fuzz-matched against
//! sibling directories, and every candidate carries a description computed
//! from `stat`.

use crate::ExpandFlags;
use errno::Errno;
use marlin_env::completion::{CompleteFlags, Completion};
use marlin_env::system::{Dir, FileId, FileType, Metadata, System};
use marlin_env::{CancelFlag, Env};
use marlin_wildcard::{MatchKind, eq_case_insensitive, fuzzy_match, wildcard_match};
use marlin_wstr::{WString, Wchar};
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;

/// Result of one wildcard walk.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WildcardResult {
    /// The wildcard matched nothing.
    NoMatch,
    /// The wildcard matched at least one file.
    Match,
    /// The walk was cancelled; partial results must be discarded.
    Cancelled,
}

/// Joins a path component onto `path` with exactly one separating slash.
fn append_path_component(path: &mut WString, component: &[Wchar]) {
    if path.is_empty() || component.is_empty() {
        path.push_wstr(component);
        return;
    }
    let path_slash = path.last() == Some(&Wchar::Char('/'));
    let comp_slash = component.first() == Some(&Wchar::Char('/'));
    if !path_slash && !comp_slash {
        path.push_char('/');
    } else if path_slash && comp_slash {
        path.pop();
    }
    path.push_wstr(component);
}

fn joined(base: &WString, component: &[Wchar]) -> WString {
    let mut out = base.clone();
    append_path_component(&mut out, component);
    out
}

/// Formats a byte count the way the completion pager shows file sizes.
pub(crate) fn format_size(size: u64) -> String {
    if size == 0 {
        return "empty".to_owned();
    }
    if size < 1024 {
        return format!("{size}B");
    }
    let mut remaining = size;
    for unit in ["kB", "MB", "GB", "TB", "PB", "EB"] {
        if remaining < 1024 * 1024 {
            let whole = remaining / 1024;
            if whole < 10 {
                let tenths = (remaining * 10 / 1024) % 10;
                return format!("{whole}.{tenths}{unit}");
            }
            return format!("{whole}{unit}");
        }
        remaining /= 1024;
    }
    format!("{remaining}EB")
}

/// Description for a file, from the outcome of `lstat` and `stat`.
fn file_description(
    system: &dyn System,
    path: &PathBuf,
    lstat: &Result<Metadata, Errno>,
    stat: &Result<Metadata, Errno>,
) -> &'static str {
    let Ok(lstat) = lstat else {
        return "File";
    };

    if lstat.file_type == FileType::Symlink {
        return match stat {
            Ok(target) => {
                if target.is_dir() {
                    "Symbolic link to directory"
                } else if target.executable && system.is_executable(path) {
                    "Executable link"
                } else {
                    "Symbolic link"
                }
            }
            Err(Errno(libc::ENOENT)) => "Rotten symbolic link",
            Err(Errno(libc::ELOOP)) => "Symbolic link loop",
            Err(_) => "File",
        };
    }

    match lstat.file_type {
        FileType::CharDevice => "Character device",
        FileType::BlockDevice => "Block device",
        FileType::Fifo => "Fifo",
        FileType::Socket => "Socket",
        FileType::Directory => "Directory",
        _ => {
            if lstat.executable && system.is_executable(path) {
                "Executable"
            } else {
                "File"
            }
        }
    }
}

struct CompletePack<'a> {
    orig: &'a WString,
    desc: &'a str,
    expand_flags: ExpandFlags,
}

fn has_prefix_match(out: &Option<&mut Vec<Completion>>, first: usize) -> bool {
    out.as_ref()
        .is_some_and(|v| v[first..].iter().any(|c| c.rank.kind <= MatchKind::Prefix))
}

/// Matches `candidate` against the wildcard and, if the wildcard could
/// complete it, pushes the remainder as a candidate.
///
/// The recursive wildcard is ignored here; `**` cannot be tab-completed.
/// Pass `None` for `out` to use this as a pure match test.
pub fn wildcard_complete(
    candidate: &WString,
    wc: &[Wchar],
    description: &str,
    out: Option<&mut Vec<Completion>>,
    expand_flags: ExpandFlags,
    flags: CompleteFlags,
) -> bool {
    let pack = CompletePack {
        orig: candidate,
        desc: description,
        expand_flags,
    };
    complete_internal(candidate, wc, &pack, flags, out, true)
}

fn complete_internal(
    text: &[Wchar],
    wc: &[Wchar],
    pack: &CompletePack<'_>,
    flags: CompleteFlags,
    mut out: Option<&mut Vec<Completion>>,
    is_first_call: bool,
) -> bool {
    // Hidden files complete only against an explicit leading dot.
    if is_first_call
        && text.first() == Some(&Wchar::Char('.'))
        && wc.first() != Some(&Wchar::Char('.'))
    {
        return false;
    }

    let Some(next_wc_pos) = wc.iter().position(|a| a.is_wildcard()) else {
        // No wildcards left; rank what remains.
        let rank = fuzzy_match(wc, text);
        let acceptable = if pack.expand_flags.contains(ExpandFlags::FUZZY_MATCH) {
            rank.is_match()
        } else {
            rank.kind.shares_prefix()
        };
        if acceptable {
            if let Some(out) = out {
                let full_replacement = rank.kind.requires_full_replacement()
                    || flags.contains(CompleteFlags::REPLACES_TOKEN);
                let completion = if full_replacement {
                    pack.orig.clone()
                } else {
                    WString::from(&text[wc.len()..])
                };
                let mut flags = flags;
                if full_replacement {
                    flags.insert(CompleteFlags::REPLACES_TOKEN);
                }
                out.push(Completion::with_details(completion, pack.desc, flags, rank));
            }
        }
        return acceptable;
    };

    if next_wc_pos > 0 {
        // Literal prefix before the wildcard: case comparison only, no fuzz.
        if text.len() < next_wc_pos {
            return false;
        }
        if text[..next_wc_pos] == wc[..next_wc_pos] {
            return complete_internal(&text[next_wc_pos..], &wc[next_wc_pos..], pack, flags, out, false);
        }
        if eq_case_insensitive(&text[..next_wc_pos], &wc[..next_wc_pos]) {
            return complete_internal(
                &text[next_wc_pos..],
                &wc[next_wc_pos..],
                pack,
                flags | CompleteFlags::REPLACES_TOKEN,
                out,
                false,
            );
        }
        return false;
    }

    match wc[0] {
        Wchar::AnyChar => {
            if text.is_empty() {
                false
            } else {
                complete_internal(&text[1..], &wc[1..], pack, flags, out, false)
            }
        }
        Wchar::AnyString => {
            // A trailing star completes with the empty string.
            if wc.len() == 1 {
                return complete_internal(&[], &[], pack, flags, out, false);
            }
            let mut has_match = false;
            for i in 0..text.len() {
                let before = out.as_ref().map_or(0, |v| v.len());
                if complete_internal(
                    &text[i..],
                    &wc[1..],
                    pack,
                    flags,
                    out.as_mut().map(|v| &mut **v),
                    false,
                ) {
                    has_match = true;
                    // Stop at the first prefix-quality match; later splits
                    // only produce weaker candidates.
                    if out.is_none() || has_prefix_match(&out, before) {
                        break;
                    }
                }
            }
            has_match
        }
        Wchar::AnyStringRecursive => false,
        _ => false,
    }
}

/// Checks the file-type filters, computes a description, and completes the
/// filename against the wildcard.
fn test_flags_then_complete(
    system: &dyn System,
    abs_path: &WString,
    filename: &WString,
    wc: &[Wchar],
    expand_flags: ExpandFlags,
    out: &mut Vec<Completion>,
) -> bool {
    // Cheap match test before any stat.
    if !wildcard_complete(filename, wc, "", None, expand_flags, CompleteFlags::empty()) {
        return false;
    }

    let path = abs_path.to_path();
    let lstat = system.lstat(&path);
    let stat = match &lstat {
        Ok(meta) if meta.file_type == FileType::Symlink => system.stat(&path),
        other => other.clone(),
    };

    let size = stat.as_ref().map_or(0, |m| m.size);
    let is_directory = stat.as_ref().is_ok_and(Metadata::is_dir);
    let is_regular = stat.as_ref().is_ok_and(Metadata::is_regular);

    if expand_flags.contains(ExpandFlags::DIRECTORIES_ONLY) && !is_directory {
        return false;
    }
    if expand_flags.contains(ExpandFlags::EXECUTABLES_ONLY)
        && (!is_regular || !system.is_executable(&path))
    {
        return false;
    }

    let mut description = String::new();
    if !expand_flags.contains(ExpandFlags::NO_DESCRIPTIONS) {
        description = file_description(system, &path, &lstat, &stat).to_owned();
        if is_regular {
            description.push_str(", ");
            description.push_str(&format_size(size));
        }
    }

    if is_directory {
        let mut with_slash = filename.clone();
        with_slash.push_char('/');
        wildcard_complete(
            &with_slash,
            wc,
            &description,
            Some(out),
            expand_flags,
            CompleteFlags::NO_SPACE,
        )
    } else {
        wildcard_complete(
            filename,
            wc,
            &description,
            Some(out),
            expand_flags,
            CompleteFlags::empty(),
        )
    }
}

struct WildcardExpander<'e> {
    system: &'e dyn System,
    cancel: &'e CancelFlag,
    /// Prepended for file system operations, never part of the results.
    prefix: WString,
    /// The part of the input consumed before the wildcard, part of every
    /// replacing completion.
    original_base: WString,
    original_wildcard: WString,
    flags: ExpandFlags,
    /// Result paths already emitted, to avoid duplicates in evaluation mode.
    emitted: BTreeSet<WString>,
    /// Directories currently on the descent path, to break symlink cycles.
    visited: HashSet<FileId>,
    resolved: &'e mut Vec<Completion>,
    did_interrupt: bool,
    did_add: bool,
}

impl WildcardExpander<'_> {
    fn interrupted(&mut self) -> bool {
        if !self.did_interrupt {
            self.did_interrupt = self.cancel.is_cancelled();
        }
        self.did_interrupt
    }

    fn dir_path(&self, base_dir: &WString) -> PathBuf {
        let path = joined(&self.prefix, base_dir);
        if path.is_empty() {
            PathBuf::from(".")
        } else {
            path.to_path()
        }
    }

    fn stat_rel(&self, rel: &WString) -> Result<Metadata, Errno> {
        self.system.stat(&self.dir_path(rel))
    }

    fn open_dir(&self, base_dir: &WString) -> Option<Box<dyn Dir>> {
        self.system.opendir(&self.dir_path(base_dir)).ok()
    }

    fn add_expansion_result(&mut self, result: WString) {
        if self.emitted.insert(result.clone()) {
            self.resolved.push(Completion::new(result));
            self.did_add = true;
        }
    }

    fn try_add_completion_result(
        &mut self,
        filepath: &WString,
        filename: &WString,
        wc: &[Wchar],
        wc_offset: usize,
    ) {
        let abs_path = joined(&self.prefix, filepath);
        let before = self.resolved.len();
        if test_flags_then_complete(
            self.system,
            &abs_path,
            filename,
            wc,
            self.flags,
            self.resolved,
        ) {
            // The completion was produced from the last component only;
            // replacing candidates need the consumed wildcard components and
            // the base put back in front.
            let wc_base = self.original_wildcard.substring(0..wc_offset);
            let after = self.resolved.len();
            for completion in &mut self.resolved[before..after] {
                completion.prepend_token_prefix(&wc_base);
                completion.prepend_token_prefix(&self.original_base);
            }

            if self.flags.contains(ExpandFlags::SPECIAL_FOR_CD) {
                let unique = self.descend_unique_hierarchy(&abs_path);
                if !unique.is_empty() {
                    for completion in &mut self.resolved[before..after] {
                        completion.completion.push_wstr(&unique);
                    }
                }
            }
            self.did_add = true;
        }
    }

    /// For a directory containing exactly one non-hidden entry which is
    /// itself a directory, returns that chain (relative, trailing slash).
    fn descend_unique_hierarchy(&mut self, start: &WString) -> WString {
        let mut unique_hierarchy = WString::new();
        let mut abs = start.clone();

        loop {
            let Ok(mut dir) = self.system.opendir(&abs.to_path()) else {
                break;
            };
            let mut unique: Option<WString> = None;
            let mut stop = false;
            while let Ok(Some(child)) = dir.next() {
                if child.first() == Some(&Wchar::Char('.')) {
                    continue;
                }
                let child_path = joined(&abs, &child);
                let child_is_dir = self
                    .system
                    .stat(&child_path.to_path())
                    .is_ok_and(|m| m.is_dir());
                if child_is_dir && unique.is_none() {
                    unique = Some(child);
                } else {
                    stop = true;
                    break;
                }
            }
            let Some(entry) = unique else { break };
            if stop {
                break;
            }
            append_path_component(&mut unique_hierarchy, &entry);
            unique_hierarchy.push_char('/');
            append_path_component(&mut abs, &entry);
            abs.push_char('/');
        }
        unique_hierarchy
    }

    /// Trailing slash: the pattern named a directory.
    fn expand_trailing_slash(&mut self, base_dir: &WString) {
        if self.interrupted() {
            return;
        }

        if !self.flags.contains(ExpandFlags::FOR_COMPLETIONS) {
            // `echo /tmp/`: insert the path if it exists.
            if self.system.exists(&self.dir_path(base_dir)) {
                self.add_expansion_result(base_dir.clone());
            }
            return;
        }

        // `echo /tmp/<tab>`: everything non-hidden is a candidate.
        let empty_offset = self.original_wildcard.len();
        if let Some(mut dir) = self.open_dir(base_dir) {
            while let Ok(Some(name)) = dir.next() {
                if self.interrupted() {
                    break;
                }
                if name.first() == Some(&Wchar::Char('.')) {
                    continue;
                }
                let filepath = joined(base_dir, &name);
                self.try_add_completion_result(&filepath, &name, &[], empty_offset);
            }
        }
    }

    /// Segment with wildcards, more segments after: descend into matching
    /// subdirectories.
    fn expand_intermediate_segment(
        &mut self,
        base_dir: &WString,
        dir: &mut dyn Dir,
        segment: &[Wchar],
        rest_offset: usize,
    ) {
        while !self.interrupted() {
            let Ok(Some(name)) = dir.next() else { break };
            // The leading-dot rule also keeps us out of hidden directories.
            if !wildcard_match(&name, segment) {
                continue;
            }

            let mut full_path = joined(base_dir, &name);
            let Ok(meta) = self.stat_rel(&full_path) else {
                continue;
            };
            if !meta.is_dir() {
                continue;
            }
            if !self.visited.insert(meta.id) {
                // Already on the descent path: symlink loop.
                continue;
            }

            full_path.push_char('/');
            self.expand(&full_path, rest_offset);

            // Only directories beneath us count as visited; siblings sharing
            // an ancestor must not be blocked.
            self.visited.remove(&meta.id);
        }
    }

    /// Literal intermediate segment that matched nothing: try sibling
    /// directories with fuzzy matching and rewrite the results.
    fn expand_literal_intermediate_segment_with_fuzz(
        &mut self,
        base_dir: &WString,
        dir: &mut dyn Dir,
        seg_offset: usize,
        seg_len: usize,
        rest_offset: usize,
    ) {
        let segment = self
            .original_wildcard
            .substring(seg_offset..seg_offset + seg_len);

        while !self.interrupted() {
            let Ok(Some(name)) = dir.next() else { break };
            let rank = fuzzy_match(&segment, &name);
            // The exact case was already handled by the literal descent.
            if !rank.is_match() || rank.kind == MatchKind::Exact {
                continue;
            }

            let mut full_path = joined(base_dir, &name);
            let Ok(meta) = self.stat_rel(&full_path) else {
                continue;
            };
            if !meta.is_dir() {
                continue;
            }
            full_path.push_char('/');

            let before = self.resolved.len();
            self.expand(&full_path, rest_offset);
            let after = self.resolved.len();

            // Each new result was computed against the literal segment; make
            // it a replacing completion and swap our segment for the
            // directory that actually matched.
            for completion in &mut self.resolved[before..after] {
                if !completion.flags.contains(CompleteFlags::REPLACES_TOKEN) {
                    completion.flags.insert(CompleteFlags::REPLACES_TOKEN);
                    completion.prepend_token_prefix(&self.original_wildcard);
                    completion.prepend_token_prefix(&self.original_base);
                }
                let seg_start = self.original_base.len() + seg_offset;
                let seg_end = seg_start + seg_len;
                if completion.completion.len() >= seg_end
                    && completion.completion[seg_start..seg_end] == segment[..]
                {
                    let mut rewritten = completion.completion.substring(0..seg_start);
                    rewritten.push_wstr(&name);
                    rewritten.extend(completion.completion[seg_end..].iter().copied());
                    completion.completion = rewritten;
                }
                if rank > completion.rank {
                    completion.rank = rank;
                }
            }
        }
    }

    /// Last segment: match or complete every entry.
    fn expand_last_segment(
        &mut self,
        base_dir: &WString,
        dir: &mut dyn Dir,
        segment: &[Wchar],
        seg_offset: usize,
    ) {
        let filter_types = self
            .flags
            .intersects(ExpandFlags::EXECUTABLES_ONLY | ExpandFlags::DIRECTORIES_ONLY);

        while !self.interrupted() {
            let Ok(Some(name)) = dir.next() else { break };
            if self.flags.contains(ExpandFlags::FOR_COMPLETIONS) {
                let filepath = joined(base_dir, &name);
                self.try_add_completion_result(&filepath, &name, segment, seg_offset);
            } else if wildcard_match(&name, segment) {
                let result = joined(base_dir, &name);
                if filter_types && !self.passes_type_filter(&result) {
                    continue;
                }
                self.add_expansion_result(result);
            }
        }
    }

    fn passes_type_filter(&self, rel: &WString) -> bool {
        let Ok(meta) = self.stat_rel(rel) else {
            return false;
        };
        if self.flags.contains(ExpandFlags::DIRECTORIES_ONLY) && !meta.is_dir() {
            return false;
        }
        if self.flags.contains(ExpandFlags::EXECUTABLES_ONLY)
            && (!meta.is_regular() || !self.system.is_executable(&self.dir_path(rel)))
        {
            return false;
        }
        true
    }

    /// Expands the wildcard suffix starting at `wc_offset` against
    /// `base_dir`. Recursive.
    fn expand(&mut self, base_dir: &WString, wc_offset: usize) {
        if self.interrupted() {
            return;
        }

        let wc = self
            .original_wildcard
            .substring(wc_offset..self.original_wildcard.len());
        let next_slash = wc.find(Wchar::Char('/'));
        let seg_len = next_slash.unwrap_or(wc.len());
        let segment = wc.substring(0..seg_len);
        let segment_has_wildcards = segment.has_wildcard();
        let is_last_segment = next_slash.is_none();

        if segment.is_empty() {
            if is_last_segment {
                self.expand_trailing_slash(base_dir);
            } else {
                // Adjacent slashes; skip.
                self.expand(base_dir, wc_offset + seg_len + 1);
            }
            return;
        }

        if !segment_has_wildcards && !is_last_segment {
            // Literal intermediate segment: append and descend, no scan.
            let mut rest_offset = wc_offset + seg_len + 1;
            while self.original_wildcard.get(rest_offset) == Some(&Wchar::Char('/')) {
                rest_offset += 1;
            }

            let mut new_base = joined(base_dir, &segment);
            new_base.push_char('/');
            let before = self.resolved.len();
            self.expand(&new_base, rest_offset);

            let allow_fuzz = self.flags.contains(ExpandFlags::FUZZY_MATCH)
                && !self.flags.contains(ExpandFlags::NO_FUZZY_DIRECTORIES)
                && self.flags.contains(ExpandFlags::FOR_COMPLETIONS);
            if allow_fuzz && self.resolved.len() == before {
                if let Some(mut dir) = self.open_dir(base_dir) {
                    self.expand_literal_intermediate_segment_with_fuzz(
                        base_dir,
                        dir.as_mut(),
                        wc_offset,
                        seg_len,
                        rest_offset,
                    );
                }
            }
            return;
        }

        let Some(mut dir) = self.open_dir(base_dir) else {
            return;
        };

        if is_last_segment {
            self.expand_last_segment(base_dir, dir.as_mut(), &segment, wc_offset);
        } else {
            let mut rest_offset = wc_offset + seg_len + 1;
            while self.original_wildcard.get(rest_offset) == Some(&Wchar::Char('/')) {
                rest_offset += 1;
            }
            self.expand_intermediate_segment(base_dir, dir.as_mut(), &segment, rest_offset);
        }
        drop(dir);

        // The recursive wildcard matches this directory with the pattern up
        // to and including `**`, and every subdirectory with the whole
        // remaining pattern.
        if let Some(asr_idx) = segment.iter().position(|&a| a == Wchar::AnyStringRecursive) {
            let head_any = segment.substring(0..asr_idx + 1);
            let any_tail_offset = wc_offset + asr_idx;
            if let Some(mut dir) = self.open_dir(base_dir) {
                self.expand_intermediate_segment(
                    base_dir,
                    dir.as_mut(),
                    &head_any,
                    any_tail_offset,
                );
            }
        }
    }
}

/// Expands `wc` against the file system.
///
/// `working_directory` is prepended for file access but never appears in the
/// results; an absolute pattern ignores it. Matching paths (or, in
/// completion mode, candidates) are appended to `output`.
pub fn wildcard_expand_string(
    env: &Env,
    wc: &WString,
    working_directory: &WString,
    flags: ExpandFlags,
    output: &mut Vec<Completion>,
) -> WildcardResult {
    // A file name never contains NUL, so such a pattern cannot match.
    if wc.iter().any(|a| a.is_char('\0')) {
        return WildcardResult::NoMatch;
    }

    let (prefix, base_dir, effective_wc) = if wc.first() == Some(&Wchar::Char('/')) {
        (
            WString::new(),
            WString::from("/"),
            wc.substring(1..wc.len()),
        )
    } else {
        (working_directory.clone(), WString::new(), wc.clone())
    };

    let emitted = output.iter().map(|c| c.completion.clone()).collect();
    let mut expander = WildcardExpander {
        system: &*env.system,
        cancel: &env.cancel,
        prefix,
        original_base: base_dir.clone(),
        original_wildcard: effective_wc,
        flags,
        emitted,
        visited: HashSet::new(),
        resolved: output,
        did_interrupt: false,
        did_add: false,
    };
    expander.expand(&base_dir, 0);

    if expander.did_interrupt {
        WildcardResult::Cancelled
    } else if expander.did_add {
        WildcardResult::Match
    } else {
        WildcardResult::NoMatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marlin_env::VirtualSystem;
    use marlin_escape::{UnescapeFlags, unescape};
    use std::cell::Cell;
    use std::rc::Rc;

    fn pattern(surface: &str) -> WString {
        unescape(surface, UnescapeFlags::SPECIAL).expect("test pattern must unescape")
    }

    fn sample_env() -> Env {
        let system = VirtualSystem::new();
        system.create_file("a.txt");
        system.create_file("b.txt");
        system.create_file(".hidden");
        system.create_file("d/c.txt");
        Env::with_system(Box::new(system))
    }

    fn expand_paths(env: &Env, wc: &str) -> (WildcardResult, Vec<String>) {
        let mut out = Vec::new();
        let result = wildcard_expand_string(
            env,
            &pattern(wc),
            &WString::new(),
            ExpandFlags::empty(),
            &mut out,
        );
        let mut paths: Vec<String> = out.iter().map(|c| c.completion.to_string()).collect();
        paths.sort();
        (result, paths)
    }

    #[test]
    fn star_matches_visible_files() {
        let env = sample_env();
        let (result, paths) = expand_paths(&env, "*.txt");
        assert_eq!(result, WildcardResult::Match);
        assert_eq!(paths, ["a.txt", "b.txt"]);
    }

    #[test]
    fn star_skips_hidden_files() {
        let env = sample_env();
        let (_, paths) = expand_paths(&env, "*");
        assert_eq!(paths, ["a.txt", "b.txt", "d"]);
    }

    #[test]
    fn no_match_is_reported() {
        let env = sample_env();
        let (result, paths) = expand_paths(&env, "*.rs");
        assert_eq!(result, WildcardResult::NoMatch);
        assert!(paths.is_empty());
    }

    #[test]
    fn question_mark_matches_single_characters() {
        let env = sample_env();
        let (_, paths) = expand_paths(&env, "?.txt");
        assert_eq!(paths, ["a.txt", "b.txt"]);
    }

    #[test]
    fn wildcard_descends_directories() {
        let env = sample_env();
        let (_, paths) = expand_paths(&env, "*/*.txt");
        assert_eq!(paths, ["d/c.txt"]);
    }

    #[test]
    fn recursive_wildcard_matches_everything() {
        let env = sample_env();
        let (_, paths) = expand_paths(&env, "**");
        assert_eq!(paths, ["a.txt", "b.txt", "d", "d/c.txt"]);
    }

    #[test]
    fn recursive_wildcard_with_suffix() {
        let env = sample_env();
        let (_, paths) = expand_paths(&env, "**.txt");
        assert_eq!(paths, ["a.txt", "b.txt", "d/c.txt"]);
    }

    #[test]
    fn trailing_slash_requires_existence() {
        let env = sample_env();
        let (_, paths) = expand_paths(&env, "d/");
        assert_eq!(paths, ["d/"]);
        let (result, _) = expand_paths(&env, "nope/");
        assert_eq!(result, WildcardResult::NoMatch);
    }

    #[test]
    fn absolute_patterns_ignore_the_working_directory() {
        let env = sample_env();
        let (_, paths) = expand_paths(&env, "/*.txt");
        assert_eq!(paths, ["/a.txt", "/b.txt"]);
    }

    #[test]
    fn symlink_loops_are_visited_once() {
        let system = VirtualSystem::new();
        system.create_file("d/f.txt");
        system.symlink("d/loop", "/d");
        let env = Env::with_system(Box::new(system));

        let (result, paths) = expand_paths(&env, "**");
        assert_eq!(result, WildcardResult::Match);
        // The cycle is entered at most once per descent path, so the walk
        // terminates: `d` reappears under the loop entry but is not
        // descended a second time.
        assert_eq!(paths, ["d", "d/f.txt", "d/loop", "d/loop/d"]);
    }

    #[test]
    fn sibling_symlinks_are_not_blocked() {
        let system = VirtualSystem::new();
        system.create_file("target/f");
        system.symlink("x/a", "/target");
        system.symlink("y/b", "/target");
        let env = Env::with_system(Box::new(system));

        let (_, paths) = expand_paths(&env, "*/*/f");
        assert_eq!(paths, ["x/a/f", "y/b/f"]);
    }

    #[test]
    fn cancellation_stops_the_walk() {
        let system = VirtualSystem::new();
        for i in 0..10 {
            system.create_file(&format!("f{i}"));
        }
        let mut env = Env::with_system(Box::new(system));
        let cancelled = Rc::new(Cell::new(false));
        let watch = Rc::clone(&cancelled);
        env.cancel = CancelFlag::new(move || watch.get());
        cancelled.set(true);

        let mut out = Vec::new();
        let result = wildcard_expand_string(
            &env,
            &pattern("*"),
            &WString::new(),
            ExpandFlags::empty(),
            &mut out,
        );
        assert_eq!(result, WildcardResult::Cancelled);
        assert!(out.is_empty());
    }

    #[test]
    fn executables_only_filters_evaluation_results() {
        let system = VirtualSystem::new();
        system.create_executable("prog");
        system.create_file("data");
        let env = Env::with_system(Box::new(system));

        let mut out = Vec::new();
        wildcard_expand_string(
            &env,
            &pattern("*"),
            &WString::new(),
            ExpandFlags::EXECUTABLES_ONLY,
            &mut out,
        );
        let paths: Vec<String> = out.iter().map(|c| c.completion.to_string()).collect();
        assert_eq!(paths, ["prog"]);
    }

    #[test]
    fn completion_mode_extends_the_typed_prefix() {
        let env = sample_env();
        let mut out = Vec::new();
        wildcard_expand_string(
            &env,
            &pattern("a."),
            &WString::new(),
            ExpandFlags::FOR_COMPLETIONS,
            &mut out,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].completion, "txt");
        assert!(!out[0].flags.contains(CompleteFlags::REPLACES_TOKEN));
        assert!(out[0].description.starts_with("File"));
    }

    #[test]
    fn completion_of_directories_appends_slash_and_no_space() {
        let env = sample_env();
        let mut out = Vec::new();
        wildcard_expand_string(
            &env,
            &pattern("d"),
            &WString::new(),
            ExpandFlags::FOR_COMPLETIONS,
            &mut out,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].completion, "/");
        assert!(out[0].flags.contains(CompleteFlags::NO_SPACE));
        assert_eq!(out[0].description, "Directory");
    }

    #[test]
    fn completion_with_wildcard_reports_suffixes() {
        let env = sample_env();
        let mut out = Vec::new();
        wildcard_expand_string(
            &env,
            &pattern("*.t"),
            &WString::new(),
            ExpandFlags::FOR_COMPLETIONS,
            &mut out,
        );
        let mut texts: Vec<String> = out.iter().map(|c| c.completion.to_string()).collect();
        texts.sort();
        assert_eq!(texts, ["xt", "xt"]);
    }

    #[test]
    fn case_insensitive_completion_replaces_the_token() {
        let env = sample_env();
        let mut out = Vec::new();
        wildcard_expand_string(
            &env,
            &pattern("A."),
            &WString::new(),
            ExpandFlags::FOR_COMPLETIONS | ExpandFlags::FUZZY_MATCH,
            &mut out,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].completion, "a.txt");
        assert!(out[0].flags.contains(CompleteFlags::REPLACES_TOKEN));
    }

    #[test]
    fn fuzzy_intermediate_directory_rewrites_results() {
        let system = VirtualSystem::new();
        system.create_file("build/out.log");
        let env = Env::with_system(Box::new(system));

        let mut out = Vec::new();
        wildcard_expand_string(
            &env,
            &pattern("bud/out"),
            &WString::new(),
            ExpandFlags::FOR_COMPLETIONS | ExpandFlags::FUZZY_MATCH,
            &mut out,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].completion, "build/out.log");
        assert!(out[0].flags.contains(CompleteFlags::REPLACES_TOKEN));
        assert!(out[0].rank.kind > MatchKind::Prefix);
    }

    #[test]
    fn trailing_slash_completion_lists_directory_contents() {
        let env = sample_env();
        let mut out = Vec::new();
        wildcard_expand_string(
            &env,
            &pattern("d/"),
            &WString::new(),
            ExpandFlags::FOR_COMPLETIONS,
            &mut out,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].completion, "c.txt");
    }

    #[test]
    fn executable_files_get_an_executable_description() {
        let system = VirtualSystem::new();
        system.create_file_with("prog", 2048, true);
        let env = Env::with_system(Box::new(system));

        let mut out = Vec::new();
        wildcard_expand_string(
            &env,
            &pattern("pro"),
            &WString::new(),
            ExpandFlags::FOR_COMPLETIONS,
            &mut out,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].description, "Executable, 2.0kB");
    }

    #[test]
    fn symlink_descriptions_follow_the_target() {
        let system = VirtualSystem::new();
        system.mkdir_p("real");
        system.symlink("to_dir", "/real");
        system.symlink("rotten", "/missing");
        let env = Env::with_system(Box::new(system));

        let mut out = Vec::new();
        wildcard_expand_string(
            &env,
            &pattern("to_"),
            &WString::new(),
            ExpandFlags::FOR_COMPLETIONS,
            &mut out,
        );
        assert_eq!(out[0].description, "Symbolic link to directory");

        let mut out = Vec::new();
        wildcard_expand_string(
            &env,
            &pattern("rot"),
            &WString::new(),
            ExpandFlags::FOR_COMPLETIONS,
            &mut out,
        );
        assert_eq!(out[0].description, "Rotten symbolic link");
    }

    #[test]
    fn format_size_humanizes() {
        assert_eq!(format_size(0), "empty");
        assert_eq!(format_size(500), "500B");
        assert_eq!(format_size(1536), "1.5kB");
        assert_eq!(format_size(1024 * 1024), "1.0MB");
        assert_eq!(format_size(20 * 1024), "20kB");
    }
}
