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

//! Rendering of diagnostics that carry a source offset.
//!
//! The core reports errors as typed values with character offsets into the
//! command line; this module turns one of those into a printable snippet
//! message. Callers on the evaluation path print the result; the completion
//! path never renders anything.

use annotate_snippets::{AnnotationKind, Level, Renderer, Snippet};

/// Renders `title` with the source line and a caret at `char_offset`.
///
/// The offset counts characters, matching the offsets carried by the core's
/// error types. An offset at or past the end of the source annotates the end
/// of the line. The returned string ends with a newline.
#[must_use]
pub fn render_error(title: &str, source: &str, char_offset: usize, label: &str) -> String {
    let start = source
        .char_indices()
        .nth(char_offset)
        .map_or(source.len(), |(i, _)| i);
    let end = source[start..]
        .chars()
        .next()
        .map_or(start, |c| start + c.len_utf8());

    let group = Level::ERROR.primary_title(title).element(
        Snippet::source(source)
            .line_start(1)
            .annotation(AnnotationKind::Primary.span(start..end).label(label)),
    );
    format!("{}\n", Renderer::plain().render(&[group]))
}
