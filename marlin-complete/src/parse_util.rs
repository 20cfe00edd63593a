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

//! Command-line measurement helpers for the completion resolver.
//!
//! The resolver needs just enough token structure to classify the cursor
//! position: the stream of job-separated tokens, the extent of the token
//! under the cursor, and the bounds of the innermost command substitution
//! containing the cursor. The full shell grammar lives in the parser; this
//! tokenizer accepts unfinished input, which is the normal case while the
//! user is still typing.

/// Kind of one token.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenKind {
    /// An ordinary word.
    String,
    /// `|`
    Pipe,
    /// `;` or a newline.
    End,
    /// `&`
    Background,
    /// Unparseable input from here on.
    Error,
}

/// One token, as a range of character offsets.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
    pub length: usize,
}

impl Token {
    #[must_use]
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// Splits `chars` into tokens, tolerating unterminated quotes and escapes.
#[must_use]
pub fn tokenize(chars: &[char]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            ' ' | '\t' => i += 1,
            '\n' | ';' => {
                tokens.push(Token {
                    kind: TokenKind::End,
                    offset: i,
                    length: 1,
                });
                i += 1;
            }
            '|' => {
                tokens.push(Token {
                    kind: TokenKind::Pipe,
                    offset: i,
                    length: 1,
                });
                i += 1;
            }
            '&' => {
                tokens.push(Token {
                    kind: TokenKind::Background,
                    offset: i,
                    length: 1,
                });
                i += 1;
            }
            '#' => {
                // Comment: the rest of the line is not tokens.
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            _ => {
                let start = i;
                i = consume_word(chars, i);
                tokens.push(Token {
                    kind: TokenKind::String,
                    offset: start,
                    length: i - start,
                });
            }
        }
    }
    tokens
}

fn consume_word(chars: &[char], mut i: usize) -> usize {
    let mut paren_depth = 0u32;
    while i < chars.len() {
        match chars[i] {
            '\\' => i = (i + 2).min(chars.len()),
            '\'' | '"' => {
                let quote = chars[i];
                i += 1;
                while i < chars.len() {
                    match chars[i] {
                        '\\' => i = (i + 2).min(chars.len()),
                        c if c == quote => {
                            i += 1;
                            break;
                        }
                        _ => i += 1,
                    }
                }
            }
            '(' => {
                paren_depth += 1;
                i += 1;
            }
            ')' => {
                paren_depth = paren_depth.saturating_sub(1);
                i += 1;
            }
            ' ' | '\t' | '\n' | ';' | '|' | '&' if paren_depth == 0 => break,
            _ => i += 1,
        }
    }
    i
}

/// First string token of `source`, as text.
#[must_use]
pub fn tok_first(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    tokenize(&chars)
        .iter()
        .find(|t| t.kind == TokenKind::String)
        .map(|t| chars[t.offset..t.end()].iter().collect())
        .unwrap_or_default()
}

/// Bounds of the innermost command substitution containing `cursor`, or the
/// whole string when the cursor is outside every substitution. The returned
/// range excludes the parens themselves.
#[must_use]
pub fn cmdsubst_extent(chars: &[char], cursor: usize) -> std::ops::Range<usize> {
    let mut best = 0..chars.len();
    let mut pos = 0;

    while let Some((open, close)) = locate_cmdsubst(chars, pos) {
        let end = close.unwrap_or(chars.len());
        if open < cursor && end >= cursor {
            // This substitution surrounds the cursor; a tighter fit.
            best = open + 1..end;
            pos = open + 1;
        } else if end < cursor {
            pos = end + 1;
        } else {
            break;
        }
    }
    best
}

/// Finds the next unquoted `(` at or after `start` and its matching `)`, if
/// terminated.
fn locate_cmdsubst(chars: &[char], start: usize) -> Option<(usize, Option<usize>)> {
    let mut i = start;
    let mut open = None;
    let mut depth = 0u32;

    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '\'' | '"' => {
                let quote = chars[i];
                i += 1;
                while i < chars.len() && chars[i] != quote {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            '(' => {
                if open.is_none() {
                    open = Some(i);
                }
                depth += 1;
            }
            ')' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        return Some((open.unwrap_or(i), Some(i)));
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    open.map(|o| (o, None))
}

/// Extent of the token under the cursor and of the token before it, within
/// `range` of the command line.
#[must_use]
pub fn token_extent(
    chars: &[char],
    cursor: usize,
    range: std::ops::Range<usize>,
) -> (std::ops::Range<usize>, std::ops::Range<usize>) {
    let slice: Vec<char> = chars[range.clone()].to_vec();
    let rel_cursor = cursor.saturating_sub(range.start);
    let tokens = tokenize(&slice);

    let mut current = rel_cursor..rel_cursor;
    let mut previous = 0..0;

    for token in tokens.iter().filter(|t| t.kind == TokenKind::String) {
        if token.offset <= rel_cursor && rel_cursor <= token.end() {
            current = token.offset..token.end();
            break;
        }
        if token.end() < rel_cursor {
            previous = token.offset..token.end();
        }
    }

    (
        current.start + range.start..current.end + range.start,
        previous.start + range.start..previous.end + range.start,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn kinds(s: &str) -> Vec<TokenKind> {
        tokenize(&chars(s)).iter().map(|t| t.kind).collect()
    }

    #[test]
    fn words_and_separators() {
        assert_eq!(
            kinds("ls -l | grep x; sleep &"),
            [
                TokenKind::String,
                TokenKind::String,
                TokenKind::Pipe,
                TokenKind::String,
                TokenKind::String,
                TokenKind::End,
                TokenKind::String,
                TokenKind::Background,
            ]
        );
    }

    #[test]
    fn quotes_keep_words_together() {
        let c = chars("echo 'a b' \"c d\"");
        let tokens = tokenize(&c);
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].offset, 5);
        assert_eq!(tokens[1].length, 5);
    }

    #[test]
    fn unterminated_quote_reaches_the_end() {
        let c = chars("echo 'a b");
        let tokens = tokenize(&c);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].end(), c.len());
    }

    #[test]
    fn parens_protect_separators() {
        let c = chars("echo (ls | wc)");
        let tokens = tokenize(&c);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].offset, 5);
        assert_eq!(tokens[1].end(), c.len());
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(kinds("ls # a comment"), [TokenKind::String]);
    }

    #[test]
    fn tok_first_returns_the_command() {
        assert_eq!(tok_first("git commit -m x"), "git");
        assert_eq!(tok_first("   "), "");
    }

    #[test]
    fn cmdsubst_extent_without_parens_is_everything() {
        let c = chars("echo hello");
        assert_eq!(cmdsubst_extent(&c, 6), 0..c.len());
    }

    #[test]
    fn cmdsubst_extent_narrows_to_the_innermost() {
        let c = chars("echo (git (diff x) y) z");
        //             0123456789...
        let inner_x = c.iter().position(|&c| c == 'x').unwrap();
        let extent = cmdsubst_extent(&c, inner_x);
        let text: String = c[extent].iter().collect();
        assert_eq!(text, "diff x");

        let y = c.iter().position(|&c| c == 'y').unwrap();
        let extent = cmdsubst_extent(&c, y);
        let text: String = c[extent].iter().collect();
        assert_eq!(text, "git (diff x) y");
    }

    #[test]
    fn unterminated_cmdsubst_extends_to_the_end() {
        let c = chars("echo (git ch");
        let extent = cmdsubst_extent(&c, c.len());
        let text: String = c[extent].iter().collect();
        assert_eq!(text, "git ch");
    }

    #[test]
    fn token_extent_finds_current_and_previous() {
        let c = chars("git commit -m");
        let (current, previous) = token_extent(&c, c.len(), 0..c.len());
        assert_eq!(current, 11..13);
        assert_eq!(previous, 4..10);

        let (current, previous) = token_extent(&c, 3, 0..c.len());
        assert_eq!(current, 0..3);
        assert_eq!(previous, 0..0);
    }

    #[test]
    fn cursor_in_whitespace_is_an_empty_token() {
        let c = chars("git  x");
        let (current, previous) = token_extent(&c, 4, 0..c.len());
        assert_eq!(current, 4..4);
        assert_eq!(previous, 0..3);
    }
}
