//! Statement tokenizer and composite-line splitter.
//!
//! Grammar:
//! - tokens are separated by runs of whitespace
//! - `"..."` groups text verbatim until the next unescaped `"`
//! - `{...}` groups text like quotes, but nests: inner braces are kept
//! - `\` followed by one of `" \ { }` yields that character literally
//! - `;` separates statements on one line (see [`split_statements`])
//!
//! An empty group (`""` or `{}`) produces a zero-length token.

use std::ops::Range;

/// Characters that may follow a `\` escape.
#[inline]
pub fn is_escape_char(c: char) -> bool {
    matches!(c, '"' | '\\' | '{' | '}')
}

/// A quote or brace group that reached end of line without closing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnterminatedGroup {
    /// The opening delimiter, `"` or `{`.
    pub delimiter: char,
    /// Byte offset of the delimiter in the original line.
    pub offset: usize,
}

/// Tokens of one statement.
///
/// Owns a processed copy of the statement text (escapes resolved); tokens are
/// spans into that copy. Token 0 is the command, variable or alias name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentVector {
    text: String,
    spans: Vec<Range<usize>>,
    unterminated: Option<UnterminatedGroup>,
}

impl ArgumentVector {
    /// Number of tokens, including the name.
    #[inline]
    pub fn argc(&self) -> usize {
        self.spans.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Token `index`, where 0 is the name.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.spans.get(index).map(|span| &self.text[span.clone()])
    }

    /// The first token, or `""` for an empty statement.
    pub fn name(&self) -> &str {
        self.get(0).unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.spans.iter().map(|span| &self.text[span.clone()])
    }

    /// Tokens after the name.
    pub fn args(&self) -> impl Iterator<Item = &str> {
        self.iter().skip(1)
    }

    /// Set when a quote or brace group ran to end of line. The group then
    /// holds the rest of the line as one token.
    #[inline]
    pub fn unterminated(&self) -> Option<UnterminatedGroup> {
        self.unterminated
    }
}

/// Scanner state while building an [`ArgumentVector`].
struct Scanner {
    text: String,
    spans: Vec<Range<usize>>,
    bare_start: Option<usize>,
}

impl Scanner {
    fn push_bare(&mut self, c: char) {
        if self.bare_start.is_none() {
            self.bare_start = Some(self.text.len());
        }
        self.text.push(c);
    }

    fn end_bare(&mut self) {
        if let Some(start) = self.bare_start.take() {
            self.spans.push(start..self.text.len());
        }
    }
}

/// Split one statement into tokens.
///
/// Never fails: an unterminated group swallows the remainder of the line and
/// is reported through [`ArgumentVector::unterminated`].
///
/// # Examples
///
/// ```
/// use bevy_console_runtime::core::tokenize;
///
/// let argv = tokenize(r#"say "hello world""#);
/// assert_eq!(argv.iter().collect::<Vec<_>>(), vec!["say", "hello world"]);
///
/// let argv = tokenize(r#"echo \"literal\""#);
/// assert_eq!(argv.get(1), Some("\"literal\""));
/// ```
pub fn tokenize(line: &str) -> ArgumentVector {
    let mut scanner = Scanner {
        text: String::with_capacity(line.len()),
        spans: Vec::new(),
        bare_start: None,
    };
    let mut unterminated = None;
    let mut chars = line.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => scanner.end_bare(),
            '\\' if chars.peek().is_some_and(|&(_, next)| is_escape_char(next)) => {
                if let Some((_, escaped)) = chars.next() {
                    scanner.push_bare(escaped);
                }
            }
            '"' | '{' => {
                scanner.end_bare();
                let start = scanner.text.len();
                let mut depth = 0usize;
                let mut closed = false;

                while let Some((_, inner)) = chars.next() {
                    match inner {
                        '\\' if chars.peek().is_some_and(|&(_, next)| is_escape_char(next)) => {
                            if let Some((_, escaped)) = chars.next() {
                                scanner.text.push(escaped);
                            }
                        }
                        '"' if c == '"' => {
                            closed = true;
                            break;
                        }
                        '{' if c == '{' => {
                            depth += 1;
                            scanner.text.push(inner);
                        }
                        '}' if c == '{' => {
                            if depth == 0 {
                                closed = true;
                                break;
                            }
                            depth -= 1;
                            scanner.text.push(inner);
                        }
                        _ => scanner.text.push(inner),
                    }
                }

                scanner.spans.push(start..scanner.text.len());
                if !closed {
                    unterminated = Some(UnterminatedGroup {
                        delimiter: c,
                        offset,
                    });
                }
            }
            _ => scanner.push_bare(c),
        }
    }
    scanner.end_bare();

    ArgumentVector {
        text: scanner.text,
        spans: scanner.spans,
        unterminated,
    }
}

/// Split a composite line into statements on `;`.
///
/// A `;` inside a quote or brace group is not a split point, and escaped
/// delimiters do not open or close groups. Runs of `;` are skipped, as are
/// statements made only of whitespace. Statement text is returned verbatim.
///
/// # Examples
///
/// ```
/// use bevy_console_runtime::core::split_statements;
///
/// let statements = split_statements(r#"echo "a;b"; echo c"#);
/// assert_eq!(statements, vec![r#"echo "a;b""#, " echo c"]);
/// ```
pub fn split_statements(line: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut brace_depth = 0usize;
    let mut chars = line.char_indices().peekable();

    fn push<'a>(statement: &'a str, statements: &mut Vec<&'a str>) {
        if !statement.trim().is_empty() {
            statements.push(statement);
        }
    }

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' if chars.peek().is_some_and(|&(_, next)| is_escape_char(next)) => {
                chars.next();
            }
            '"' if brace_depth == 0 => in_quotes = !in_quotes,
            '{' if !in_quotes => brace_depth += 1,
            '}' if !in_quotes && brace_depth > 0 => brace_depth -= 1,
            ';' if !in_quotes && brace_depth == 0 => {
                push(&line[start..i], &mut statements);
                start = i + 1;
            }
            _ => {}
        }
    }
    push(&line[start..], &mut statements);

    statements
}
