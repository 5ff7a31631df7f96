// tokenizer.rs: delimiter/qualifier aware line splitting
use std::iter::{FusedIterator, Peekable};
use std::str::Chars;

use memchr::memchr_iter;
use serde::Deserialize;

/// Where the scanner is relative to the field being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Before the first non-whitespace character of a field.
    Outside,
    Unquoted,
    Quoted,
    /// A qualifier closed the quoted span; anything up to the next delimiter is tail text.
    AfterClose,
}

/// Lazy field iterator over one line. See [`fields`].
#[derive(Debug, Clone)]
pub struct Fields<'a> {
    chars: Peekable<Chars<'a>>,
    delimiter: char,
    qualifier: Option<char>,
    finished: bool,
}

/// Iterate the fields of `line` without collecting them.
///
/// Yields exactly the sequence [`split_line`] returns for `Some(line)`.
pub fn fields(line: &str, delimiter: char, qualifier: Option<char>) -> Fields<'_> {
    // whitespace-only lines are one absent field even when the delimiter is itself whitespace
    let line = if line.trim().is_empty() { "" } else { line };
    let qualifier = qualifier.filter(|q| *q != delimiter);
    Fields { chars: line.chars().peekable(), delimiter, qualifier, finished: false }
}

impl Iterator for Fields<'_> {
    type Item = Option<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let mut state = ScanState::Outside;
        let mut value = String::with_capacity(16);
        let mut tail = String::new();

        while let Some(c) = self.chars.next() {
            match state {
                ScanState::Outside => {
                    if c == self.delimiter {
                        return Some(None);
                    } else if Some(c) == self.qualifier {
                        state = ScanState::Quoted;
                    } else if !c.is_whitespace() {
                        value.push(c);
                        state = ScanState::Unquoted;
                    }
                }
                ScanState::Unquoted => {
                    if c == self.delimiter {
                        return Some(finish(state, value, tail));
                    }
                    value.push(c);
                }
                ScanState::Quoted => {
                    if Some(c) == self.qualifier {
                        if self.chars.peek() == Some(&c) {
                            self.chars.next();
                            value.push(c);
                        } else {
                            state = ScanState::AfterClose;
                        }
                    } else {
                        value.push(c);
                    }
                }
                ScanState::AfterClose => {
                    if c == self.delimiter {
                        return Some(finish(state, value, tail));
                    }
                    tail.push(c);
                }
            }
        }

        self.finished = true;
        if state == ScanState::Quoted {
            tracing::trace!(field = %value, "line ended inside an unterminated qualifier");
        }
        Some(finish(state, value, tail))
    }
}

impl FusedIterator for Fields<'_> {}

fn finish(state: ScanState, mut value: String, tail: String) -> Option<String> {
    match state {
        ScanState::Outside => None,
        ScanState::Unquoted => {
            let end = value.trim_end().len();
            value.truncate(end);
            Some(value)
        }
        ScanState::Quoted => Some(value),
        ScanState::AfterClose => {
            value.push_str(tail.trim_end());
            Some(value)
        }
    }
}

/// Split one line into its field values.
///
/// `None` yields no fields at all. An empty or whitespace-only line yields a
/// single absent field. Fields that are empty or blank are absent unless they
/// were written as an explicitly qualified `""`, which yields `Some("")`.
/// Malformed qualifiers never fail the line.
pub fn split_line(line: Option<&str>, delimiter: char, qualifier: Option<char>) -> Vec<Option<String>> {
    let Some(line) = line else {
        return Vec::new();
    };
    // Pre-reserve capacity based on delimiter count to reduce reallocations
    let approx_fields = if delimiter.is_ascii() {
        memchr_iter(delimiter as u8, line.as_bytes()).count() + 1
    } else {
        1
    };
    let mut out = Vec::with_capacity(approx_fields.max(8));
    out.extend(fields(line, delimiter, qualifier));
    out
}

/// The field at 0-based `index`, or `None` when it is absent or out of range.
pub fn extract_field(line: &str, delimiter: char, qualifier: Option<char>, index: usize) -> Option<String> {
    fields(line, delimiter, qualifier).nth(index).flatten()
}

fn default_delimiter() -> char {
    ','
}

fn default_qualifier() -> Option<char> {
    Some('"')
}

/// Delimiter and qualifier in effect for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Dialect {
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_qualifier")]
    pub qualifier: Option<char>,
}

impl Default for Dialect {
    fn default() -> Self {
        Self::csv()
    }
}

impl Dialect {
    pub fn new(delimiter: char, qualifier: Option<char>) -> Self {
        Self { delimiter, qualifier }
    }

    pub fn csv() -> Self {
        Self::new(',', Some('"'))
    }

    pub fn tab() -> Self {
        Self::new('\t', Some('"'))
    }

    pub fn pipe() -> Self {
        Self::new('|', None)
    }

    pub fn split(&self, line: &str) -> Vec<Option<String>> {
        split_line(Some(line), self.delimiter, self.qualifier)
    }

    pub fn fields<'a>(&self, line: &'a str) -> Fields<'a> {
        fields(line, self.delimiter, self.qualifier)
    }
}
