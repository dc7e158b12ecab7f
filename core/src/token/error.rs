use std::fmt;

use serde::Serialize;

/// A 1-indexed line/column location in Jsonnet source.
///
/// Columns count Unicode scalar values, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    pub fn start() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Source range. `end` points one column past the last character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn from_coords(l1: u32, c1: u32, l2: u32, c2: u32) -> Self {
        Self {
            start: Position::new(l1, c1),
            end: Position::new(l2, c2),
        }
    }

    pub fn single(pos: Position) -> Self {
        Self { start: pos, end: pos }
    }

    /// Inclusive on both ends so a cursor sitting right after a token, or at
    /// the end of input, still belongs to the construct being typed.
    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }

    pub fn contains_span(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(f, "{}:{}-{}", self.start.line, self.start.column, self.end.column)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// A recoverable problem found while lexing or parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseDiagnostic {
    pub message: String,
    pub span: Span,
}

impl ParseDiagnostic {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    pub fn at(message: impl Into<String>, pos: Position) -> Self {
        Self::new(message, Span::single(pos))
    }
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

/// Maps 1-indexed positions to byte offsets and back for one source text.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Byte offset of `pos`, or `None` when it lies outside `text`.
    pub fn offset(&self, text: &str, pos: Position) -> Option<usize> {
        let line_idx = (pos.line as usize).checked_sub(1)?;
        let line_start = *self.line_starts.get(line_idx)?;
        let line_end = self
            .line_starts
            .get(line_idx + 1)
            .map(|next| next - 1)
            .unwrap_or(text.len());
        let line = &text[line_start..line_end];

        let target = (pos.column as usize).checked_sub(1)?;
        let mut chars = 0usize;
        for (byte_idx, _) in line.char_indices() {
            if chars == target {
                return Some(line_start + byte_idx);
            }
            chars += 1;
        }
        if chars == target {
            Some(line_end)
        } else {
            None
        }
    }
}

/// Helper to convert a byte offset to a line/column position
pub fn offset_to_position(text: &str, offset: usize) -> Position {
    let mut line = 1;
    let mut column = 1;

    for (i, ch) in text.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }

    Position::new(line, column)
}
