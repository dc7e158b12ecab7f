//! Coordinate translation between the client (0-indexed lines, UTF-16
//! characters) and the analysis core (1-indexed lines and scalar-value
//! columns). Every conversion at the boundary goes through here.

use ropey::Rope;
use tower_lsp::lsp_types::{Position, Range, TextDocumentContentChangeEvent};

use jsonnet_core::token::{Position as CorePosition, Span};

/// Scalar values of the first `utf16` UTF-16 units of a line, clamped to the line.
fn utf16_to_chars(line: ropey::RopeSlice<'_>, utf16: usize) -> usize {
    if let Some(s) = line.as_str() {
        if s.is_ascii() {
            return utf16.min(s.len());
        }
    }

    let mut seen_utf16 = 0usize;
    let mut chars = 0usize;
    for ch in line.chars() {
        let len = ch.len_utf16();
        if seen_utf16 + len > utf16 {
            break;
        }
        seen_utf16 += len;
        chars += 1;
        if seen_utf16 == utf16 {
            break;
        }
    }
    chars
}

// Convert LSP UTF-16 position to Rope char index, clamped to the end of the line.
pub(crate) fn position_to_char_idx(text: &Rope, pos: Position) -> usize {
    let line_idx = pos.line as usize;
    if line_idx >= text.len_lines() {
        return text.len_chars();
    }
    text.line_to_char(line_idx) + utf16_to_chars(text.line(line_idx), pos.character as usize)
}

/// Client position to core position. Lines past the end are passed through
/// so the core can report them as outside the document.
pub(crate) fn to_core_position(text: &Rope, pos: Position) -> CorePosition {
    let line_idx = pos.line as usize;
    if line_idx >= text.len_lines() {
        return CorePosition::new(pos.line + 1, pos.character + 1);
    }
    let column = utf16_to_chars(text.line(line_idx), pos.character as usize);
    CorePosition::new(pos.line + 1, column as u32 + 1)
}

pub(crate) fn to_lsp_position(text: &Rope, pos: CorePosition) -> Position {
    let line = pos.line.saturating_sub(1);
    let chars = pos.column.saturating_sub(1) as usize;
    if line as usize >= text.len_lines() {
        return Position::new(line, chars as u32);
    }
    let utf16: usize = text
        .line(line as usize)
        .chars()
        .take(chars)
        .map(char::len_utf16)
        .sum();
    Position::new(line, utf16 as u32)
}

pub(crate) fn to_lsp_range(text: &Rope, span: Span) -> Range {
    Range::new(to_lsp_position(text, span.start), to_lsp_position(text, span.end))
}

/// Document text before `pos`.
pub(crate) fn text_before(text: &Rope, pos: Position) -> String {
    text.slice(..position_to_char_idx(text, pos)).to_string()
}

/// Current line up to `pos`.
pub(crate) fn line_prefix(text: &Rope, pos: Position) -> String {
    let end = position_to_char_idx(text, pos);
    let line = text.char_to_line(end);
    text.slice(text.line_to_char(line)..end).to_string()
}

// Apply incremental LSP changes to a rope buffer.
pub(crate) fn apply_incremental_change_rope(text: &mut Rope, change: &TextDocumentContentChangeEvent) {
    if let Some(range) = &change.range {
        let start_char = position_to_char_idx(text, range.start);
        let end_char = position_to_char_idx(text, range.end);
        let (s, e) = if start_char <= end_char {
            (start_char, end_char)
        } else {
            (end_char, start_char)
        };
        if s != e {
            text.remove(s..e);
        }
        if !change.text.is_empty() {
            text.insert(s, &change.text);
        }
    } else {
        *text = Rope::from_str(&change.text);
    }
}
