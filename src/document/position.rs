//! Position and range helpers.
//!
//! The crate uses `tower_lsp::lsp_types` value types throughout; these helpers
//! add the lexicographic comparison and containment checks the update engine
//! and its callers need.

use std::cmp::Ordering;

use tower_lsp::lsp_types::{Position, Range};

/// Compare two positions in (line, character) lexicographic order.
pub fn compare(a: Position, b: Position) -> Ordering {
    match a.line.cmp(&b.line) {
        Ordering::Equal => a.character.cmp(&b.character),
        ordering => ordering,
    }
}

/// Whether `position` falls inside the half-open range `[start, end)`.
pub fn contains(range: &Range, position: Position) -> bool {
    compare(range.start, position) != Ordering::Greater
        && compare(position, range.end) == Ordering::Less
}

/// Shorthand range constructor used across the crate and its tests.
pub fn range(start_line: u32, start_character: u32, end_line: u32, end_character: u32) -> Range {
    Range::new(
        Position::new(start_line, start_character),
        Position::new(end_line, end_character),
    )
}
