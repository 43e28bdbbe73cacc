//! Line index for byte offset <-> LSP position conversion.
//!
//! LSP positions use line/column where column is in UTF-16 code units, while
//! all linear offsets in this crate are byte offsets into UTF-8 text. The
//! index stores the byte offset at which each line starts and is computed
//! against a fixed text snapshot; the owning document rebuilds or patches it
//! whenever the content changes.

use tower_lsp::lsp_types::Position;

/// Pre-computed line-start table for O(log n) position lookups.
///
/// Recognized line terminators are `\n`, a lone `\r`, and `\r\n` (consumed as
/// a single terminator). Line 0 always starts at offset 0, so the table is
/// never empty and an empty document has exactly one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    /// Byte offset where each line starts, strictly increasing.
    line_starts: Vec<usize>,
}

/// Append the start offset of every line that begins inside `text`.
///
/// Offsets are reported relative to `base`, which lets the same scan serve
/// both full builds and the incremental patch of an edited region.
fn scan_line_starts(text: &str, base: usize, out: &mut Vec<usize>) {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => out.push(base + i + 1),
            b'\r' => {
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                out.push(base + i + 1);
            }
            _ => {}
        }
        i += 1;
    }
}

impl LineIndex {
    /// Build a line index by scanning `text` once.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        scan_line_starts(text, 0, &mut line_starts);
        Self { line_starts }
    }

    /// Number of lines, always at least 1.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset at which `line` starts, if the line exists.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    /// The line containing `offset`: greatest line start `<= offset`.
    ///
    /// `offset` must not exceed the indexed text's length.
    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line - 1,
        }
    }

    /// Convert an LSP position to a byte offset into `text`.
    ///
    /// Out-of-range input is clamped, never rejected: a line past the end of
    /// the document maps to `text.len()`, and a character past the end of its
    /// line is clamped to the next line's start (terminator included) or to
    /// the document end on the last line. Remote clients routinely send stale
    /// coordinates for a document that has since shrunk, so leniency here is
    /// part of the contract.
    pub fn offset_at(&self, text: &str, position: Position) -> usize {
        let line = position.line as usize;
        if line >= self.line_starts.len() {
            return text.len();
        }
        let line_start = self.line_starts[line];
        if position.character == 0 {
            return line_start;
        }
        let line_end = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(text.len());

        // Walk UTF-16 code units to find the byte offset; a character value
        // landing inside a surrogate pair snaps to the next char boundary.
        let target = position.character as usize;
        let mut utf16 = 0usize;
        for (i, c) in text[line_start..line_end].char_indices() {
            if utf16 >= target {
                return line_start + i;
            }
            utf16 += c.len_utf16();
        }
        line_end
    }

    /// Convert a byte offset into `text` to an LSP position.
    ///
    /// The offset is clamped to `[0, text.len()]` and down to the nearest
    /// char boundary.
    pub fn position_at(&self, text: &str, offset: usize) -> Position {
        let mut offset = offset.min(text.len());
        while !text.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = self.line_of(offset);
        let line_start = self.line_starts[line];
        let character: usize = text[line_start..offset].chars().map(char::len_utf16).sum();
        Position::new(line as u32, character as u32)
    }

    /// Incrementally patch the index for one replacement of
    /// `text[start_offset..end_offset]` (against the old snapshot `text`) by
    /// `replacement`, without re-scanning the unaffected prefix and suffix.
    ///
    /// Returns `false` and leaves the index untouched when a `\r\n` pair
    /// would straddle a splice seam; splicing there could disagree with a
    /// full rebuild, so the caller must rebuild instead.
    pub fn try_splice(
        &mut self,
        text: &str,
        start_offset: usize,
        end_offset: usize,
        replacement: &str,
    ) -> bool {
        let bytes = text.as_bytes();
        // A '\r' just before the edited region, or a replacement ending in
        // '\r' with a '\n' surviving right after it, can merge with (or split
        // from) its neighbor across the seam.
        let prefix_seam = start_offset > 0 && bytes[start_offset - 1] == b'\r';
        let suffix_seam = replacement.as_bytes().last() == Some(&b'\r')
            && bytes.get(end_offset) == Some(&b'\n');
        if prefix_seam || suffix_seam {
            return false;
        }

        let start_line = self.line_of(start_offset);
        let end_line = self.line_of(end_offset);

        let mut added = Vec::new();
        scan_line_starts(replacement, start_offset, &mut added);
        let added_len = added.len();

        let delta = replacement.len() as isize - (end_offset - start_offset) as isize;
        self.line_starts.splice(start_line + 1..end_line + 1, added);
        if delta != 0 {
            for start in &mut self.line_starts[start_line + 1 + added_len..] {
                *start = (*start as isize + delta) as usize;
            }
        }
        true
    }
}
