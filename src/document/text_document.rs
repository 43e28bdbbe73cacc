//! The text-document entity and the incremental update engine.
//!
//! A `TextDocument` owns the full content of one open document together with
//! the client-supplied version and a lazily built [`LineIndex`]. Batches of
//! edits arrive as [`ContentChange`] lists; a batch is applied atomically
//! against the snapshot that existed when it began, and a batch containing
//! overlapping edits is rejected without touching the document.

use std::sync::OnceLock;

use serde::Deserialize;
use thiserror::Error;
use tower_lsp::lsp_types::{Position, Range, TextDocumentContentChangeEvent, TextEdit, Url};

use super::line_index::LineIndex;
use super::position;

/// Two edits in one batch cover intersecting spans of the pre-batch text.
///
/// The whole batch is rejected and the document is left exactly as it was;
/// callers are expected to surface a protocol-level error rather than apply
/// the message partially.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("overlapping edit over bytes {start}..{end}")]
pub struct OverlapError {
    /// Resolved byte span of the edit that collided with an earlier one.
    pub start: usize,
    pub end: usize,
}

/// One element of an edit batch.
///
/// Mirrors the wire shape of `textDocument/didChange` content changes: an
/// element with a range replaces that slice, an element without one replaces
/// the whole document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ContentChange {
    /// Replace the slice identified by `range` with `text`.
    Ranged { range: Range, text: String },
    /// Replace the entire document content with `text`.
    Full { text: String },
}

impl From<TextDocumentContentChangeEvent> for ContentChange {
    fn from(event: TextDocumentContentChangeEvent) -> Self {
        match event.range {
            Some(range) => ContentChange::Ranged {
                range,
                text: event.text,
            },
            None => ContentChange::Full { text: event.text },
        }
    }
}

/// An open document: content, client version, and a lazy line index.
///
/// Exactly one owner mutates a document, sequentially; read accessors are
/// pure functions of the current snapshot.
#[derive(Debug)]
pub struct TextDocument {
    uri: Url,
    language_id: String,
    version: i32,
    content: String,
    /// Invalidated (or incrementally patched) on every content mutation,
    /// rebuilt on first use after that.
    line_offsets: OnceLock<LineIndex>,
}

impl TextDocument {
    pub fn new(uri: Url, language_id: impl Into<String>, version: i32, content: String) -> Self {
        Self {
            uri,
            language_id: language_id.into(),
            version,
            content,
            line_offsets: OnceLock::new(),
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn language_id(&self) -> &str {
        &self.language_id
    }

    /// Version supplied by the caller on the last update. The engine trusts
    /// the caller's value and never increments it itself.
    pub fn version(&self) -> i32 {
        self.version
    }

    /// The full current content.
    pub fn get_text(&self) -> &str {
        &self.content
    }

    /// The slice of content identified by `range`.
    ///
    /// Both endpoints are clamped into the document and an inverted range
    /// degrades to the empty string; out-of-bounds input never fails.
    pub fn get_text_range(&self, range: Range) -> &str {
        let index = self.line_index();
        let start = index.offset_at(&self.content, range.start);
        let end = index.offset_at(&self.content, range.end);
        if start >= end {
            ""
        } else {
            &self.content[start..end]
        }
    }

    /// Number of lines, always at least 1.
    pub fn line_count(&self) -> usize {
        self.line_index().line_count()
    }

    /// Convert a byte offset to a position, clamping per [`LineIndex::position_at`].
    pub fn position_at(&self, offset: usize) -> Position {
        self.line_index().position_at(&self.content, offset)
    }

    /// Convert a position to a byte offset, clamping per [`LineIndex::offset_at`].
    pub fn offset_at(&self, position: Position) -> usize {
        self.line_index().offset_at(&self.content, position)
    }

    fn line_index(&self) -> &LineIndex {
        self.line_offsets
            .get_or_init(|| LineIndex::new(&self.content))
    }

    /// Replace the whole content and set the version; the line index is
    /// dropped for lazy rebuild.
    pub fn apply_full_update(&mut self, text: String, version: i32) {
        self.content = text;
        self.version = version;
        self.line_offsets = OnceLock::new();
    }

    /// Apply one batch of changes atomically and set the version.
    ///
    /// Changes are processed strictly in the supplied order. A `Full` change
    /// resets the working snapshot; each maximal run of `Ranged` changes is
    /// resolved against the snapshot current at the start of that run, so an
    /// all-ranged batch is interpreted against the pre-batch document rather
    /// than against cascading intermediate states. Within a run, an edit
    /// whose span intersects an earlier edit's span fails the whole call with
    /// [`OverlapError`] and no mutation at all; edits that merely touch at a
    /// boundary are fine. An empty batch only sets the version.
    pub fn apply_update(
        &mut self,
        changes: Vec<ContentChange>,
        version: i32,
    ) -> Result<(), OverlapError> {
        // Working snapshot built off to the side; committed only when the
        // whole batch has validated.
        let mut working: Option<(String, Option<LineIndex>)> = None;

        let mut changes = changes.into_iter().peekable();
        while let Some(change) = changes.next() {
            match change {
                ContentChange::Full { text } => {
                    working = Some((text, None));
                }
                ContentChange::Ranged { range, text } => {
                    let mut run = vec![(range, text)];
                    while matches!(changes.peek(), Some(ContentChange::Ranged { .. })) {
                        if let Some(ContentChange::Ranged { range, text }) = changes.next() {
                            run.push((range, text));
                        }
                    }
                    let next = match &mut working {
                        None => apply_run(&self.content, self.line_index(), &run)?,
                        Some((text, index)) => {
                            let index = index.get_or_insert_with(|| LineIndex::new(text));
                            apply_run(text, index, &run)?
                        }
                    };
                    working = Some(next);
                }
            }
        }

        if let Some((content, index)) = working {
            self.content = content;
            self.line_offsets = OnceLock::new();
            if let Some(index) = index {
                let _ = self.line_offsets.set(index);
            }
        }
        self.version = version;
        Ok(())
    }

    /// Compute the text that would result from applying `edits` to the
    /// current content, without mutating the document.
    ///
    /// Same snapshot and overlap semantics as a single ranged run of
    /// [`apply_update`].
    pub fn apply_edits(&self, edits: &[TextEdit]) -> Result<String, OverlapError> {
        let pairs: Vec<(Range, &str)> = edits
            .iter()
            .map(|edit| (edit.range, edit.new_text.as_str()))
            .collect();
        let (text, _) = splice_edits(&self.content, self.line_index(), &pairs)?;
        Ok(text)
    }
}

/// Apply one run of ranged edits to a snapshot, producing the new text and,
/// when the run is a single edit, an incrementally patched line index.
///
/// Multi-edit runs leave the index for lazy rebuild: they are rare in
/// practice, while the single-edit path is what editors send on every
/// keystroke and must not re-scan a large document.
fn apply_run(
    text: &str,
    index: &LineIndex,
    run: &[(Range, String)],
) -> Result<(String, Option<LineIndex>), OverlapError> {
    let pairs: Vec<(Range, &str)> = run
        .iter()
        .map(|(range, text)| (*range, text.as_str()))
        .collect();
    let (new_text, resolved) = splice_edits(text, index, &pairs)?;

    let new_index = match (run, resolved.as_slice()) {
        ([(_, replacement)], [(start, end)]) => {
            let mut patched = index.clone();
            patched
                .try_splice(text, *start, *end, replacement)
                .then_some(patched)
        }
        _ => None,
    };
    Ok((new_text, new_index))
}

/// Resolve, validate, and splice a batch of edits against one snapshot.
///
/// Edits are resolved to byte spans with the usual clamping (an inverted
/// range is normalized first), stable-sorted by start offset so equal-offset
/// edits keep their list order, and spliced tail to head so already-spliced
/// regions never shift the spans still pending. Returns the new text plus the
/// resolved spans in splice order.
fn splice_edits(
    text: &str,
    index: &LineIndex,
    edits: &[(Range, &str)],
) -> Result<(String, Vec<(usize, usize)>), OverlapError> {
    let mut resolved: Vec<(usize, usize, &str)> = edits
        .iter()
        .map(|(range, new_text)| {
            let (start, end) = resolve_range(text, index, range);
            (start, end, *new_text)
        })
        .collect();
    resolved.sort_by_key(|&(start, _, _)| start);

    let mut spans: Vec<&str> = Vec::with_capacity(resolved.len() * 2 + 1);
    let mut last_unchanged = text.len();
    for &(start, end, new_text) in resolved.iter().rev() {
        if end > last_unchanged {
            return Err(OverlapError { start, end });
        }
        spans.push(&text[end..last_unchanged]);
        spans.push(new_text);
        last_unchanged = start;
    }
    spans.push(&text[..last_unchanged]);

    let mut out = String::with_capacity(spans.iter().map(|span| span.len()).sum());
    for span in spans.iter().rev() {
        out.push_str(span);
    }
    Ok((out, resolved.iter().map(|&(start, end, _)| (start, end)).collect()))
}

/// Clamp a possibly malformed range to byte offsets, normalizing inverted
/// endpoints so `start <= end` always holds for the resolved span.
fn resolve_range(text: &str, index: &LineIndex, range: &Range) -> (usize, usize) {
    let (start, end) = match position::compare(range.start, range.end) {
        std::cmp::Ordering::Greater => (range.end, range.start),
        _ => (range.start, range.end),
    };
    (index.offset_at(text, start), index.offset_at(text, end))
}
