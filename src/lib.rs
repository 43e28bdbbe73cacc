//! Incremental text document synchronization core for LSP servers.
//!
//! This crate implements the in-memory model of one open document: its
//! content, its client-supplied version, and a line index converting between
//! byte offsets and LSP line/character positions. Batches of incremental
//! edits (the payload of `textDocument/didChange`) are applied atomically
//! against the pre-batch snapshot, with overlapping batches rejected whole.
//!
//! Positions and ranges are `tower_lsp::lsp_types` values; out-of-range
//! coordinates are clamped rather than rejected, since editors routinely send
//! stale positions for a document that has since shrunk.
//!
//! [`LinkedMap`] is the insertion-ordered container the surrounding protocol
//! layer uses for request bookkeeping.

mod document;
mod linked_map;

pub use document::position;
pub use document::{ContentChange, DocumentStore, LineIndex, OverlapError, StoreError, TextDocument};
pub use linked_map::{LinkedMap, Touch};
