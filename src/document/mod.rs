//! Document model: line index, text document, and store.
//!
//! This module provides:
//! - `LineIndex` for efficient byte offset <-> LSP position conversion
//! - `TextDocument` and the incremental batch-update engine
//! - `DocumentStore` for document lifecycle management

mod line_index;
pub mod position;
mod store;
mod text_document;

pub use line_index::LineIndex;
pub use store::{DocumentStore, StoreError};
pub use text_document::{ContentChange, OverlapError, TextDocument};
