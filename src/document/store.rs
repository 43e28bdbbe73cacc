//! Thread-safe storage for open documents.
//!
//! The transport layer dispatches one notification per document at a time, in
//! arrival order; the store only guards concurrent access across *different*
//! documents.

use dashmap::DashMap;
use thiserror::Error;
use tower_lsp::lsp_types::Url;

use super::text_document::{ContentChange, OverlapError, TextDocument};

/// Failure at the store seam.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The URI is not currently open in this store.
    #[error("document not tracked: {uri}")]
    DocumentNotFound { uri: Url },

    /// The update batch contained overlapping edits; the document was left
    /// unchanged.
    #[error(transparent)]
    Overlap(#[from] OverlapError),
}

/// Open documents keyed by URI.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: DashMap<Url, TextDocument>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
        }
    }

    /// Track a newly opened document. Re-opening a tracked URI replaces its
    /// state wholesale.
    pub fn open(&self, uri: Url, language_id: impl Into<String>, version: i32, text: String) {
        log::debug!("open {} (version {})", uri, version);
        self.documents.insert(
            uri.clone(),
            TextDocument::new(uri, language_id, version, text),
        );
    }

    /// Apply a change batch to a tracked document.
    pub fn update(
        &self,
        uri: &Url,
        changes: Vec<ContentChange>,
        version: i32,
    ) -> Result<(), StoreError> {
        let mut document =
            self.documents
                .get_mut(uri)
                .ok_or_else(|| StoreError::DocumentNotFound {
                    uri: uri.clone(),
                })?;
        document.apply_update(changes, version).map_err(|err| {
            log::warn!("rejected update for {}: {}", uri, err);
            err.into()
        })
    }

    /// Stop tracking a document. Returns whether it was tracked.
    pub fn close(&self, uri: &Url) -> bool {
        log::debug!("close {}", uri);
        self.documents.remove(uri).is_some()
    }

    /// Snapshot of a document's full content.
    pub fn get_content(&self, uri: &Url) -> Option<String> {
        self.documents.get(uri).map(|doc| doc.get_text().to_string())
    }

    /// Run a read-only closure against a tracked document.
    ///
    /// The entry stays locked for the duration of the closure, so an update
    /// to the same document can never interleave with the read.
    pub fn with_document<R>(&self, uri: &Url, f: impl FnOnce(&TextDocument) -> R) -> Option<R> {
        self.documents.get(uri).map(|doc| f(&doc))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::position::range;
    use tower_lsp::lsp_types::Position;

    fn uri(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn ranged(r: tower_lsp::lsp_types::Range, text: &str) -> ContentChange {
        ContentChange::Ranged {
            range: r,
            text: text.to_string(),
        }
    }

    #[test]
    fn open_update_close() {
        let store = DocumentStore::new();
        let u = uri("file:///a.txt");
        store.open(u.clone(), "plaintext", 0, "hello\nworld".to_string());
        assert_eq!(store.len(), 1);

        store
            .update(&u, vec![ranged(range(1, 0, 1, 5), "there")], 1)
            .unwrap();
        assert_eq!(store.get_content(&u).as_deref(), Some("hello\nthere"));
        let version = store.with_document(&u, |doc| doc.version()).unwrap();
        assert_eq!(version, 1);

        assert!(store.close(&u));
        assert!(!store.close(&u));
        assert!(store.is_empty());
    }

    #[test]
    fn update_unknown_document() {
        let store = DocumentStore::new();
        let u = uri("file:///missing.txt");
        let err = store.update(&u, vec![], 1).unwrap_err();
        assert_eq!(err, StoreError::DocumentNotFound { uri: u });
    }

    #[test]
    fn overlap_propagates_and_leaves_document_intact() {
        let store = DocumentStore::new();
        let u = uri("file:///a.txt");
        store.open(u.clone(), "plaintext", 0, "0123456789".to_string());
        let err = store
            .update(
                &u,
                vec![ranged(range(0, 2, 0, 6), "x"), ranged(range(0, 4, 0, 4), "y")],
                1,
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Overlap(_)));
        assert_eq!(store.get_content(&u).as_deref(), Some("0123456789"));
        assert_eq!(store.with_document(&u, |doc| doc.version()), Some(0));
    }

    #[test]
    fn reopen_replaces_state() {
        let store = DocumentStore::new();
        let u = uri("file:///a.txt");
        store.open(u.clone(), "plaintext", 3, "old".to_string());
        store.open(u.clone(), "markdown", 0, "new".to_string());
        store
            .with_document(&u, |doc| {
                assert_eq!(doc.get_text(), "new");
                assert_eq!(doc.language_id(), "markdown");
                assert_eq!(doc.version(), 0);
            })
            .unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn reads_see_positions_of_latest_snapshot() {
        let store = DocumentStore::new();
        let u = uri("file:///a.txt");
        store.open(u.clone(), "plaintext", 0, "a\nb\nc".to_string());
        store
            .update(&u, vec![ranged(range(0, 1, 0, 1), "\nx")], 1)
            .unwrap();
        let pos = store
            .with_document(&u, |doc| doc.position_at(doc.get_text().len()))
            .unwrap();
        assert_eq!(pos, Position::new(3, 1));
    }
}
