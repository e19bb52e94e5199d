//! Storage trait definitions

use crate::annotation::{Document, DocumentId, LabelVocabulary, Relation, RelationId, Span, SpanId};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Filter criteria for querying spans
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpanFilter {
    /// Exact label match
    pub label: Option<String>,
    /// Case-sensitive substring of the span text
    pub text_contains: Option<String>,
    /// Maximum number of results
    pub limit: Option<usize>,
}

impl SpanFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_contains = Some(text.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, span: &Span) -> bool {
        self.label.as_ref().map_or(true, |l| &span.label == l)
            && self
                .text_contains
                .as_ref()
                .map_or(true, |t| span.text.contains(t.as_str()))
    }
}

/// Persistence collaborator for documents, spans and relations
///
/// Implementations must be thread-safe. Span listings are ordered by start
/// offset, ties broken by insertion order.
pub trait AnnotationRepository: Send + Sync {
    // === Documents ===

    fn save_document(&self, document: &Document) -> StorageResult<()>;

    fn load_document(&self, id: &DocumentId) -> StorageResult<Option<Document>>;

    fn list_documents(&self) -> StorageResult<Vec<DocumentId>>;

    /// Delete a document with its spans and relations.
    fn delete_document(&self, id: &DocumentId) -> StorageResult<bool>;

    // === Spans ===

    fn insert_span(&self, document: &DocumentId, span: &Span) -> StorageResult<()>;

    fn delete_span(&self, document: &DocumentId, id: &SpanId) -> StorageResult<bool>;

    fn list_spans(&self, document: &DocumentId) -> StorageResult<Vec<Span>>;

    fn find_spans(&self, document: &DocumentId, filter: &SpanFilter) -> StorageResult<Vec<Span>>;

    fn count_spans_by_label(&self, document: &DocumentId) -> StorageResult<BTreeMap<String, usize>>;

    // === Relations ===

    fn insert_relation(&self, document: &DocumentId, relation: &Relation) -> StorageResult<()>;

    fn delete_relation(&self, document: &DocumentId, id: &RelationId) -> StorageResult<bool>;

    fn list_relations(&self, document: &DocumentId) -> StorageResult<Vec<Relation>>;

    // === Labels ===

    /// The saved label vocabulary, or `None` if none was ever saved.
    fn load_labels(&self) -> StorageResult<Option<LabelVocabulary>>;

    /// Replace the saved label vocabulary. Only custom labels are kept.
    fn save_labels(&self, labels: &LabelVocabulary) -> StorageResult<()>;
}

/// Extension trait for opening storage backends
pub trait OpenStore: AnnotationRepository + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
