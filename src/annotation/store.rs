//! AnnotationStore: the ordered span set of each document
//!
//! All span mutation goes through this type. Writes to one document are
//! serialized by a per-document lock so that the importer's read-then-commit
//! collision check never interleaves with another writer.

use super::document::DocumentId;
use super::span::{refresh_text, validate, Span, SpanId};
use crate::storage::{AnnotationRepository, OpenStore, SpanFilter, SqliteStore, StorageError, StorageResult};
use crate::text::offsets::char_len;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur in store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid span [{start}, {end}) for text of {len} characters")]
    InvalidSpan { start: usize, end: usize, len: usize },

    #[error("Span not found: {0}")]
    SpanNotFound(SpanId),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// What happened to a batch of candidate spans
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub committed: Vec<Span>,
    /// Candidates overlapping a span already in the store
    pub collisions: usize,
    /// Candidates whose range does not fit the plain text
    pub invalid: usize,
    /// Candidates the repository refused to write
    pub failed: usize,
}

pub struct AnnotationStore {
    repository: Arc<dyn AnnotationRepository>,
    locks: DashMap<DocumentId, Arc<Mutex<()>>>,
}

impl AnnotationStore {
    pub fn new(repository: Arc<dyn AnnotationRepository>) -> Self {
        Self {
            repository,
            locks: DashMap::new(),
        }
    }

    /// A store over an in-memory SQLite database
    pub fn in_memory() -> StorageResult<Self> {
        Ok(Self::new(Arc::new(SqliteStore::open_in_memory()?)))
    }

    pub fn repository(&self) -> &Arc<dyn AnnotationRepository> {
        &self.repository
    }

    fn document_lock(&self, document: &DocumentId) -> Arc<Mutex<()>> {
        self.locks
            .entry(document.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn guard(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
        // The guarded value is (), so a poisoned lock carries no broken state.
        lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(span: &Span, plain_text: &str) -> StoreResult<()> {
        if validate(span, plain_text) {
            Ok(())
        } else {
            Err(StoreError::InvalidSpan {
                start: span.start,
                end: span.end,
                len: char_len(plain_text),
            })
        }
    }

    fn insert_unlocked(&self, document: &DocumentId, mut span: Span, plain_text: &str) -> StoreResult<Span> {
        if span.id.is_unassigned() {
            span.id = SpanId::new();
        }
        if refresh_text(&mut span, plain_text) {
            debug!(document = %document, span = %span.id, "span text re-derived from plain text");
        }
        self.repository.insert_span(document, &span)?;
        Ok(span)
    }

    /// Insert a span, assigning an id if it has none.
    ///
    /// The span's text is re-derived from `plain_text`. Invalid ranges are
    /// rejected; overlap with existing spans is allowed.
    pub fn add(&self, document: &DocumentId, span: Span, plain_text: &str) -> StoreResult<Span> {
        Self::check(&span, plain_text)?;
        let lock = self.document_lock(document);
        let _guard = Self::guard(&lock);
        self.insert_unlocked(document, span, plain_text)
    }

    /// Remove a span. Returns whether anything was removed.
    pub fn delete(&self, document: &DocumentId, id: &SpanId) -> StoreResult<bool> {
        let lock = self.document_lock(document);
        let _guard = Self::guard(&lock);
        Ok(self.repository.delete_span(document, id)?)
    }

    /// Remove a document with its spans and relations, and forget its lock.
    /// The lock map therefore holds at most one entry per live document.
    pub fn delete_document(&self, document: &DocumentId) -> StoreResult<bool> {
        let lock = self.document_lock(document);
        let removed = {
            let _guard = Self::guard(&lock);
            self.repository.delete_document(document)
        };
        self.locks.remove(document);
        Ok(removed?)
    }

    /// Replace a span: delete `old`, then add `replacement` under a fresh id.
    pub fn update(
        &self,
        document: &DocumentId,
        old: &SpanId,
        replacement: Span,
        plain_text: &str,
    ) -> StoreResult<Span> {
        Self::check(&replacement, plain_text)?;
        let lock = self.document_lock(document);
        let _guard = Self::guard(&lock);
        if !self.repository.delete_span(document, old)? {
            return Err(StoreError::SpanNotFound(old.clone()));
        }
        self.insert_unlocked(document, replacement.with_id(SpanId::new()), plain_text)
    }

    /// All spans of a document ordered by start, then insertion.
    ///
    /// A failed read yields an empty list.
    pub fn list(&self, document: &DocumentId) -> Vec<Span> {
        self.try_list(document).unwrap_or_else(|e| {
            warn!(document = %document, error = %e, "span list unavailable");
            Vec::new()
        })
    }

    pub fn try_list(&self, document: &DocumentId) -> StoreResult<Vec<Span>> {
        Ok(self.repository.list_spans(document)?)
    }

    /// Spans that are valid against the current plain text, with their text
    /// re-derived. Invalid spans stay stored but are left out.
    pub fn list_valid(&self, document: &DocumentId, plain_text: &str) -> Vec<Span> {
        self.list(document)
            .into_iter()
            .filter(|span| validate(span, plain_text))
            .map(|mut span| {
                refresh_text(&mut span, plain_text);
                span
            })
            .collect()
    }

    /// Spans matching `filter`; a failed read yields an empty list.
    pub fn search(&self, document: &DocumentId, filter: &SpanFilter) -> Vec<Span> {
        self.repository.find_spans(document, filter).unwrap_or_else(|e| {
            warn!(document = %document, error = %e, "span search unavailable");
            Vec::new()
        })
    }

    /// Span count per label; a failed read yields an empty map.
    pub fn count_by_label(&self, document: &DocumentId) -> BTreeMap<String, usize> {
        self.repository.count_spans_by_label(document).unwrap_or_else(|e| {
            warn!(document = %document, error = %e, "label counts unavailable");
            BTreeMap::new()
        })
    }

    /// The span covering exactly `[start, end)`, if any.
    pub fn find_exact(&self, document: &DocumentId, start: usize, end: usize) -> Option<Span> {
        self.list(document)
            .into_iter()
            .find(|s| s.start == start && s.end == end)
    }

    pub fn find_overlapping(&self, document: &DocumentId, start: usize, end: usize) -> Vec<Span> {
        self.list(document)
            .into_iter()
            .filter(|s| s.overlaps_range(start, end))
            .collect()
    }

    /// Commit candidates that neither fall outside the text nor overlap any
    /// span already stored, in the order given.
    ///
    /// The existing set is read under the document lock and grows as
    /// candidates commit, so two overlapping candidates in one batch keep only
    /// the first. A failed read aborts the batch before anything is written;
    /// individual write failures are counted and skipped.
    pub fn merge_batch(
        &self,
        document: &DocumentId,
        candidates: Vec<Span>,
        plain_text: &str,
    ) -> StoreResult<MergeOutcome> {
        let lock = self.document_lock(document);
        let _guard = Self::guard(&lock);

        let mut existing = self.try_list(document)?;
        let mut outcome = MergeOutcome::default();

        for candidate in candidates {
            if !validate(&candidate, plain_text) {
                outcome.invalid += 1;
                continue;
            }
            if existing.iter().any(|s| s.overlaps(&candidate)) {
                debug!(document = %document, start = candidate.start, end = candidate.end, "candidate collides with existing span");
                outcome.collisions += 1;
                continue;
            }
            match self.insert_unlocked(document, candidate, plain_text) {
                Ok(span) => {
                    existing.push(span.clone());
                    outcome.committed.push(span);
                }
                Err(e) => {
                    warn!(document = %document, error = %e, "failed to commit candidate span");
                    outcome.failed += 1;
                }
            }
        }
        Ok(outcome)
    }
}
