//! Annotation data model and the per-document annotation store
//!
//! - **Span**: a labeled character range over a document's plain text
//! - **Relation**: a named link between two entity snapshots
//! - **AnnotationStore**: ordered span sets, persisted through a repository

pub mod document;
pub mod label;
pub mod relation;
pub mod span;
pub mod store;

pub use document::{Document, DocumentId};
pub use label::{builtin, LabelError, LabelInfo, LabelVocabulary};
pub use relation::{EntitySnapshot, Relation, RelationId};
pub use span::{derive_text, refresh_text, validate, validate_range, Provenance, Span, SpanId};
pub use store::{AnnotationStore, MergeOutcome, StoreError, StoreResult};
