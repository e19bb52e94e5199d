//! Guji: entity and relation annotation for classical Chinese texts
//!
//! Keeps character-offset entity annotations consistent with a document's
//! plain text while they are created by hand, imported from an AI
//! annotation service, linked by relations and aggregated for display.
//!
//! # Core Concepts
//!
//! - **Plain text**: the normalized form of a document; every offset counts
//!   its `char`s
//! - **Span**: a labeled `[start, end)` range over the plain text
//! - **Relation**: a named, directed link between two span snapshots
//! - **Import**: chunked AI annotation merged without overlapping existing spans
//!
//! # Example
//!
//! ```
//! use guji::{AnnotationStore, DocumentId, Span};
//!
//! let store = AnnotationStore::in_memory().unwrap();
//! let doc = DocumentId::from_string("doc:1");
//! let plain = "甲子年，张三往洛阳。";
//! store.add(&doc, Span::new(0, 2, "time", "甲子"), plain).unwrap();
//! assert_eq!(store.count_by_label(&doc).get("time"), Some(&1));
//! ```

pub mod aggregate;
pub mod ai;
pub mod annotation;
pub mod api;
pub mod config;
pub mod relation;
pub mod storage;
pub mod text;

pub use aggregate::{Coordinates, DocumentOverview, EntityAggregator, GeocodeCache, MemoryGeocodeCache, PersonLink};
pub use ai::{
    AiAnnotationImporter, AiError, AnnotationClient, CancellationToken, HttpAnnotationClient, ImportConfig,
    ImportError, ImportOutcome, ImportProgress, ImportReport, MockClient,
};
pub use annotation::{
    AnnotationStore, Document, DocumentId, LabelError, LabelVocabulary, Provenance, Relation, RelationId, Span,
    SpanId, StoreError, StoreResult,
};
pub use api::{AnnotationApi, ApiError, ApiResult, ManualAdd};
pub use config::{ConfigError, GujiConfig};
pub use relation::{RelationConfig, RelationDeriver, RelationError, RelationProposal};
pub use storage::{AnnotationRepository, OpenStore, SpanFilter, SqliteStore, StorageError, StorageResult};
pub use text::{to_plain_text, Chunker, ChunkerConfig, ContentFormat, TextChunk};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
