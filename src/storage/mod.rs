//! Storage backends
//!
//! The annotation store persists through the `AnnotationRepository` trait.
//! The primary implementation is `SqliteStore`.

mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{AnnotationRepository, OpenStore, SpanFilter, StorageError, StorageResult};
