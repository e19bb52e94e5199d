//! Store and API setup shared by the integration tests

use guji::{AnnotationApi, AnnotationStore, Document, DocumentId, OpenStore, SqliteStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

/// A file-backed SQLite store in a fresh temporary directory.
///
/// Keep the `TempDir` alive for as long as the store is used.
pub fn temp_sqlite() -> (TempDir, Arc<SqliteStore>) {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::open(dir.path().join("guji.db")).unwrap();
    (dir, Arc::new(store))
}

pub fn reopen(dir: &TempDir) -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open(dir.path().join("guji.db")).unwrap())
}

pub fn memory_store() -> Arc<AnnotationStore> {
    Arc::new(AnnotationStore::in_memory().unwrap())
}

/// An in-memory API holding one plain-text document.
pub fn api_with_document(id: &str, text: &str) -> (AnnotationApi, DocumentId) {
    let api = AnnotationApi::in_memory().unwrap();
    let doc = api.put_document(&Document::new(id, text).with_id(id)).unwrap();
    (api, doc)
}

/// An AI candidate as the annotation service returns it.
pub fn candidate(start: usize, end: usize, label: &str, text: &str) -> Value {
    json!({"start": start, "end": end, "label": label, "text": text})
}
