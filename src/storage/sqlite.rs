//! SQLite storage backend

use super::traits::{AnnotationRepository, OpenStore, SpanFilter, StorageError, StorageResult};
use crate::aggregate::geocode::{Coordinates, GeocodeCache};
use crate::annotation::{Document, DocumentId, LabelVocabulary, Provenance, Relation, RelationId, Span, SpanId};
use crate::text::ContentFormat;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const CUSTOM_LABELS_KEY: &str = "custom_labels";

const SPAN_COLUMNS: &str =
    "id, start_index, end_index, label, text_content, source, confidence, created_at";

/// SQLite-backed annotation store
///
/// One database file holds documents, entity annotations, relation
/// annotations, settings such as the custom labels, and the geocode cache. Thread-safe via an internal mutex on
/// the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

type SpanRow = (String, i64, i64, String, String, String, Option<f64>, String);

impl SqliteStore {
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                content TEXT NOT NULL,
                format TEXT NOT NULL DEFAULT 'auto',
                updated_at TEXT NOT NULL
            );

            -- seq preserves insertion order for spans sharing a start offset
            CREATE TABLE IF NOT EXISTS entity_annotations (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL,
                document_id TEXT NOT NULL,
                start_index INTEGER NOT NULL,
                end_index INTEGER NOT NULL,
                label TEXT NOT NULL,
                text_content TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT 'manual',
                created_at TEXT NOT NULL,
                UNIQUE (document_id, id)
            );

            CREATE INDEX IF NOT EXISTS idx_entities_position
                ON entity_annotations(document_id, start_index);
            CREATE INDEX IF NOT EXISTS idx_entities_label
                ON entity_annotations(document_id, label);

            CREATE TABLE IF NOT EXISTS relation_annotations (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL,
                document_id TEXT NOT NULL,
                entity1_json TEXT NOT NULL,
                entity2_json TEXT NOT NULL,
                relation_name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (document_id, id)
            );

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS location_geocodes (
                name TEXT PRIMARY KEY,
                lng REAL NOT NULL,
                lat REAL NOT NULL,
                matched_name TEXT,
                confidence REAL,
                updated_at TEXT NOT NULL
            );

            PRAGMA journal_mode = WAL;
            "#,
        )?;

        Self::migrate_add_confidence(conn)?;
        Ok(())
    }

    /// Migration: AI confidence column on entity annotations
    ///
    /// Databases created before AI import carry no confidence column; add it
    /// as nullable so existing manual spans read back as `None`.
    fn migrate_add_confidence(conn: &Connection) -> StorageResult<()> {
        let has_confidence: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM pragma_table_info('entity_annotations') WHERE name = 'confidence'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !has_confidence {
            conn.execute("ALTER TABLE entity_annotations ADD COLUMN confidence REAL", [])?;
        }
        Ok(())
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn parse_time(raw: &str) -> StorageResult<DateTime<Utc>> {
        Ok(DateTime::parse_from_rfc3339(raw)
            .map_err(|e| StorageError::DateParse(e.to_string()))?
            .with_timezone(&Utc))
    }

    fn read_span_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SpanRow> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
        ))
    }

    fn row_to_span(row: SpanRow) -> StorageResult<Span> {
        let (id, start, end, label, text, source, confidence, created_at) = row;
        let start = usize::try_from(start).map_err(|_| StorageError::Corrupt(format!("span {id}: start {start}")))?;
        let end = usize::try_from(end).map_err(|_| StorageError::Corrupt(format!("span {id}: end {end}")))?;
        let source = Provenance::parse(&source)
            .ok_or_else(|| StorageError::Corrupt(format!("span {id}: source {source}")))?;
        Ok(Span {
            id: SpanId::from_string(id),
            start,
            end,
            label,
            text,
            source,
            confidence: confidence.map(|c| c as f32),
            created_at: Self::parse_time(&created_at)?,
        })
    }

    fn query_spans(conn: &Connection, sql: &str, params: &[&dyn ToSql]) -> StorageResult<Vec<Span>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::read_span_row)?;
        let mut spans = Vec::new();
        for row in rows {
            spans.push(Self::row_to_span(row?)?);
        }
        Ok(spans)
    }

    fn row_to_relation(
        id: String,
        entity1_json: String,
        entity2_json: String,
        relation_name: String,
        created_at: String,
    ) -> StorageResult<Relation> {
        Ok(Relation {
            id: RelationId::from_string(id),
            entity1: serde_json::from_str(&entity1_json)?,
            entity2: serde_json::from_str(&entity2_json)?,
            relation_name,
            created_at: Self::parse_time(&created_at)?,
        })
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

impl AnnotationRepository for SqliteStore {
    // === Documents ===

    fn save_document(&self, document: &Document) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO documents (id, name, content, format, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                content = excluded.content,
                format = excluded.format,
                updated_at = excluded.updated_at
            "#,
            params![
                document.id.as_str(),
                document.name,
                document.content,
                document.format.as_str(),
                document.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn load_document(&self, id: &DocumentId) -> StorageResult<Option<Document>> {
        let conn = self.conn()?;
        let row: Option<(String, String, String, String, String)> = conn
            .query_row(
                "SELECT id, name, content, format, updated_at FROM documents WHERE id = ?1",
                params![id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .optional()?;

        match row {
            Some((id, name, content, format, updated_at)) => Ok(Some(Document {
                id: DocumentId::from_string(id),
                name,
                content,
                format: ContentFormat::parse(&format).unwrap_or_default(),
                updated_at: Self::parse_time(&updated_at)?,
            })),
            None => Ok(None),
        }
    }

    fn list_documents(&self) -> StorageResult<Vec<DocumentId>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id FROM documents ORDER BY name, id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|r| r.map(DocumentId::from_string))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn delete_document(&self, id: &DocumentId) -> StorageResult<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM entity_annotations WHERE document_id = ?1", params![id.as_str()])?;
        tx.execute("DELETE FROM relation_annotations WHERE document_id = ?1", params![id.as_str()])?;
        let rows = tx.execute("DELETE FROM documents WHERE id = ?1", params![id.as_str()])?;
        tx.commit()?;
        Ok(rows > 0)
    }

    // === Spans ===

    fn insert_span(&self, document: &DocumentId, span: &Span) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO entity_annotations
                (id, document_id, start_index, end_index, label, text_content, source, confidence, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                span.id.as_str(),
                document.as_str(),
                span.start as i64,
                span.end as i64,
                span.label,
                span.text,
                span.source.as_str(),
                span.confidence.map(f64::from),
                span.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn delete_span(&self, document: &DocumentId, id: &SpanId) -> StorageResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM entity_annotations WHERE document_id = ?1 AND id = ?2",
            params![document.as_str(), id.as_str()],
        )?;
        Ok(rows > 0)
    }

    fn list_spans(&self, document: &DocumentId) -> StorageResult<Vec<Span>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {SPAN_COLUMNS} FROM entity_annotations WHERE document_id = ?1 ORDER BY start_index, seq"
        );
        Self::query_spans(&conn, &sql, params![document.as_str()])
    }

    fn find_spans(&self, document: &DocumentId, filter: &SpanFilter) -> StorageResult<Vec<Span>> {
        let conn = self.conn()?;
        let mut sql = format!("SELECT {SPAN_COLUMNS} FROM entity_annotations WHERE document_id = ?");
        let doc = document.as_str().to_string();
        let mut params_vec: Vec<&dyn ToSql> = vec![&doc];

        if let Some(ref label) = filter.label {
            sql.push_str(" AND label = ?");
            params_vec.push(label);
        }
        // instr() is case-sensitive where LIKE is not
        if let Some(ref text) = filter.text_contains {
            sql.push_str(" AND instr(text_content, ?) > 0");
            params_vec.push(text);
        }
        sql.push_str(" ORDER BY start_index, seq");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        Self::query_spans(&conn, &sql, &params_vec)
    }

    fn count_spans_by_label(&self, document: &DocumentId) -> StorageResult<BTreeMap<String, usize>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT label, COUNT(*) FROM entity_annotations WHERE document_id = ?1 GROUP BY label",
        )?;
        let rows = stmt.query_map(params![document.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut counts = BTreeMap::new();
        for row in rows {
            let (label, count) = row?;
            counts.insert(label, count as usize);
        }
        Ok(counts)
    }

    // === Relations ===

    fn insert_relation(&self, document: &DocumentId, relation: &Relation) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO relation_annotations
                (id, document_id, entity1_json, entity2_json, relation_name, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                relation.id.as_str(),
                document.as_str(),
                serde_json::to_string(&relation.entity1)?,
                serde_json::to_string(&relation.entity2)?,
                relation.relation_name,
                relation.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn delete_relation(&self, document: &DocumentId, id: &RelationId) -> StorageResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM relation_annotations WHERE document_id = ?1 AND id = ?2",
            params![document.as_str(), id.as_str()],
        )?;
        Ok(rows > 0)
    }

    fn list_relations(&self, document: &DocumentId) -> StorageResult<Vec<Relation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, entity1_json, entity2_json, relation_name, created_at
             FROM relation_annotations WHERE document_id = ?1 ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![document.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        let mut relations = Vec::new();
        for row in rows {
            let (id, e1, e2, name, created_at) = row?;
            relations.push(Self::row_to_relation(id, e1, e2, name, created_at)?);
        }
        Ok(relations)
    }

    // === Labels ===

    fn load_labels(&self) -> StorageResult<Option<LabelVocabulary>> {
        let conn = self.conn()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![CUSTOM_LABELS_KEY],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(Some(LabelVocabulary::from_json(&json)?)),
            None => Ok(None),
        }
    }

    fn save_labels(&self, labels: &LabelVocabulary) -> StorageResult<()> {
        let json = labels.to_json()?;
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![CUSTOM_LABELS_KEY, json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

impl GeocodeCache for SqliteStore {
    fn get(&self, name: &str) -> StorageResult<Option<Coordinates>> {
        let conn = self.conn()?;
        let coords = conn
            .query_row(
                "SELECT lng, lat, matched_name, confidence FROM location_geocodes WHERE name = ?1",
                params![name.trim()],
                |row| {
                    Ok(Coordinates {
                        lng: row.get(0)?,
                        lat: row.get(1)?,
                        matched_name: row.get(2)?,
                        confidence: row.get::<_, Option<f64>>(3)?.map(|c| c as f32),
                    })
                },
            )
            .optional()?;
        Ok(coords)
    }

    fn set(&self, name: &str, coordinates: &Coordinates) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO location_geocodes (name, lng, lat, matched_name, confidence, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(name) DO UPDATE SET
                lng = excluded.lng,
                lat = excluded.lat,
                matched_name = excluded.matched_name,
                confidence = excluded.confidence,
                updated_at = excluded.updated_at
            "#,
            params![
                name.trim(),
                coordinates.lng,
                coordinates.lat,
                coordinates.matched_name,
                coordinates.confidence.map(f64::from),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn doc() -> DocumentId {
        DocumentId::from_string("doc:lunyu")
    }

    #[test]
    fn test_save_and_load_document() {
        let store = create_test_store();
        let document = Document::new("論語", "<p>學而</p>")
            .with_id("doc:lunyu")
            .with_format(ContentFormat::Html);
        store.save_document(&document).unwrap();

        let loaded = store.load_document(&doc()).unwrap().unwrap();
        assert_eq!(loaded.name, "論語");
        assert_eq!(loaded.format, ContentFormat::Html);
        assert_eq!(loaded.plain_text(), "學而");
        assert_eq!(store.list_documents().unwrap(), vec![doc()]);
    }

    #[test]
    fn test_spans_ordered_by_start_then_insertion() {
        let store = create_test_store();
        store.insert_span(&doc(), &Span::new(5, 7, "place", "魯國")).unwrap();
        store.insert_span(&doc(), &Span::new(0, 2, "person", "孔子")).unwrap();
        store.insert_span(&doc(), &Span::new(0, 1, "other", "孔")).unwrap();

        let spans = store.list_spans(&doc()).unwrap();
        let texts: Vec<_> = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["孔子", "孔", "魯國"]);
    }

    #[test]
    fn test_span_fields_round_trip() {
        let store = create_test_store();
        let span = Span::new(0, 2, "person", "孔子").with_ai_confidence(0.75);
        store.insert_span(&doc(), &span).unwrap();

        let loaded = &store.list_spans(&doc()).unwrap()[0];
        assert_eq!(loaded.id, span.id);
        assert_eq!(loaded.source, Provenance::Ai);
        assert_eq!(loaded.confidence, Some(0.75));
    }

    #[test]
    fn test_find_spans_text_search_is_case_sensitive() {
        let store = create_test_store();
        store.insert_span(&doc(), &Span::new(0, 4, "person", "Confucius")).unwrap();
        store.insert_span(&doc(), &Span::new(5, 9, "place", "Lu state")).unwrap();

        let hits = store.find_spans(&doc(), &SpanFilter::new().with_text("fuc")).unwrap();
        assert_eq!(hits.len(), 1);
        let misses = store.find_spans(&doc(), &SpanFilter::new().with_text("FUC")).unwrap();
        assert!(misses.is_empty());
        let by_label = store.find_spans(&doc(), &SpanFilter::new().with_label("place")).unwrap();
        assert_eq!(by_label[0].text, "Lu state");
    }

    #[test]
    fn test_count_by_label() {
        let store = create_test_store();
        store.insert_span(&doc(), &Span::new(0, 2, "person", "孔子")).unwrap();
        store.insert_span(&doc(), &Span::new(3, 5, "person", "顏回")).unwrap();
        store.insert_span(&doc(), &Span::new(6, 7, "place", "魯")).unwrap();
        store
            .insert_span(&DocumentId::from_string("other"), &Span::new(0, 1, "time", "春"))
            .unwrap();

        let counts = store.count_spans_by_label(&doc()).unwrap();
        assert_eq!(counts.get("person"), Some(&2));
        assert_eq!(counts.get("place"), Some(&1));
        assert_eq!(counts.get("time"), None);
    }

    #[test]
    fn test_delete_span_reports_whether_removed() {
        let store = create_test_store();
        let span = Span::new(0, 2, "person", "孔子");
        store.insert_span(&doc(), &span).unwrap();
        assert!(store.delete_span(&doc(), &span.id).unwrap());
        assert!(!store.delete_span(&doc(), &span.id).unwrap());
    }

    #[test]
    fn test_relation_snapshots_persist() {
        let store = create_test_store();
        let a = Span::new(0, 2, "person", "孔子");
        let b = Span::new(3, 5, "person", "顏回");
        let relation = Relation::new(&a, &b, "師生");
        store.insert_relation(&doc(), &relation).unwrap();

        let loaded = store.list_relations(&doc()).unwrap();
        assert_eq!(loaded, vec![relation.clone()]);
        assert!(store.delete_relation(&doc(), &relation.id).unwrap());
        assert!(store.list_relations(&doc()).unwrap().is_empty());
    }

    #[test]
    fn test_delete_document_removes_annotations() {
        let store = create_test_store();
        store.save_document(&Document::new("論語", "孔子").with_id("doc:lunyu")).unwrap();
        store.insert_span(&doc(), &Span::new(0, 2, "person", "孔子")).unwrap();

        assert!(store.delete_document(&doc()).unwrap());
        assert!(store.list_spans(&doc()).unwrap().is_empty());
        assert!(store.load_document(&doc()).unwrap().is_none());
    }

    #[test]
    fn test_labels_saved_and_replaced() {
        let store = create_test_store();
        assert!(store.load_labels().unwrap().is_none());

        let mut labels = LabelVocabulary::new();
        labels.add_custom("官職").unwrap();
        labels.add_custom("書名").unwrap();
        store.save_labels(&labels).unwrap();
        assert_eq!(store.load_labels().unwrap(), Some(labels.clone()));

        labels.remove_custom("官職", &[]).unwrap();
        store.save_labels(&labels).unwrap();
        let loaded = store.load_labels().unwrap().unwrap();
        let custom: Vec<_> = loaded.iter().filter(|l| l.is_custom).map(|l| l.value.as_str()).collect();
        assert_eq!(custom, vec!["書名"]);
        assert!(loaded.contains("person"));
    }

    #[test]
    fn test_corrupt_labels_surface_as_error() {
        let store = create_test_store();
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO settings (key, value, updated_at) VALUES (?1, 'not json', ?2)",
                params![CUSTOM_LABELS_KEY, Utc::now().to_rfc3339()],
            )
            .unwrap();
        assert!(matches!(store.load_labels(), Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_geocode_cache_upsert() {
        let store = create_test_store();
        assert!(GeocodeCache::get(&store, "洛陽").unwrap().is_none());
        store.set("洛陽", &Coordinates::new(112.45, 34.62)).unwrap();
        store
            .set("洛陽", &Coordinates::new(112.43, 34.66).with_match("洛阳市", 0.8))
            .unwrap();
        let hit = GeocodeCache::get(&store, "洛陽").unwrap().unwrap();
        assert_eq!(hit.lat, 34.66);
        assert_eq!(hit.matched_name.as_deref(), Some("洛阳市"));
    }

    #[test]
    fn test_wal_mode_enabled_at_connection() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("guji.db")).unwrap();
        let journal_mode: String = store
            .conn
            .lock()
            .unwrap()
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(journal_mode, "wal");
    }

    #[test]
    fn test_migration_adds_confidence_to_legacy_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE entity_annotations (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    id TEXT NOT NULL,
                    document_id TEXT NOT NULL,
                    start_index INTEGER NOT NULL,
                    end_index INTEGER NOT NULL,
                    label TEXT NOT NULL,
                    text_content TEXT NOT NULL,
                    source TEXT NOT NULL DEFAULT 'manual',
                    created_at TEXT NOT NULL
                );
                INSERT INTO entity_annotations (id, document_id, start_index, end_index, label, text_content, created_at)
                VALUES ('s1', 'doc:lunyu', 0, 2, 'person', '孔子', '2024-01-01T00:00:00+00:00');",
            )
            .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let spans = store.list_spans(&doc()).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].confidence, None);
        assert_eq!(spans[0].source, Provenance::Manual);
    }

    #[test]
    fn test_reopen_preserves_spans() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("guji.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert_span(&doc(), &Span::new(0, 2, "person", "孔子")).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.list_spans(&doc()).unwrap().len(), 1);
    }
}
