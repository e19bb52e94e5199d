//! Transport-independent API layer.
//!
//! `AnnotationApi` is the single entry point for consumer-facing
//! operations. The CLI (and any future transport) calls `AnnotationApi`
//! methods; it never reaches into the store, importer or deriver directly.

use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::aggregate::{DocumentOverview, EntityAggregator, GeocodeCache, LocatedPlace, PersonLink};
use crate::ai::{
    AiAnnotationImporter, AiError, AnnotationClient, CancellationToken, HttpAnnotationClient,
    ImportError, ImportProgress, ImportReport,
};
use crate::annotation::{
    AnnotationStore, Document, DocumentId, LabelError, LabelInfo, LabelVocabulary, Relation,
    RelationId, Span, SpanId, StoreError,
};
use crate::config::GujiConfig;
use crate::relation::{
    export_file_name, relations_csv, CommitReport, RelationDeriver, RelationError, RelationProposal,
};
use crate::storage::{AnnotationRepository, OpenStore, SpanFilter, SqliteStore, StorageError};
use crate::text::{char_len, locate_selection, segments, Segment};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    #[error("Span not found: {0}")]
    SpanNotFound(SpanId),

    #[error("Unknown label: {0}")]
    UnknownLabel(String),

    #[error("Selection not found in document: {0}")]
    SelectionNotFound(String),

    #[error("No annotation service configured")]
    NoClient,

    #[error("Nothing could be annotated: all {chunks} chunk request(s) failed ({last_error})")]
    NothingAnnotated { chunks: usize, last_error: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Label(#[from] LabelError),

    #[error(transparent)]
    Relation(#[from] RelationError),

    #[error(transparent)]
    Ai(#[from] AiError),
}

impl From<ImportError> for ApiError {
    fn from(e: ImportError) -> Self {
        match e {
            ImportError::NothingAnnotated { chunks, last_error } => {
                ApiError::NothingAnnotated { chunks, last_error }
            }
            ImportError::Store(e) => ApiError::Store(e),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Outcome of a manual add.
///
/// When a span already covers exactly the same range the new span is not
/// written; the caller decides between [`AnnotationApi::replace_span`] and
/// [`AnnotationApi::keep_both`].
#[derive(Debug, Clone, PartialEq)]
pub enum ManualAdd {
    Added(Span),
    Conflict { existing: Span, candidate: Span },
}

/// Single entry point for all consumer-facing operations.
#[derive(Clone)]
pub struct AnnotationApi {
    store: Arc<AnnotationStore>,
    relations: Arc<RelationDeriver>,
    client: Option<Arc<dyn AnnotationClient>>,
    labels: Arc<RwLock<LabelVocabulary>>,
    config: GujiConfig,
}

impl AnnotationApi {
    /// An API over `repository`, starting from the label vocabulary saved
    /// there. An unreadable vocabulary falls back to the built-in labels.
    pub fn new(repository: Arc<dyn AnnotationRepository>) -> Self {
        let labels = match repository.load_labels() {
            Ok(saved) => saved.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "failed to load custom labels, using built-ins");
                LabelVocabulary::new()
            }
        };
        Self {
            store: Arc::new(AnnotationStore::new(repository.clone())),
            relations: Arc::new(RelationDeriver::new(repository)),
            client: None,
            labels: Arc::new(RwLock::new(labels)),
            config: GujiConfig::default(),
        }
    }

    /// An API over an in-memory database.
    pub fn in_memory() -> ApiResult<Self> {
        Ok(Self::new(Arc::new(SqliteStore::open_in_memory()?)))
    }

    /// An API over the SQLite file at `path`, talking to the HTTP
    /// annotation service configured in `config`.
    pub fn open(path: impl AsRef<Path>, config: GujiConfig) -> ApiResult<Self> {
        let repository = Arc::new(SqliteStore::open(path)?);
        let client = HttpAnnotationClient::new(config.ai.base_url.clone()).with_timeout(config.ai.timeout());
        Ok(Self::new(repository).with_config(config).with_client(Arc::new(client)))
    }

    pub fn with_client(mut self, client: Arc<dyn AnnotationClient>) -> Self {
        self.client = Some(client.clone());
        let deriver = RelationDeriver::new(self.store.repository().clone())
            .with_client(client)
            .with_config(self.config.relations.clone());
        self.relations = Arc::new(deriver);
        self
    }

    pub fn with_config(mut self, config: GujiConfig) -> Self {
        let mut deriver = RelationDeriver::new(self.store.repository().clone())
            .with_config(config.relations.clone());
        if let Some(client) = &self.client {
            deriver = deriver.with_client(client.clone());
        }
        self.relations = Arc::new(deriver);
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<AnnotationStore> {
        &self.store
    }

    fn labels(&self) -> RwLockReadGuard<'_, LabelVocabulary> {
        self.labels.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn labels_mut(&self) -> RwLockWriteGuard<'_, LabelVocabulary> {
        self.labels.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // --- Documents ---

    pub fn put_document(&self, document: &Document) -> ApiResult<DocumentId> {
        self.store.repository().save_document(document)?;
        info!(document = %document.id, name = %document.name, "document saved");
        Ok(document.id.clone())
    }

    pub fn document(&self, id: &DocumentId) -> ApiResult<Document> {
        self.store
            .repository()
            .load_document(id)?
            .ok_or_else(|| ApiError::DocumentNotFound(id.clone()))
    }

    pub fn list_documents(&self) -> ApiResult<Vec<Document>> {
        let repository = self.store.repository();
        let mut documents = Vec::new();
        for id in repository.list_documents()? {
            if let Some(document) = repository.load_document(&id)? {
                documents.push(document);
            }
        }
        Ok(documents)
    }

    /// Delete a document together with its spans and relations.
    pub fn delete_document(&self, id: &DocumentId) -> ApiResult<bool> {
        let removed = self.store.delete_document(id)?;
        if removed {
            info!(document = %id, "document deleted");
        }
        Ok(removed)
    }

    /// Plain text of the document's current content
    pub fn plain_text(&self, id: &DocumentId) -> ApiResult<String> {
        Ok(self.document(id)?.plain_text())
    }

    // --- Labels ---

    pub fn labels_snapshot(&self) -> Vec<LabelInfo> {
        self.labels().iter().cloned().collect()
    }

    /// Add a custom label and save the vocabulary. Nothing changes if the
    /// save fails.
    pub fn add_label(&self, value: &str) -> ApiResult<LabelInfo> {
        let mut labels = self.labels_mut();
        let mut next = labels.clone();
        let added = next.add_custom(value)?.clone();
        self.store.repository().save_labels(&next)?;
        *labels = next;
        info!(label = %added.value, "custom label added");
        Ok(added)
    }

    /// Remove a custom label that no span in any document uses.
    pub fn remove_label(&self, value: &str) -> ApiResult<LabelInfo> {
        let repository = self.store.repository();
        let mut spans = Vec::new();
        for id in repository.list_documents()? {
            spans.extend(repository.list_spans(&id)?);
        }
        let mut labels = self.labels_mut();
        let mut next = labels.clone();
        let removed = next.remove_custom(value, &spans)?;
        repository.save_labels(&next)?;
        *labels = next;
        info!(label = %removed.value, "custom label removed");
        Ok(removed)
    }

    fn known_label(&self, raw: &str) -> ApiResult<String> {
        let label = LabelVocabulary::resolve(raw);
        if self.labels().contains(&label) {
            Ok(label)
        } else {
            Err(ApiError::UnknownLabel(raw.trim().to_string()))
        }
    }

    // --- Spans ---

    /// Manually annotate `[start, end)` of the document's plain text.
    pub fn add_span(&self, document: &DocumentId, start: usize, end: usize, label: &str) -> ApiResult<ManualAdd> {
        let plain = self.plain_text(document)?;
        let label = self.known_label(label)?;
        let candidate = Span::over(&plain, start, end, label).ok_or(StoreError::InvalidSpan {
            start,
            end,
            len: char_len(&plain),
        })?;
        if let Some(existing) = self.store.find_exact(document, start, end) {
            return Ok(ManualAdd::Conflict { existing, candidate });
        }
        Ok(ManualAdd::Added(self.store.add(document, candidate, &plain)?))
    }

    /// Manually annotate the first occurrence of `selected` in the plain text.
    pub fn add_selection(&self, document: &DocumentId, selected: &str, label: &str) -> ApiResult<ManualAdd> {
        let plain = self.plain_text(document)?;
        let (start, end) =
            locate_selection(&plain, selected).ok_or_else(|| ApiError::SelectionNotFound(selected.to_string()))?;
        self.add_span(document, start, end, label)
    }

    /// Resolve a conflict by replacing `existing` with `candidate`.
    pub fn replace_span(&self, document: &DocumentId, existing: &SpanId, candidate: Span) -> ApiResult<Span> {
        let plain = self.plain_text(document)?;
        Ok(self.store.update(document, existing, candidate, &plain)?)
    }

    /// Resolve a conflict by storing `candidate` next to the existing span.
    pub fn keep_both(&self, document: &DocumentId, candidate: Span) -> ApiResult<Span> {
        let plain = self.plain_text(document)?;
        Ok(self.store.add(document, candidate, &plain)?)
    }

    /// Change the label of a span. The span is re-created under a new id.
    pub fn relabel_span(&self, document: &DocumentId, id: &SpanId, label: &str) -> ApiResult<Span> {
        let label = self.known_label(label)?;
        let current = self
            .store
            .list(document)
            .into_iter()
            .find(|s| &s.id == id)
            .ok_or_else(|| ApiError::SpanNotFound(id.clone()))?;
        let replacement = Span::new(current.start, current.end, label, current.text);
        self.replace_span(document, id, replacement)
    }

    pub fn delete_span(&self, document: &DocumentId, id: &SpanId) -> ApiResult<bool> {
        Ok(self.store.delete(document, id)?)
    }

    /// Every stored span, including ones the current content invalidates.
    pub fn spans(&self, document: &DocumentId) -> Vec<Span> {
        self.store.list(document)
    }

    /// Spans that fit the document's current plain text.
    pub fn visible_spans(&self, document: &DocumentId) -> ApiResult<Vec<Span>> {
        let plain = self.plain_text(document)?;
        Ok(self.store.list_valid(document, &plain))
    }

    pub fn search_spans(&self, document: &DocumentId, filter: &SpanFilter) -> Vec<Span> {
        self.store.search(document, filter)
    }

    /// Plain text split into annotated and unannotated runs.
    pub fn segments(&self, document: &DocumentId) -> ApiResult<Vec<Segment>> {
        let plain = self.plain_text(document)?;
        let spans = self.store.list(document);
        Ok(segments(&plain, &spans))
    }

    // --- Aggregates ---

    pub fn overview(&self, document: &DocumentId) -> ApiResult<DocumentOverview> {
        let plain = self.plain_text(document)?;
        Ok(EntityAggregator::new(&self.store, document, &plain).overview())
    }

    pub fn unique_texts(&self, document: &DocumentId, label: &str) -> ApiResult<Vec<String>> {
        let plain = self.plain_text(document)?;
        Ok(EntityAggregator::new(&self.store, document, &plain).unique_texts(label))
    }

    pub fn places(&self, document: &DocumentId, cache: &dyn GeocodeCache) -> ApiResult<Vec<LocatedPlace>> {
        let plain = self.plain_text(document)?;
        Ok(EntityAggregator::new(&self.store, document, &plain).locations_with_coordinates(cache))
    }

    pub fn person_network(&self, document: &DocumentId) -> ApiResult<Vec<PersonLink>> {
        let plain = self.plain_text(document)?;
        Ok(EntityAggregator::new(&self.store, document, &plain).person_network())
    }

    // --- AI annotation ---

    fn client(&self) -> ApiResult<Arc<dyn AnnotationClient>> {
        self.client.clone().ok_or(ApiError::NoClient)
    }

    /// Import AI annotations for the whole document.
    pub async fn auto_annotate(
        &self,
        document: &DocumentId,
        cancel: &CancellationToken,
        progress: Option<UnboundedSender<ImportProgress>>,
    ) -> ApiResult<ImportReport> {
        let plain = self.plain_text(document)?;
        let mut importer =
            AiAnnotationImporter::new(self.client()?, self.store.clone()).with_config(self.config.import.clone());
        if let Some(tx) = progress {
            importer = importer.with_progress(tx);
        }
        Ok(importer.import(document, &plain, cancel).await?)
    }

    // --- Relations ---

    /// Relate two stored spans of `document` by id.
    pub fn add_relation(
        &self,
        document: &DocumentId,
        entity1: &SpanId,
        entity2: &SpanId,
        relation_name: &str,
    ) -> ApiResult<Relation> {
        let spans = self.store.list(document);
        let find = |id: &SpanId| {
            spans
                .iter()
                .find(|s| &s.id == id)
                .ok_or_else(|| ApiError::SpanNotFound(id.clone()))
        };
        let (a, b) = (find(entity1)?, find(entity2)?);
        Ok(self.relations.add_relation(document, a, b, relation_name)?)
    }

    pub fn list_relations(&self, document: &DocumentId) -> Vec<Relation> {
        self.relations.list_relations(document)
    }

    pub fn delete_relation(&self, document: &DocumentId, id: &RelationId) -> ApiResult<bool> {
        Ok(self.relations.delete_relation(document, id)?)
    }

    /// Ask the annotation service for relations among the visible spans.
    pub async fn propose_relations(&self, document: &DocumentId) -> ApiResult<Vec<RelationProposal>> {
        if self.client.is_none() {
            return Err(ApiError::NoClient);
        }
        let plain = self.plain_text(document)?;
        let spans = self.store.list_valid(document, &plain);
        Ok(self.relations.propose(&plain, &spans).await?)
    }

    pub fn commit_relations(&self, document: &DocumentId, proposals: Vec<RelationProposal>) -> CommitReport {
        self.relations.commit_proposals(document, proposals)
    }

    /// CSV export of the document's relations with a suggested file name.
    pub fn export_relations(&self, document: &DocumentId) -> ApiResult<(String, String)> {
        let name = self.document(document)?.name;
        let relations = self.relations.list_relations(document);
        Ok((export_file_name(&name), relations_csv(&relations)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockClient;
    use serde_json::json;

    const TEXT: &str = "子曰：學而時習之，不亦說乎？有朋自遠方來，不亦樂乎？";

    fn setup() -> (AnnotationApi, DocumentId) {
        let api = AnnotationApi::in_memory().unwrap();
        let id = api
            .put_document(&Document::new("論語·學而", TEXT).with_id("doc:xueer"))
            .unwrap();
        (api, id)
    }

    fn added(outcome: ManualAdd) -> Span {
        match outcome {
            ManualAdd::Added(span) => span,
            other => panic!("expected Added, got {other:?}"),
        }
    }

    #[test]
    fn manual_add_derives_text() {
        let (api, doc) = setup();
        let span = added(api.add_span(&doc, 0, 1, "人物").unwrap());
        assert_eq!(span.label, "person");
        assert_eq!(span.text, "子");
        assert_eq!(api.spans(&doc), vec![span]);
    }

    #[test]
    fn manual_add_rejects_bad_ranges_and_labels() {
        let (api, doc) = setup();
        assert!(matches!(
            api.add_span(&doc, 5, 5, "person"),
            Err(ApiError::Store(StoreError::InvalidSpan { .. }))
        ));
        assert!(matches!(
            api.add_span(&doc, 0, 999, "person"),
            Err(ApiError::Store(StoreError::InvalidSpan { .. }))
        ));
        assert!(matches!(api.add_span(&doc, 0, 1, "dynasty"), Err(ApiError::UnknownLabel(_))));
        assert!(api.spans(&doc).is_empty());
    }

    #[test]
    fn same_range_offers_replace_or_keep() {
        let (api, doc) = setup();
        let first = added(api.add_span(&doc, 17, 19, "place").unwrap());

        let ManualAdd::Conflict { existing, candidate } = api.add_span(&doc, 17, 19, "concept").unwrap() else {
            panic!("expected conflict");
        };
        assert_eq!(existing, first);
        assert_eq!(api.spans(&doc).len(), 1);

        let replaced = api.replace_span(&doc, &existing.id, candidate.clone()).unwrap();
        assert_ne!(replaced.id, first.id);
        assert_eq!(api.spans(&doc), vec![replaced.clone()]);

        let ManualAdd::Conflict { candidate, .. } = api.add_span(&doc, 17, 19, "place").unwrap() else {
            panic!("expected conflict");
        };
        api.keep_both(&doc, candidate).unwrap();
        assert_eq!(api.spans(&doc).len(), 2);
    }

    #[test]
    fn selection_and_relabel() {
        let (api, doc) = setup();
        let span = added(api.add_selection(&doc, "遠方", "place").unwrap());
        assert_eq!((span.start, span.end), (17, 19));

        let relabeled = api.relabel_span(&doc, &span.id, "concept").unwrap();
        assert_eq!(relabeled.label, "concept");
        assert_eq!(relabeled.text, "遠方");
        assert_ne!(relabeled.id, span.id);

        assert!(matches!(
            api.add_selection(&doc, "孟子", "person"),
            Err(ApiError::SelectionNotFound(_))
        ));
        assert!(matches!(
            api.relabel_span(&doc, &SpanId::from_string("missing"), "person"),
            Err(ApiError::SpanNotFound(_))
        ));
    }

    #[test]
    fn custom_label_lifecycle() {
        let (api, doc) = setup();
        api.add_label("官職").unwrap();
        let span = added(api.add_span(&doc, 0, 1, "官職").unwrap());

        assert!(matches!(
            api.remove_label("官職"),
            Err(ApiError::Label(LabelError::InUse { count: 1, .. }))
        ));
        api.delete_span(&doc, &span.id).unwrap();
        assert_eq!(api.remove_label("官職").unwrap().value, "官職");
    }

    #[test]
    fn custom_labels_are_saved_with_the_repository() {
        let repository: Arc<dyn AnnotationRepository> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let api = AnnotationApi::new(repository.clone());
        api.add_label("官職").unwrap();
        api.add_label("書名").unwrap();
        api.remove_label("書名").unwrap();

        let fresh = AnnotationApi::new(repository);
        let custom: Vec<_> = fresh
            .labels_snapshot()
            .into_iter()
            .filter(|l| l.is_custom)
            .map(|l| l.value)
            .collect();
        assert_eq!(custom, vec!["官職".to_string()]);
    }

    #[test]
    fn rejected_label_change_saves_nothing() {
        let (api, _) = setup();
        assert!(matches!(api.add_label("person"), Err(ApiError::Label(LabelError::Duplicate(_)))));
        assert!(matches!(api.remove_label("time"), Err(ApiError::Label(LabelError::BuiltIn(_)))));
        assert!(api.store().repository().load_labels().unwrap().is_none());
    }

    #[test]
    fn delete_document_removes_its_annotations() {
        let (api, doc) = setup();
        let a = added(api.add_span(&doc, 0, 1, "person").unwrap());
        let b = added(api.add_span(&doc, 15, 16, "person").unwrap());
        api.add_relation(&doc, &a.id, &b.id, "師友").unwrap();

        assert!(api.delete_document(&doc).unwrap());
        assert!(matches!(api.document(&doc), Err(ApiError::DocumentNotFound(_))));
        assert!(api.spans(&doc).is_empty());
        assert!(api.list_relations(&doc).is_empty());
        assert!(!api.delete_document(&doc).unwrap());
    }

    #[test]
    fn missing_document_is_reported() {
        let api = AnnotationApi::in_memory().unwrap();
        let missing = DocumentId::from_string("nope");
        assert!(matches!(api.add_span(&missing, 0, 1, "person"), Err(ApiError::DocumentNotFound(_))));
        assert!(api.spans(&missing).is_empty());
    }

    #[tokio::test]
    async fn auto_annotate_without_client() {
        let (api, doc) = setup();
        let result = api.auto_annotate(&doc, &CancellationToken::new(), None).await;
        assert!(matches!(result, Err(ApiError::NoClient)));
    }

    #[tokio::test]
    async fn auto_annotate_reports_nothing_annotated() {
        let (api, doc) = setup();
        let api = api.with_client(Arc::new(MockClient::available().with_annotation_failure("子曰")));
        let result = api.auto_annotate(&doc, &CancellationToken::new(), None).await;
        assert!(matches!(result, Err(ApiError::NothingAnnotated { chunks: 1, .. })));
    }

    #[tokio::test]
    async fn auto_annotate_then_propose_relations() {
        let (api, doc) = setup();
        let client = MockClient::available()
            .with_default_annotations(json!([
                {"start": 17, "end": 19, "label": "地名", "text": "遠方"},
                {"start": 14, "end": 15, "label": "人物", "text": "有"}
            ]))
            .with_answer(r#"```json
{"relations": [{"entity1Index": 0, "entity2Index": 1, "relationName": "來自"}]}
```"#);
        let api = api.with_client(Arc::new(client));
        let person = added(api.add_span(&doc, 15, 16, "person").unwrap());

        let report = api.auto_annotate(&doc, &CancellationToken::new(), None).await.unwrap();
        // The single-character candidate is dropped; 遠方 is committed.
        assert_eq!(report.committed.len(), 1);
        assert_eq!(report.committed[0].label, "place");

        let proposals = api.propose_relations(&doc).await.unwrap();
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].entity1.id, person.id);

        let committed = api.commit_relations(&doc, proposals);
        assert_eq!(committed.committed.len(), 1);

        let (file, csv) = api.export_relations(&doc).unwrap();
        assert!(file.ends_with(".csv"));
        assert!(csv.contains("來自"));
    }

    #[test]
    fn relation_by_span_ids() {
        let (api, doc) = setup();
        let a = added(api.add_span(&doc, 0, 1, "person").unwrap());
        let b = added(api.add_span(&doc, 15, 16, "person").unwrap());

        let relation = api.add_relation(&doc, &a.id, &b.id, "師友").unwrap();
        assert_eq!(api.list_relations(&doc), vec![relation.clone()]);
        assert!(matches!(
            api.add_relation(&doc, &a.id, &a.id, "自己"),
            Err(ApiError::Relation(RelationError::SelfReference))
        ));
        assert!(api.delete_relation(&doc, &relation.id).unwrap());
        assert!(api.list_relations(&doc).is_empty());
    }
}
