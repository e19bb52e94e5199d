//! AI annotation import
//!
//! Sends a document's plain text to the annotation service chunk by chunk
//! and merges the returned candidates into the annotation store:
//!
//! 1. chunk the plain text (single chunk below the threshold)
//! 2. re-anchor each candidate from chunk-relative to global offsets
//! 3. drop exact duplicates across the whole batch
//! 4. drop unusable candidates and rewrite text from the plain text
//! 5. commit what does not overlap a span already in the store
//!
//! Merging happens after every chunk, so a cancelled import keeps the spans
//! of the chunks it finished.

use super::cancel::CancellationToken;
use super::client::AnnotationClient;
use super::payload::{parse_candidates, RawCandidate};
use crate::annotation::{validate_range, AnnotationStore, DocumentId, LabelVocabulary, Span, StoreError};
use crate::text::chunker::{Chunker, ChunkerConfig, TextChunk};
use crate::text::offsets::{char_len, char_slice, find_all};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

static PUNCTUATION_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\p{P}\p{S}\s]+$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Texts longer than this many characters are chunked
    pub chunk_threshold: usize,
    pub chunker: ChunkerConfig,
    pub model: String,
    /// Confidence recorded when the service reports none
    pub default_confidence: f32,
    /// Pause between chunk requests
    pub chunk_pause_ms: u64,
    /// Place candidates that carry text but no offsets at every occurrence
    /// of their text in the chunk
    pub anchor_unplaced: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            chunk_threshold: 500,
            chunker: ChunkerConfig::default(),
            model: "xunzi-qwen2".to_string(),
            default_confidence: 0.8,
            chunk_pause_ms: 200,
            anchor_unplaced: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("nothing could be annotated: all {chunks} chunk request(s) failed ({last_error})")]
    NothingAnnotated { chunks: usize, last_error: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportOutcome {
    Completed,
    Cancelled,
}

/// Emitted after each chunk. Both counters only grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportProgress {
    pub chunks_done: usize,
    pub chunks_total: usize,
    pub spans_committed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub outcome: ImportOutcome,
    pub chunks_total: usize,
    pub chunks_processed: usize,
    pub chunks_failed: usize,
    pub candidates_received: usize,
    pub duplicates: usize,
    pub invalid: usize,
    pub collisions: usize,
    pub write_failures: usize,
    pub committed: Vec<Span>,
}

impl ImportReport {
    fn new(chunks_total: usize) -> Self {
        Self {
            outcome: ImportOutcome::Completed,
            chunks_total,
            chunks_processed: 0,
            chunks_failed: 0,
            candidates_received: 0,
            duplicates: 0,
            invalid: 0,
            collisions: 0,
            write_failures: 0,
            committed: Vec::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.outcome == ImportOutcome::Cancelled
    }

    pub fn summary(&self) -> String {
        let mut line = format!(
            "annotated {} entities from {}/{} chunks",
            self.committed.len(),
            self.chunks_processed,
            self.chunks_total
        );
        if self.chunks_failed > 0 {
            line.push_str(&format!(", {} chunk(s) failed", self.chunks_failed));
        }
        if self.is_cancelled() {
            line.push_str(" (cancelled)");
        }
        line
    }
}

/// Shift chunk-relative offsets by `chunk_start`.
///
/// Negative offsets are malformed and become missing rather than being
/// shifted into range. So do offsets that overflow once shifted.
pub fn reanchor(candidates: Vec<RawCandidate>, chunk_start: usize) -> Vec<RawCandidate> {
    let shift = chunk_start as i64;
    candidates
        .into_iter()
        .map(|mut c| {
            c.start = c.start.filter(|s| *s >= 0).and_then(|s| s.checked_add(shift));
            c.end = c.end.filter(|e| *e >= 0).and_then(|e| e.checked_add(shift));
            c
        })
        .collect()
}

/// Give offset-less candidates the ranges where their text occurs in
/// `chunk_text`.
pub fn anchor_unplaced(candidates: Vec<RawCandidate>, chunk_text: &str) -> Vec<RawCandidate> {
    let mut out = Vec::with_capacity(candidates.len());
    for c in candidates {
        match (&c.text, c.has_offsets()) {
            (Some(text), false) => {
                for (start, end) in find_all(chunk_text, text) {
                    out.push(RawCandidate {
                        start: Some(start as i64),
                        end: Some(end as i64),
                        ..c.clone()
                    });
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Turn a global-offset candidate into an AI span over `plain_text`.
///
/// Returns `None` for ranges outside the text and for text that is blank,
/// a single character, or only punctuation.
pub fn clean_candidate(candidate: &RawCandidate, plain_text: &str, default_confidence: f32) -> Option<Span> {
    if !validate_range(candidate.start, candidate.end, char_len(plain_text)) {
        return None;
    }
    let start = usize::try_from(candidate.start?).ok()?;
    let end = usize::try_from(candidate.end?).ok()?;
    let text = char_slice(plain_text, start, end)?;
    let trimmed = text.trim();
    if trimmed.chars().count() <= 1 || PUNCTUATION_ONLY.is_match(trimmed) {
        return None;
    }
    let label = LabelVocabulary::resolve(candidate.label.as_deref().unwrap_or_default());
    let confidence = candidate.confidence.unwrap_or(default_confidence);
    Some(Span::new(start, end, label, text).with_ai_confidence(confidence))
}

type CandidateKey = (Option<i64>, Option<i64>, Option<String>, Option<String>);

pub struct AiAnnotationImporter {
    client: Arc<dyn AnnotationClient>,
    store: Arc<AnnotationStore>,
    config: ImportConfig,
    progress: Option<UnboundedSender<ImportProgress>>,
}

impl AiAnnotationImporter {
    pub fn new(client: Arc<dyn AnnotationClient>, store: Arc<AnnotationStore>) -> Self {
        Self {
            client,
            store,
            config: ImportConfig::default(),
            progress: None,
        }
    }

    pub fn with_config(mut self, config: ImportConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_progress(mut self, progress: UnboundedSender<ImportProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// The chunks an import of `plain_text` would send.
    pub fn plan(&self, plain_text: &str) -> Vec<TextChunk> {
        let len = char_len(plain_text);
        if len == 0 {
            return Vec::new();
        }
        if len <= self.config.chunk_threshold {
            return vec![TextChunk {
                index: 0,
                start: 0,
                end: len,
                text: plain_text.to_string(),
            }];
        }
        Chunker::new(self.config.chunker.clone()).chunk(plain_text)
    }

    fn emit(&self, progress: ImportProgress) {
        if let Some(tx) = &self.progress {
            // A dropped receiver only means nobody is watching.
            let _ = tx.send(progress);
        }
    }

    /// Run an import of `plain_text` into `document`.
    ///
    /// Fails with [`ImportError::NothingAnnotated`] when every chunk request
    /// failed, and with [`ImportError::Store`] when the store cannot be read
    /// for the collision check.
    pub async fn import(
        &self,
        document: &DocumentId,
        plain_text: &str,
        cancel: &CancellationToken,
    ) -> Result<ImportReport, ImportError> {
        let chunks = self.plan(plain_text);
        let mut report = ImportReport::new(chunks.len());
        let mut seen: HashSet<CandidateKey> = HashSet::new();
        let mut last_error = String::new();
        let pause = Duration::from_millis(self.config.chunk_pause_ms);

        info!(document = %document, chunks = chunks.len(), model = %self.config.model, "AI import started");

        for chunk in &chunks {
            if chunk.index > 0 && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            } else {
                tokio::task::yield_now().await;
            }
            if cancel.is_cancelled() {
                report.outcome = ImportOutcome::Cancelled;
                info!(document = %document, chunk = chunk.index, "AI import cancelled");
                break;
            }

            match self.client.annotate(&chunk.text, &self.config.model).await {
                Err(e) => {
                    warn!(document = %document, chunk = chunk.index, error = %e, "chunk annotation failed");
                    report.chunks_failed += 1;
                    last_error = e.to_string();
                }
                Ok(response) => {
                    let mut raw = parse_candidates(&response);
                    report.candidates_received += raw.len();
                    if self.config.anchor_unplaced {
                        raw = anchor_unplaced(raw, &chunk.text);
                    }

                    let mut batch = Vec::new();
                    for candidate in reanchor(raw, chunk.start) {
                        let key = (
                            candidate.start,
                            candidate.end,
                            candidate.label.clone(),
                            candidate.text.clone(),
                        );
                        if !seen.insert(key) {
                            report.duplicates += 1;
                            continue;
                        }
                        match clean_candidate(&candidate, plain_text, self.config.default_confidence) {
                            Some(span) => batch.push(span),
                            None => {
                                debug!(chunk = chunk.index, start = ?candidate.start, end = ?candidate.end, "candidate dropped");
                                report.invalid += 1;
                            }
                        }
                    }
                    batch.sort_by_key(|s| (s.start, s.end));

                    let merged = self.store.merge_batch(document, batch, plain_text)?;
                    report.collisions += merged.collisions;
                    report.invalid += merged.invalid;
                    report.write_failures += merged.failed;
                    report.committed.extend(merged.committed);
                }
            }

            report.chunks_processed += 1;
            self.emit(ImportProgress {
                chunks_done: report.chunks_processed,
                chunks_total: report.chunks_total,
                spans_committed: report.committed.len(),
            });
        }

        if report.chunks_processed > 0 && report.chunks_failed == report.chunks_total {
            return Err(ImportError::NothingAnnotated {
                chunks: report.chunks_failed,
                last_error,
            });
        }

        info!(document = %document, summary = %report.summary(), "AI import finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::client::{AiError, MockClient};
    use crate::annotation::Provenance;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TEXT: &str = "晉侯使韓宣子來聘，且告為政而來見，禮也。";

    fn doc() -> DocumentId {
        DocumentId::from_string("doc:zuozhuan")
    }

    fn fast_config() -> ImportConfig {
        ImportConfig {
            chunk_pause_ms: 0,
            ..ImportConfig::default()
        }
    }

    fn importer(client: impl AnnotationClient + 'static) -> (AiAnnotationImporter, Arc<AnnotationStore>) {
        let store = Arc::new(AnnotationStore::in_memory().unwrap());
        let importer = AiAnnotationImporter::new(Arc::new(client), Arc::clone(&store)).with_config(fast_config());
        (importer, store)
    }

    fn raw(start: i64, end: i64) -> RawCandidate {
        RawCandidate {
            start: Some(start),
            end: Some(end),
            ..RawCandidate::default()
        }
    }

    #[test]
    fn reanchor_adds_chunk_start() {
        let shifted = reanchor(vec![raw(3, 5), raw(-1, 2)], 400);
        assert_eq!((shifted[0].start, shifted[0].end), (Some(403), Some(405)));
        assert_eq!(shifted[1].start, None);
        assert_eq!(shifted[1].end, Some(402));
    }

    #[test]
    fn reanchor_overflow_becomes_missing() {
        let shifted = reanchor(vec![raw(i64::MAX - 1, i64::MAX)], 400);
        assert_eq!((shifted[0].start, shifted[0].end), (None, None));

        let first_chunk = reanchor(vec![raw(i64::MAX - 1, i64::MAX)], 0);
        assert_eq!(first_chunk[0].start, Some(i64::MAX - 1));
    }

    #[test]
    fn clean_drops_unusable_ranges() {
        let text = "子曰：「學而時習之。」";
        assert!(clean_candidate(&raw(0, 2), text, 0.8).is_some());
        assert!(clean_candidate(&raw(0, 1), text, 0.8).is_none(), "single character");
        assert!(clean_candidate(&raw(2, 4), text, 0.8).is_none(), "punctuation only");
        assert!(clean_candidate(&raw(4, 30), text, 0.8).is_none(), "past the end");
        assert!(clean_candidate(&RawCandidate::default(), text, 0.8).is_none(), "no offsets");
    }

    #[test]
    fn clean_derives_text_and_defaults() {
        let candidate = RawCandidate {
            text: Some("garbage".into()),
            label: Some("人物".into()),
            ..raw(3, 6)
        };
        let span = clean_candidate(&candidate, TEXT, 0.8).unwrap();
        assert_eq!(span.text, "韓宣子");
        assert_eq!(span.label, "person");
        assert_eq!(span.source, Provenance::Ai);
        assert_eq!(span.confidence, Some(0.8));

        let unlabeled = clean_candidate(&raw(0, 2), TEXT, 0.8).unwrap();
        assert_eq!(unlabeled.label, "other");
    }

    #[test]
    fn anchor_unplaced_uses_every_occurrence() {
        let candidate = RawCandidate {
            text: Some("來".into()),
            ..RawCandidate::default()
        };
        let placed = anchor_unplaced(vec![candidate, raw(0, 2)], TEXT);
        let ranges: Vec<_> = placed.iter().map(|c| (c.start, c.end)).collect();
        assert_eq!(ranges, vec![(Some(6), Some(7)), (Some(14), Some(15)), (Some(0), Some(2))]);
    }

    #[test]
    fn plan_short_text_is_one_chunk() {
        let (importer, _) = importer(MockClient::available());
        let plan = importer.plan(TEXT);
        assert_eq!(plan.len(), 1);
        assert_eq!((plan[0].start, plan[0].end), (0, char_len(TEXT)));
        assert!(importer.plan("").is_empty());
    }

    #[tokio::test]
    async fn import_commits_cleaned_candidates() {
        let client = MockClient::available().with_default_annotations(json!({
            "annotations": [
                {"start": 0, "end": 2, "label": "人物"},
                {"start": 3, "end": 6, "label": "人物", "confidence": 0.95},
                {"start": 3, "end": 6, "label": "人物", "confidence": 0.95},
                {"start": 8, "end": 9, "label": "其他"},
                {"start": 30, "end": 40, "label": "地名"}
            ]
        }));
        let (importer, store) = importer(client);

        let report = importer.import(&doc(), TEXT, &CancellationToken::new()).await.unwrap();

        assert_eq!(report.outcome, ImportOutcome::Completed);
        assert_eq!(report.candidates_received, 5);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.invalid, 2);
        let texts: Vec<_> = store.list(&doc()).iter().map(|s| s.text.clone()).collect();
        assert_eq!(texts, vec!["晉侯", "韓宣子"]);
        assert_eq!(store.list(&doc())[1].confidence, Some(0.95));
    }

    #[tokio::test]
    async fn import_never_overlaps_existing_spans() {
        let client = MockClient::available().with_default_annotations(json!([
            {"start": 3, "end": 6, "label": "人物"},
            {"start": 12, "end": 14, "label": "概念"}
        ]));
        let (importer, store) = importer(client);
        store.add(&doc(), Span::new(4, 6, "person", ""), TEXT).unwrap();

        let report = importer.import(&doc(), TEXT, &CancellationToken::new()).await.unwrap();

        assert_eq!(report.collisions, 1);
        let spans = store.list(&doc());
        assert_eq!(spans.len(), 2);
        assert!(spans.iter().any(|s| s.source == Provenance::Manual && s.start == 4));
        assert!(!spans.iter().any(|s| s.source == Provenance::Ai && s.start == 3));
    }

    #[tokio::test]
    async fn repeated_import_is_idempotent() {
        let client = MockClient::available().with_default_annotations(json!([
            {"start": 0, "end": 2, "label": "人物"},
            {"start": 3, "end": 6, "label": "人物"}
        ]));
        let (importer, store) = importer(client);
        let cancel = CancellationToken::new();

        importer.import(&doc(), TEXT, &cancel).await.unwrap();
        let first: Vec<_> = store.list(&doc()).iter().map(|s| (s.start, s.end)).collect();
        let second = importer.import(&doc(), TEXT, &cancel).await.unwrap();

        assert!(second.committed.is_empty());
        let after: Vec<_> = store.list(&doc()).iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(first, after);
    }

    #[tokio::test]
    async fn malformed_response_contributes_nothing() {
        let client = MockClient::available().with_default_annotations(json!({"error": "model overloaded"}));
        let (importer, store) = importer(client);
        let report = importer.import(&doc(), TEXT, &CancellationToken::new()).await.unwrap();
        assert_eq!(report.candidates_received, 0);
        assert!(store.list(&doc()).is_empty());
    }

    #[tokio::test]
    async fn all_chunks_failing_is_an_error() {
        let (importer, _) = importer(MockClient::available());
        let err = importer.import(&doc(), TEXT, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ImportError::NothingAnnotated { chunks: 1, .. }));
    }

    #[tokio::test]
    async fn precancelled_import_does_nothing() {
        let client = MockClient::available().with_default_annotations(json!([{"start": 0, "end": 2}]));
        let (importer, store) = importer(client);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = importer.import(&doc(), TEXT, &cancel).await.unwrap();
        assert!(report.is_cancelled());
        assert_eq!(report.chunks_processed, 0);
        assert!(store.list(&doc()).is_empty());
    }

    /// Answers like its inner mock, cancelling the token after `after` calls.
    struct CancelAfter {
        inner: MockClient,
        token: CancellationToken,
        after: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AnnotationClient for CancelAfter {
        async fn is_available(&self) -> bool {
            true
        }

        async fn annotate(&self, text: &str, model: &str) -> Result<Value, AiError> {
            let response = self.inner.annotate(text, model).await;
            if self.calls.fetch_add(1, Ordering::SeqCst) + 1 >= self.after {
                self.token.cancel();
            }
            response
        }

        async fn ask(&self, text: &str, question: &str, model: &str) -> Result<String, AiError> {
            self.inner.ask(text, question, model).await
        }
    }

    #[tokio::test]
    async fn cancellation_keeps_finished_chunks() {
        let text: String = "天地玄黃宇宙洪荒日月盈昃".chars().cycle().take(1200).collect();
        let token = CancellationToken::new();
        let client = CancelAfter {
            inner: MockClient::available().with_default_annotations(json!([{"start": 10, "end": 14, "label": "概念"}])),
            token: token.clone(),
            after: 1,
            calls: AtomicUsize::new(0),
        };
        let (importer, store) = importer(client);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let importer = importer.with_progress(tx);

        let report = importer.import(&doc(), &text, &token).await.unwrap();

        assert!(report.is_cancelled());
        assert_eq!(report.chunks_total, 3);
        assert_eq!(report.chunks_processed, 1);
        assert_eq!(store.list(&doc()).len(), 1);

        let progress = rx.recv().await.unwrap();
        assert_eq!(progress.chunks_done, 1);
        assert_eq!(progress.spans_committed, 1);
        assert!(rx.try_recv().is_err());
    }
}
