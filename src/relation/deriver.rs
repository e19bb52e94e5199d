//! Relation deriver: named, directed links between entity spans
//!
//! Relations snapshot their two spans at creation time and are never
//! reconciled with later span edits or deletions.

use crate::ai::client::{AiError, AnnotationClient};
use crate::ai::payload::{parse_relations, RelationTriple};
use crate::ai::prompt::{context_excerpt, relation_question, DEFAULT_MAX_CONTEXT_CHARS};
use crate::annotation::{DocumentId, Relation, RelationId, Span};
use crate::storage::{AnnotationRepository, StorageError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum RelationError {
    #[error("An entity cannot be related to itself")]
    SelfReference,

    #[error("Relation name must not be empty")]
    EmptyName,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationConfig {
    pub model: String,
    /// Document characters sent as context with a proposal request
    pub max_context_chars: usize,
}

impl Default for RelationConfig {
    fn default() -> Self {
        Self {
            model: "xunzi-qwen2".to_string(),
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
        }
    }
}

/// A validated AI suggestion, resolved to concrete spans
#[derive(Debug, Clone, PartialEq)]
pub struct RelationProposal {
    pub entity1: Span,
    pub entity2: Span,
    pub relation_name: String,
}

/// Result of committing proposals one by one
#[derive(Debug, Default)]
pub struct CommitReport {
    pub committed: Vec<Relation>,
    pub failed: Vec<(RelationProposal, RelationError)>,
}

/// Keep triples whose indices are distinct and in range and whose name is
/// non-blank, dropping repeats of the same `(entity1, entity2, name)`.
pub fn validate_proposals(triples: Vec<RelationTriple>, spans: &[Span]) -> Vec<RelationProposal> {
    let mut seen = HashSet::new();
    let mut proposals = Vec::new();
    let in_range = |i: i64| usize::try_from(i).ok().filter(|i| *i < spans.len());

    for triple in triples {
        let name = triple.relation_name.trim().to_string();
        let (Some(i1), Some(i2)) = (in_range(triple.entity1_index), in_range(triple.entity2_index)) else {
            debug!(?triple, entities = spans.len(), "relation proposal index out of range");
            continue;
        };
        if i1 == i2 || name.is_empty() {
            debug!(?triple, "relation proposal rejected");
            continue;
        }
        if !seen.insert((i1, i2, name.clone())) {
            continue;
        }
        proposals.push(RelationProposal {
            entity1: spans[i1].clone(),
            entity2: spans[i2].clone(),
            relation_name: name,
        });
    }
    proposals
}

pub struct RelationDeriver {
    repository: Arc<dyn AnnotationRepository>,
    client: Option<Arc<dyn AnnotationClient>>,
    config: RelationConfig,
}

impl RelationDeriver {
    pub fn new(repository: Arc<dyn AnnotationRepository>) -> Self {
        Self {
            repository,
            client: None,
            config: RelationConfig::default(),
        }
    }

    pub fn with_client(mut self, client: Arc<dyn AnnotationClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_config(mut self, config: RelationConfig) -> Self {
        self.config = config;
        self
    }

    /// Store a relation `entity1 → entity2` named `relation_name`.
    ///
    /// Rejects a span related to itself and a blank name; nothing is written
    /// in either case.
    pub fn add_relation(
        &self,
        document: &DocumentId,
        entity1: &Span,
        entity2: &Span,
        relation_name: &str,
    ) -> Result<Relation, RelationError> {
        if entity1.id == entity2.id {
            return Err(RelationError::SelfReference);
        }
        let name = relation_name.trim();
        if name.is_empty() {
            return Err(RelationError::EmptyName);
        }
        let relation = Relation::new(entity1, entity2, name);
        self.repository.insert_relation(document, &relation)?;
        Ok(relation)
    }

    pub fn delete_relation(&self, document: &DocumentId, id: &RelationId) -> Result<bool, RelationError> {
        Ok(self.repository.delete_relation(document, id)?)
    }

    /// All relations of a document in creation order; a failed read yields
    /// an empty list.
    pub fn list_relations(&self, document: &DocumentId) -> Vec<Relation> {
        self.repository.list_relations(document).unwrap_or_else(|e| {
            warn!(document = %document, error = %e, "relation list unavailable");
            Vec::new()
        })
    }

    /// Ask the annotation service to relate `spans` to each other.
    ///
    /// Fewer than two spans means nothing to relate and makes no request.
    pub async fn propose(&self, plain_text: &str, spans: &[Span]) -> Result<Vec<RelationProposal>, AiError> {
        if spans.len() < 2 {
            return Ok(Vec::new());
        }
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| AiError::Unavailable("no annotation client configured".to_string()))?;

        let excerpt = context_excerpt(plain_text, self.config.max_context_chars);
        let answer = client
            .ask(&excerpt, &relation_question(spans), &self.config.model)
            .await?;
        let triples = parse_relations(&answer);
        let received = triples.len();
        let proposals = validate_proposals(triples, spans);
        info!(received, accepted = proposals.len(), "relation proposals decoded");
        Ok(proposals)
    }

    /// Commit proposals in order through [`Self::add_relation`]. Failures are
    /// collected, not rolled back.
    pub fn commit_proposals(&self, document: &DocumentId, proposals: Vec<RelationProposal>) -> CommitReport {
        let mut report = CommitReport::default();
        for proposal in proposals {
            match self.add_relation(document, &proposal.entity1, &proposal.entity2, &proposal.relation_name) {
                Ok(relation) => report.committed.push(relation),
                Err(e) => {
                    warn!(document = %document, error = %e, "relation proposal not committed");
                    report.failed.push((proposal, e));
                }
            }
        }
        report
    }
}
