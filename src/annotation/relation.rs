//! Relation: a named, directed link between two entity snapshots

use super::span::{Span, SpanId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a relation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationId(String);

impl RelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Copy of an entity span taken when a relation is created.
///
/// Later edits or deletions of the span do not touch the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub span_id: SpanId,
    pub label: String,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl From<&Span> for EntitySnapshot {
    fn from(span: &Span) -> Self {
        Self {
            span_id: span.id.clone(),
            label: span.label.clone(),
            text: span.text.clone(),
            start: span.start,
            end: span.end,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: RelationId,
    pub entity1: EntitySnapshot,
    pub entity2: EntitySnapshot,
    pub relation_name: String,
    pub created_at: DateTime<Utc>,
}

impl Relation {
    pub fn new(entity1: &Span, entity2: &Span, relation_name: impl Into<String>) -> Self {
        Self {
            id: RelationId::new(),
            entity1: entity1.into(),
            entity2: entity2.into(),
            relation_name: relation_name.into(),
            created_at: Utc::now(),
        }
    }
}
