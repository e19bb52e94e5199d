//! Span: a labeled character range over a document's plain text

use crate::text::offsets::{char_len, char_slice};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a span
///
/// An empty id means "not yet assigned"; the store fills it in on `add`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpanId(String);

impl SpanId {
    /// Create a new random SpanId (UUID-based)
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// An unassigned id
    pub fn unassigned() -> Self {
        Self(String::new())
    }

    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unassigned(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for SpanId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SpanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SpanId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Where a span came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    #[default]
    Manual,
    Ai,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Manual => "manual",
            Provenance::Ai => "ai",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(Provenance::Manual),
            "ai" => Some(Provenance::Ai),
            _ => None,
        }
    }
}

/// A labeled range `[start, end)` of a document's plain text.
///
/// `text` is a cached copy of the covered characters; the offsets are
/// authoritative and `text` is re-derived whenever they disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub id: SpanId,
    pub start: usize,
    pub end: usize,
    pub label: String,
    pub text: String,
    pub source: Provenance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub created_at: DateTime<Utc>,
}

impl Span {
    /// A manually created span with a fresh id.
    pub fn new(start: usize, end: usize, label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: SpanId::new(),
            start,
            end,
            label: label.into(),
            text: text.into(),
            source: Provenance::Manual,
            confidence: None,
            created_at: Utc::now(),
        }
    }

    /// Build a manual span over `plain_text`, deriving its text.
    ///
    /// Returns `None` when the range is not valid for `plain_text`.
    pub fn over(plain_text: &str, start: usize, end: usize, label: impl Into<String>) -> Option<Self> {
        let text = char_slice(plain_text, start, end)?;
        Some(Self::new(start, end, label, text))
    }

    /// Mark this span as AI-produced with the given confidence.
    pub fn with_ai_confidence(mut self, confidence: f32) -> Self {
        self.source = Provenance::Ai;
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    pub fn with_id(mut self, id: SpanId) -> Self {
        self.id = id;
        self
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Half-open interval intersection.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.overlaps_range(other.start, other.end)
    }

    pub fn overlaps_range(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }
}

/// Raw form of [`validate`] for untyped input where offsets may be missing
/// or negative.
pub fn validate_range(start: Option<i64>, end: Option<i64>, plain_len: usize) -> bool {
    match (start, end) {
        (Some(s), Some(e)) => s >= 0 && s < e && (e as u64) <= plain_len as u64,
        _ => false,
    }
}

/// True iff `0 <= start < end <= len(plain_text)`.
pub fn validate(span: &Span, plain_text: &str) -> bool {
    span.start < span.end && span.end <= char_len(plain_text)
}

/// The characters of `plain_text` covered by `span`.
///
/// Only meaningful for spans that pass [`validate`]; invalid spans derive to
/// an empty string.
pub fn derive_text(span: &Span, plain_text: &str) -> String {
    char_slice(plain_text, span.start, span.end)
        .unwrap_or_default()
        .to_string()
}

/// Re-derive `span.text` from `plain_text` if it has drifted.
///
/// Returns true when the text was rewritten.
pub fn refresh_text(span: &mut Span, plain_text: &str) -> bool {
    let derived = derive_text(span, plain_text);
    if span.text != derived {
        span.text = derived;
        true
    } else {
        false
    }
}
