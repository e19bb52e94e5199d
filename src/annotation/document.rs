//! Document: source content owned by the document collaborator

use crate::text::normalize::{detect_format, to_plain_text_as, ContentFormat};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
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

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A stored document. Annotation offsets refer to `plain_text()`, never to
/// `content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub format: ContentFormat,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// The format is detected once here and then stored, so the plain text
    /// of a saved document never depends on re-detection.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: DocumentId::new(),
            name: name.into(),
            format: detect_format(&content),
            content,
            updated_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<DocumentId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_format(mut self, format: ContentFormat) -> Self {
        self.format = match format {
            ContentFormat::Auto => detect_format(&self.content),
            other => other,
        };
        self
    }

    pub fn plain_text(&self) -> String {
        to_plain_text_as(&self.content, self.format)
    }
}
