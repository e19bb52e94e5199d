//! Label vocabulary
//!
//! Six built-in entity categories plus user-defined ones. Labels are plain
//! strings on spans; the vocabulary only governs display metadata and which
//! labels may be removed.

use super::span::Span;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Well-known label values
pub mod builtin {
    pub const PERSON: &str = "person";
    pub const PLACE: &str = "place";
    pub const TIME: &str = "time";
    pub const OBJECT: &str = "object";
    pub const CONCEPT: &str = "concept";
    pub const OTHER: &str = "other";
}

const BUILTINS: [(&str, &str, &str); 6] = [
    (builtin::PERSON, "人物", "#f59e0b"),
    (builtin::PLACE, "地名", "#3b82f6"),
    (builtin::TIME, "时间", "#8b5cf6"),
    (builtin::OBJECT, "器物", "#22c55e"),
    (builtin::CONCEPT, "概念", "#ec4899"),
    (builtin::OTHER, "其他", "#64748b"),
];

// Names the annotation service emits, mapped onto built-in values.
const ALIASES: [(&str, &str); 9] = [
    ("人物", builtin::PERSON),
    ("人名", builtin::PERSON),
    ("地名", builtin::PLACE),
    ("地点", builtin::PLACE),
    ("时间", builtin::TIME),
    ("時間", builtin::TIME),
    ("器物", builtin::OBJECT),
    ("概念", builtin::CONCEPT),
    ("其他", builtin::OTHER),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabelError {
    #[error("Label value must not be empty")]
    Empty,

    #[error("Label already exists: {0}")]
    Duplicate(String),

    #[error("Built-in label cannot be removed: {0}")]
    BuiltIn(String),

    #[error("Label {label} is used by {count} annotation(s)")]
    InUse { label: String, count: usize },

    #[error("Label not found: {0}")]
    NotFound(String),
}

/// Display metadata for one label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelInfo {
    pub value: String,
    pub display_name: String,
    pub color: String,
    #[serde(default)]
    pub is_custom: bool,
}

/// Ordered label set: built-ins first, then custom labels in creation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelVocabulary {
    custom: Vec<LabelInfo>,
    #[serde(skip)]
    builtins: Vec<LabelInfo>,
}

impl Default for LabelVocabulary {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelVocabulary {
    pub fn new() -> Self {
        Self {
            custom: Vec::new(),
            builtins: BUILTINS
                .iter()
                .map(|(value, name, color)| LabelInfo {
                    value: value.to_string(),
                    display_name: name.to_string(),
                    color: color.to_string(),
                    is_custom: false,
                })
                .collect(),
        }
    }

    /// Restore a vocabulary from its persisted custom labels.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut vocab: Self = serde_json::from_str(json)?;
        vocab.builtins = Self::new().builtins;
        Ok(vocab)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelInfo> {
        self.builtins.iter().chain(self.custom.iter())
    }

    pub fn get(&self, value: &str) -> Option<&LabelInfo> {
        self.iter().find(|info| info.value == value)
    }

    pub fn contains(&self, value: &str) -> bool {
        self.get(value).is_some()
    }

    pub fn is_builtin(value: &str) -> bool {
        BUILTINS.iter().any(|(v, _, _)| *v == value)
    }

    /// Colour for a label, falling back to the `other` colour.
    pub fn color_for(&self, value: &str) -> &str {
        self.get(value)
            .or_else(|| self.get(builtin::OTHER))
            .map(|info| info.color.as_str())
            .unwrap_or("#64748b")
    }

    /// Canonical label value for a raw label string.
    ///
    /// Known Chinese category names map to built-ins, anything else is kept
    /// trimmed, and a blank label becomes `other`.
    pub fn resolve(raw: &str) -> String {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return builtin::OTHER.to_string();
        }
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == trimmed)
            .map(|(_, value)| value.to_string())
            .unwrap_or_else(|| trimmed.to_string())
    }

    /// Add a user-defined label with a random colour.
    pub fn add_custom(&mut self, value: &str) -> Result<&LabelInfo, LabelError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(LabelError::Empty);
        }
        if self.contains(value) {
            return Err(LabelError::Duplicate(value.to_string()));
        }
        self.custom.push(LabelInfo {
            value: value.to_string(),
            display_name: value.to_string(),
            color: random_color(),
            is_custom: true,
        });
        Ok(&self.custom[self.custom.len() - 1])
    }

    /// Remove a user-defined label that no span references.
    pub fn remove_custom(&mut self, value: &str, spans: &[Span]) -> Result<LabelInfo, LabelError> {
        if Self::is_builtin(value) {
            return Err(LabelError::BuiltIn(value.to_string()));
        }
        let pos = self
            .custom
            .iter()
            .position(|info| info.value == value)
            .ok_or_else(|| LabelError::NotFound(value.to_string()))?;
        let count = spans.iter().filter(|s| s.label == value).count();
        if count > 0 {
            return Err(LabelError::InUse {
                label: value.to_string(),
                count,
            });
        }
        Ok(self.custom.remove(pos))
    }
}

/// `hsl(h, s%, l%)` with hue 0–359, saturation 70–89, lightness 50–69.
fn random_color() -> String {
    let mut buf = [0u8; 6];
    if getrandom::getrandom(&mut buf).is_err() {
        return "hsl(210, 80%, 60%)".to_string();
    }
    let hue = u16::from_le_bytes([buf[0], buf[1]]) % 360;
    let saturation = 70 + buf[2] % 20;
    let lightness = 50 + buf[3] % 20;
    format!("hsl({}, {}%, {}%)", hue, saturation, lightness)
}
