//! Decoding of annotation service output
//!
//! Model output is untrusted: it may be wrapped in prose or code fences, use
//! floats for offsets, or omit fields. Nothing here fails; unusable input
//! decodes to nothing.

use serde_json::{Map, Value};

/// Extract the first JSON object or array from model output.
///
/// Tries in order:
/// 1. Direct parse (response is pure JSON)
/// 2. Extract from a fenced code block
/// 3. The outermost `{...}` or `[...]` span, whichever opens first
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();

    if let Some(v) = parse_structured(trimmed) {
        return Some(v);
    }

    let fenced = if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + "```json".len()..];
        after.find("```").map(|end| &after[..end])
    } else if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        after.find("```").map(|end| &after[..end])
    } else {
        None
    };
    if let Some(v) = fenced.and_then(|block| parse_structured(block.trim())) {
        return Some(v);
    }

    let object = trimmed.find('{').zip(trimmed.rfind('}'));
    let array = trimmed.find('[').zip(trimmed.rfind(']'));
    let mut spans: Vec<(usize, usize)> = [object, array].into_iter().flatten().collect();
    spans.sort();
    spans
        .into_iter()
        .filter(|(start, end)| start < end)
        .find_map(|(start, end)| parse_structured(&trimmed[start..=end]))
}

fn parse_structured(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(|v| v.is_object() || v.is_array())
}

/// Integral number, accepting floats with no fractional part.
fn int_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|key| {
        let v = obj.get(*key)?;
        v.as_i64().or_else(|| {
            v.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        })
    })
}

fn str_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// One entity candidate as the service described it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawCandidate {
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub label: Option<String>,
    pub text: Option<String>,
    pub confidence: Option<f32>,
}

impl RawCandidate {
    pub fn has_offsets(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }
}

/// Candidates from an annotate response.
///
/// Accepts a bare array, an object with an `annotations` array, or a string
/// containing either. Anything else yields no candidates. Items that are not
/// objects are dropped; items without offsets are kept for the caller to
/// decide on.
pub fn parse_candidates(value: &Value) -> Vec<RawCandidate> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(obj) => match obj.get("annotations") {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        Value::String(text) => {
            return extract_json(text)
                .map(|v| parse_candidates(&v))
                .unwrap_or_default()
        }
        _ => return Vec::new(),
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .map(|obj| RawCandidate {
            start: int_field(obj, &["start"]),
            end: int_field(obj, &["end"]),
            label: str_field(obj, &["label"]),
            text: str_field(obj, &["text"]),
            confidence: obj
                .get("confidence")
                .and_then(Value::as_f64)
                .map(|c| c as f32),
        })
        .collect()
}

/// One proposed relation, referring to entities by list position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationTriple {
    pub entity1_index: i64,
    pub entity2_index: i64,
    pub relation_name: String,
}

/// Relation triples from a free-text answer.
///
/// Expects `{"relations": [{"entity1Index", "entity2Index", "relationName"}]}`
/// (snake_case keys and a bare array are accepted too). Items missing an
/// index are dropped; an unparseable answer yields nothing.
pub fn parse_relations(answer: &str) -> Vec<RelationTriple> {
    let Some(value) = extract_json(answer) else {
        return Vec::new();
    };
    let items = match &value {
        Value::Array(items) => items,
        Value::Object(obj) => match obj.get("relations") {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|obj| {
            Some(RelationTriple {
                entity1_index: int_field(obj, &["entity1Index", "entity1_index"])?,
                entity2_index: int_field(obj, &["entity2Index", "entity2_index"])?,
                relation_name: str_field(obj, &["relationName", "relation_name"]).unwrap_or_default(),
            })
        })
        .collect()
}
