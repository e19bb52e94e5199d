//! Annotated-text segmentation for rendering

use crate::annotation::span::{derive_text, validate, Span, SpanId};
use crate::text::offsets::{char_len, char_slice};
use serde::{Deserialize, Serialize};

/// A run of plain text, optionally covered by one annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<SegmentAnnotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentAnnotation {
    pub span_id: SpanId,
    pub label: String,
}

impl Segment {
    pub fn is_annotated(&self) -> bool {
        self.annotation.is_some()
    }
}

/// Split `plain_text` into consecutive plain and annotated segments.
///
/// Spans invalid for `plain_text` are skipped, as is any span overlapping an
/// earlier one in start order. Concatenating the segment texts reproduces
/// `plain_text`.
pub fn segments(plain_text: &str, spans: &[Span]) -> Vec<Segment> {
    let mut ordered: Vec<&Span> = spans.iter().filter(|s| validate(s, plain_text)).collect();
    ordered.sort_by_key(|s| (s.start, s.end));

    let total = char_len(plain_text);
    let mut out = Vec::new();
    let mut cursor = 0;

    for span in ordered {
        if span.start < cursor {
            continue;
        }
        if span.start > cursor {
            push_plain(&mut out, plain_text, cursor, span.start);
        }
        out.push(Segment {
            start: span.start,
            end: span.end,
            text: derive_text(span, plain_text),
            annotation: Some(SegmentAnnotation {
                span_id: span.id.clone(),
                label: span.label.clone(),
            }),
        });
        cursor = span.end;
    }

    if cursor < total {
        push_plain(&mut out, plain_text, cursor, total);
    }
    out
}

fn push_plain(out: &mut Vec<Segment>, plain_text: &str, start: usize, end: usize) {
    if let Some(text) = char_slice(plain_text, start, end) {
        out.push(Segment {
            start,
            end,
            text: text.to_string(),
            annotation: None,
        });
    }
}
