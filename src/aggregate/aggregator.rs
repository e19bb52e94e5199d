//! Entity aggregator: read-side views over one document's spans
//!
//! Feeds the statistics panel, the timeline, the map and the relationship
//! graph. Nothing here writes.
//!
//! Every feed reports only spans whose range fits the document's current
//! plain text. The one exception is [`EntityAggregator::label_histogram`],
//! which counts every stored span so that it always sums to the length of
//! [`AnnotationStore::list`].

use super::cooccurrence::{person_cooccurrence, PersonLink};
use super::geocode::{Coordinates, GeocodeCache};
use crate::annotation::{builtin, validate, AnnotationStore, DocumentId, Span};
use crate::storage::SpanFilter;
use crate::text::offsets::char_len;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

/// Headline numbers for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentOverview {
    pub total_chars: usize,
    pub total_entities: usize,
    pub label_counts: BTreeMap<String, usize>,
    pub unique_persons: usize,
    pub unique_places: usize,
    pub unique_times: usize,
}

/// A distinct place name with its cached coordinates, if any
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatedPlace {
    pub name: String,
    pub mentions: usize,
    pub coordinates: Option<Coordinates>,
}

pub struct EntityAggregator<'a> {
    store: &'a AnnotationStore,
    document: &'a DocumentId,
    plain_text: &'a str,
}

impl<'a> EntityAggregator<'a> {
    pub fn new(store: &'a AnnotationStore, document: &'a DocumentId, plain_text: &'a str) -> Self {
        Self {
            store,
            document,
            plain_text,
        }
    }

    /// Spans with `label` that fit the plain text, ordered by start.
    pub fn extract_by_label(&self, label: &str) -> Vec<Span> {
        self.store
            .search(self.document, &SpanFilter::new().with_label(label))
            .into_iter()
            .filter(|s| validate(s, self.plain_text))
            .collect()
    }

    /// Distinct texts among spans with `label`, in first-occurrence order.
    pub fn unique_texts(&self, label: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.extract_by_label(label)
            .into_iter()
            .filter(|s| seen.insert(s.text.clone()))
            .map(|s| s.text)
            .collect()
    }

    pub fn unique_text_count(&self, label: &str) -> usize {
        self.unique_texts(label).len()
    }

    /// Stored span count per label, including spans the plain text no
    /// longer fits.
    pub fn label_histogram(&self) -> BTreeMap<String, usize> {
        self.store.count_by_label(self.document)
    }

    pub fn timeline(&self) -> Vec<Span> {
        self.extract_by_label(builtin::TIME)
    }

    pub fn locations(&self) -> Vec<Span> {
        self.extract_by_label(builtin::PLACE)
    }

    pub fn persons(&self) -> Vec<Span> {
        self.extract_by_label(builtin::PERSON)
    }

    pub fn overview(&self) -> DocumentOverview {
        let visible = self.store.list_valid(self.document, self.plain_text);
        let mut label_counts = BTreeMap::new();
        for span in &visible {
            *label_counts.entry(span.label.clone()).or_insert(0) += 1;
        }
        DocumentOverview {
            total_chars: char_len(self.plain_text),
            total_entities: visible.len(),
            label_counts,
            unique_persons: self.unique_text_count(builtin::PERSON),
            unique_places: self.unique_text_count(builtin::PLACE),
            unique_times: self.unique_text_count(builtin::TIME),
        }
    }

    /// Distinct place names joined with cached coordinates.
    ///
    /// Cache failures leave the coordinates empty.
    pub fn locations_with_coordinates(&self, cache: &dyn GeocodeCache) -> Vec<LocatedPlace> {
        let places = self.locations();
        let mut out: Vec<LocatedPlace> = Vec::new();
        for span in places {
            if let Some(place) = out.iter_mut().find(|p| p.name == span.text) {
                place.mentions += 1;
                continue;
            }
            let coordinates = cache.get(&span.text).unwrap_or_else(|e| {
                warn!(place = %span.text, error = %e, "geocode cache read failed");
                None
            });
            out.push(LocatedPlace {
                name: span.text,
                mentions: 1,
                coordinates,
            });
        }
        out
    }

    /// Sentence co-occurrence of people.
    pub fn person_network(&self) -> Vec<PersonLink> {
        let spans = self.store.list_valid(self.document, self.plain_text);
        person_cooccurrence(self.plain_text, &spans)
    }
}
