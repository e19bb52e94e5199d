//! Person co-occurrence by sentence
//!
//! Two people are linked when both are annotated within one sentence. Scores
//! are `count / max_count`, so the strongest link scores 1.0.

use crate::annotation::{builtin, Span};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

const SENTENCE_END: [char; 6] = ['。', '！', '？', '.', '!', '?'];

/// An undirected link between two person names, `a < b`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonLink {
    pub a: String,
    pub b: String,
    pub count: usize,
    pub score: f32,
}

/// Character index of the sentence each offset belongs to.
fn sentence_starts(plain_text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, c) in plain_text.chars().enumerate() {
        if SENTENCE_END.contains(&c) {
            starts.push(i + 1);
        }
    }
    starts
}

/// Person links for `spans` over `plain_text`, strongest first.
///
/// A span belongs to the sentence containing its start offset. Spans with
/// labels other than `person` are ignored, as are repeated mentions of one
/// name within a sentence.
pub fn person_cooccurrence(plain_text: &str, spans: &[Span]) -> Vec<PersonLink> {
    let starts = sentence_starts(plain_text);
    let mut by_sentence: HashMap<usize, BTreeSet<&str>> = HashMap::new();
    for span in spans.iter().filter(|s| s.label == builtin::PERSON) {
        let sentence = starts.partition_point(|&s| s <= span.start).saturating_sub(1);
        by_sentence.entry(sentence).or_default().insert(span.text.as_str());
    }

    let mut counts: HashMap<(&str, &str), usize> = HashMap::new();
    for names in by_sentence.values() {
        let names: Vec<&str> = names.iter().copied().collect();
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                *counts.entry((*a, *b)).or_insert(0) += 1;
            }
        }
    }

    let max = counts.values().copied().max().unwrap_or(0);
    let mut links: Vec<PersonLink> = counts
        .into_iter()
        .map(|((a, b), count)| PersonLink {
            a: a.to_string(),
            b: b.to_string(),
            count,
            score: count as f32 / max as f32,
        })
        .collect();
    links.sort_by(|x, y| y.count.cmp(&x.count).then_with(|| (&x.a, &x.b).cmp(&(&y.a, &y.b))));
    links
}
