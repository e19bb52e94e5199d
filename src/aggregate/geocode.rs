//! Place-name coordinate cache
//!
//! Map views resolve place names to coordinates through an external geocoder.
//! Results are cached by name; the cache is passed in explicitly rather than
//! held globally.

use crate::storage::StorageResult;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lng: f64,
    pub lat: f64,
    /// Name the geocoder actually matched, when it differs from the query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl Coordinates {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self {
            lng,
            lat,
            matched_name: None,
            confidence: None,
        }
    }

    pub fn with_match(mut self, matched_name: impl Into<String>, confidence: f32) -> Self {
        self.matched_name = Some(matched_name.into());
        self.confidence = Some(confidence);
        self
    }
}

/// Name → coordinates cache with upsert semantics
pub trait GeocodeCache: Send + Sync {
    fn get(&self, name: &str) -> StorageResult<Option<Coordinates>>;

    fn set(&self, name: &str, coordinates: &Coordinates) -> StorageResult<()>;
}

/// In-process cache
#[derive(Debug, Default)]
pub struct MemoryGeocodeCache {
    entries: DashMap<String, Coordinates>,
}

impl MemoryGeocodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl GeocodeCache for MemoryGeocodeCache {
    fn get(&self, name: &str) -> StorageResult<Option<Coordinates>> {
        Ok(self.entries.get(name.trim()).map(|entry| entry.value().clone()))
    }

    fn set(&self, name: &str, coordinates: &Coordinates) -> StorageResult<()> {
        self.entries.insert(name.trim().to_string(), coordinates.clone());
        Ok(())
    }
}
