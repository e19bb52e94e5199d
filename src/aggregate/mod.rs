//! Read-side derivations for visualization feeds

pub mod aggregator;
pub mod cooccurrence;
pub mod geocode;

pub use aggregator::{DocumentOverview, EntityAggregator, LocatedPlace};
pub use cooccurrence::{person_cooccurrence, PersonLink};
pub use geocode::{Coordinates, GeocodeCache, MemoryGeocodeCache};
