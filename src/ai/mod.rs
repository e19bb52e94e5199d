//! Model-backed annotation: service client, response decoding and import

pub mod cancel;
pub mod client;
pub mod http;
pub mod importer;
pub mod payload;
pub mod prompt;

pub use cancel::CancellationToken;
pub use client::{AiError, AnnotationClient, MockClient};
pub use http::HttpAnnotationClient;
pub use importer::{AiAnnotationImporter, ImportConfig, ImportError, ImportOutcome, ImportProgress, ImportReport};
pub use payload::{extract_json, parse_candidates, parse_relations, RawCandidate, RelationTriple};
