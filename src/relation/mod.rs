//! Relations between entity spans: creation, AI proposals and export

pub mod deriver;
pub mod export;

pub use deriver::{validate_proposals, CommitReport, RelationConfig, RelationDeriver, RelationError, RelationProposal};
pub use export::{export_file_name, relations_csv};
