//! Common test utilities for guji integration tests
//!
//! Fixture texts, temporary stores and helpers for scripting the mock
//! annotation service.

#![allow(dead_code)]

pub mod corpus;
pub mod fixtures;

pub use corpus::{long_text, range_of, JIAZI, XIANG_YU};
pub use fixtures::{api_with_document, candidate, memory_store, reopen, temp_sqlite};
