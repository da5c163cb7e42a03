//! Storage layer for blocklite
//!
//! This crate provides:
//! - SQLite persistence engine (tuning, schema, prepared statements)
//! - Content-addressed blockstore keyed by multihash
//! - Cancellable background key enumeration

pub mod blockstore;
pub mod engine;
pub mod error;
pub mod keys;
pub mod options;
pub mod store;

pub use blockstore::{Blockstore, MISSING_SIZE};
pub use engine::SCHEMA_VERSION;
pub use error::{Result, StorageError};
pub use keys::{EnumerationReport, EnumerationState, KeyStream};
pub use options::Options;
pub use store::SqliteBlockstore;
