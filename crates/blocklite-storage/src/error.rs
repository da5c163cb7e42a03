//! Error types for blocklite-storage

use std::path::PathBuf;

use blocklite_core::Cid;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to open sqlite blockstore at {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to initialize sqlite blockstore schema ({statement}): {source}")]
    Schema {
        statement: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Unsupported blockstore schema version {found} (supported up to {supported})")]
    UnsupportedSchema { found: i64, supported: i64 },

    #[error("Block not found: {0}")]
    NotFound(Cid),

    #[error("Failed to {op} CID {cid} in sqlite blockstore: {source}")]
    Query {
        op: &'static str,
        cid: Cid,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to put block {index}/{total} with CID {cid} into sqlite blockstore: {source}")]
    PutMany {
        index: usize,
        total: usize,
        cid: Cid,
        #[source]
        source: Box<StorageError>,
    },

    #[error("Failed when querying all keys in sqlite blockstore: {0}")]
    Enumeration(#[source] sqlx::Error),

    #[error(transparent)]
    Core(#[from] blocklite_core::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StorageError {
    /// True when the requested block is simply absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    /// True for failures that leave a store unusable at open time.
    pub fn is_open_error(&self) -> bool {
        matches!(
            self,
            StorageError::Open { .. }
                | StorageError::Schema { .. }
                | StorageError::UnsupportedSchema { .. }
        )
    }
}
