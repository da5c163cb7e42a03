//! SQLite-backed blockstore
//!
//! Tuned for write-once/read-many IPLD-style workloads: every operation is a
//! single prepared statement keyed by the CID's multihash.

use std::path::Path;

use async_trait::async_trait;
use blocklite_core::{Block, Cid, storage_key};
use sqlx::sqlite::SqlitePool;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::blockstore::Blockstore;
use crate::engine::{Engine, Statement};
use crate::error::{Result, StorageError};
use crate::keys::KeyStream;
use crate::options::Options;

/// Blockstore over a single SQLite file. Clones share the connection pool.
#[derive(Debug, Clone)]
pub struct SqliteBlockstore {
    engine: Engine,
    options: Options,
}

impl SqliteBlockstore {
    /// Open or create the blockstore file at `path`.
    pub async fn open(path: impl AsRef<Path>, options: Options) -> Result<Self> {
        let engine = Engine::open(path.as_ref(), &options).await?;
        Ok(Self { engine, options })
    }

    pub fn path(&self) -> &Path {
        self.engine.path()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    fn pool(&self) -> &SqlitePool {
        self.engine.pool()
    }
}

#[async_trait]
impl Blockstore for SqliteBlockstore {
    async fn has(&self, cid: &Cid) -> Result<bool> {
        let exists: i64 = sqlx::query_scalar(Statement::Has.sql())
            .bind(storage_key(cid))
            .fetch_one(self.pool())
            .await
            .map_err(|source| StorageError::Query {
                op: "check for existence of",
                cid: *cid,
                source,
            })?;
        Ok(exists != 0)
    }

    async fn get(&self, cid: &Cid) -> Result<Block> {
        let payload: Option<Vec<u8>> = sqlx::query_scalar(Statement::Get.sql())
            .bind(storage_key(cid))
            .fetch_optional(self.pool())
            .await
            .map_err(|source| StorageError::Query {
                op: "get",
                cid: *cid,
                source,
            })?;

        match payload {
            Some(data) => Ok(Block::with_cid(*cid, data)),
            None => Err(StorageError::NotFound(*cid)),
        }
    }

    async fn get_size(&self, cid: &Cid) -> Result<usize> {
        let size: Option<i64> = sqlx::query_scalar(Statement::GetSize.sql())
            .bind(storage_key(cid))
            .fetch_optional(self.pool())
            .await
            .map_err(|source| StorageError::Query {
                op: "get size of",
                cid: *cid,
                source,
            })?;

        match size {
            Some(size) => usize::try_from(size).map_err(|_| {
                StorageError::Other(anyhow::anyhow!("negative payload length {size} for {cid}"))
            }),
            None => Err(StorageError::NotFound(*cid)),
        }
    }

    async fn put(&self, block: &Block) -> Result<()> {
        let cid = block.cid();
        let result = sqlx::query(Statement::Put.sql())
            .bind(storage_key(cid))
            .bind(block.data())
            .execute(self.pool())
            .await
            .map_err(|source| StorageError::Query {
                op: "put block with",
                cid: *cid,
                source,
            })?;

        if result.rows_affected() == 0 {
            debug!("Block {} already stored", cid);
        } else {
            debug!("Stored block {} ({} bytes)", cid, block.len());
        }
        Ok(())
    }

    async fn put_many(&self, blocks: &[Block]) -> Result<()> {
        for (index, block) in blocks.iter().enumerate() {
            self.put(block)
                .await
                .map_err(|source| StorageError::PutMany {
                    index,
                    total: blocks.len(),
                    cid: *block.cid(),
                    source: Box::new(source),
                })?;
        }
        Ok(())
    }

    async fn delete_block(&self, cid: &Cid) -> Result<()> {
        let result = sqlx::query(Statement::Delete.sql())
            .bind(storage_key(cid))
            .execute(self.pool())
            .await
            .map_err(|source| StorageError::Query {
                op: "delete",
                cid: *cid,
                source,
            })?;

        debug!("Deleted block {} ({} rows)", cid, result.rows_affected());
        Ok(())
    }

    async fn all_keys(&self, cancel: watch::Receiver<bool>) -> Result<KeyStream> {
        let conn = self
            .pool()
            .acquire()
            .await
            .map_err(StorageError::Enumeration)?;

        Ok(KeyStream::spawn(conn, cancel, self.options.channel_capacity()))
    }

    /// Intentionally inert: payloads are never re-hashed on read.
    fn hash_on_read(&self, enabled: bool) {
        info!(
            "sqlite blockstore ignored hash-on-read request (enabled = {})",
            enabled
        );
    }

    async fn close(&self) -> Result<()> {
        self.engine.close().await;
        Ok(())
    }
}
