use async_trait::async_trait;
use blocklite_core::{Block, Cid};
use tokio::sync::watch;

use crate::error::Result;
use crate::keys::KeyStream;

/// "No valid size" marker for boundaries that must print a number for a
/// missing block. Zero is a legitimate size.
pub const MISSING_SIZE: i64 = -1;

/// The capability set a content-addressed consumer expects from a backend.
#[async_trait]
pub trait Blockstore: Send + Sync {
    /// Existence check. Absence is `Ok(false)`, never an error.
    async fn has(&self, cid: &Cid) -> Result<bool>;

    /// Fetch a block. Absence is [`StorageError::NotFound`](crate::StorageError::NotFound).
    async fn get(&self, cid: &Cid) -> Result<Block>;

    /// Payload length without transferring the payload.
    ///
    /// Absence is [`StorageError::NotFound`](crate::StorageError::NotFound)
    /// and carries no size. Callers that must report a number for a missing
    /// block use [`MISSING_SIZE`].
    async fn get_size(&self, cid: &Cid) -> Result<usize>;

    /// Store a block. Storing an existing key is a silent no-op.
    async fn put(&self, block: &Block) -> Result<()>;

    /// Store blocks in order, stopping at the first failure. Earlier puts stay.
    async fn put_many(&self, blocks: &[Block]) -> Result<()>;

    /// Remove a block. Removing an absent key succeeds.
    async fn delete_block(&self, cid: &Cid) -> Result<()>;

    /// Stream every stored key until done or until `cancel` becomes `true`.
    async fn all_keys(&self, cancel: watch::Receiver<bool>) -> Result<KeyStream>;

    /// Toggle re-hashing payloads on read, for backends that support it.
    fn hash_on_read(&self, enabled: bool);

    /// Release the backend. No operation may be issued afterwards.
    async fn close(&self) -> Result<()>;
}
