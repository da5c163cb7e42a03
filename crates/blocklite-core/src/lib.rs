//! Core domain types for blocklite
//!
//! This crate contains:
//! - Blocks (immutable payloads named by a CID)
//! - The storage key codec (CID multihash <-> text key)
//! - Core error types

pub mod block;
pub mod error;
pub mod key;

pub use block::{Block, parse_cid};
pub use cid::Cid;
pub use cid::multihash::Multihash;
pub use error::{DecodeError, Error, Result};
pub use key::{cid_from_key, cid_from_raw_key, decode_key, storage_key};

/// Multicodec code for raw binary, the envelope used for CIDs rebuilt from
/// storage keys.
pub const RAW_CODEC: u64 = 0x55;

/// Multihash code for BLAKE3-256.
pub const BLAKE3_256: u64 = 0x1e;
