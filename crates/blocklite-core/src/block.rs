use std::str::FromStr;

use cid::Cid;
use cid::multihash::Multihash;

use crate::error::{Error, Result};
use crate::{BLAKE3_256, RAW_CODEC};

/// An immutable payload together with the CID that names it.
///
/// The pairing is trusted: nothing here checks that the CID's hash matches
/// the data unless the block was built with [`Block::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    cid: Cid,
    data: Vec<u8>,
}

impl Block {
    /// Build a block named by a raw CIDv1 over the BLAKE3-256 hash of `data`.
    pub fn new(data: impl Into<Vec<u8>>) -> Result<Self> {
        let data = data.into();
        let digest = blake3::hash(&data);
        let hash = Multihash::wrap(BLAKE3_256, digest.as_bytes()).map_err(Error::Digest)?;

        Ok(Self {
            cid: Cid::new_v1(RAW_CODEC, hash),
            data,
        })
    }

    /// Pair existing data with a CID supplied by the caller.
    pub fn with_cid(cid: Cid, data: impl Into<Vec<u8>>) -> Self {
        Self {
            cid,
            data: data.into(),
        }
    }

    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Parse a textual CID (base58btc CIDv0 or multibase CIDv1).
pub fn parse_cid(input: &str) -> Result<Cid> {
    Cid::from_str(input.trim()).map_err(|source| Error::InvalidCid {
        input: input.to_string(),
        source,
    })
}
