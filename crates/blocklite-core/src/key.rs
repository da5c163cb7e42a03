//! Storage key codec
//!
//! Rows are keyed by the CID's multihash only, so a CIDv0 and a CIDv1 (or two
//! CIDv1s with different codecs) that carry the same hash share a row. The
//! multihash bytes are rendered as unpadded standard base64.

use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use cid::Cid;
use cid::multihash::Multihash;

use crate::error::{DecodeError, Error, Result};
use crate::RAW_CODEC;

/// Derive the storage key for a CID.
pub fn storage_key(cid: &Cid) -> String {
    STANDARD_NO_PAD.encode(cid.hash().to_bytes())
}

/// Recover the multihash a storage key was derived from.
///
/// Padding, characters outside the base64 alphabet, non-canonical trailing
/// bits, truncated multihashes and trailing bytes are all rejected.
pub fn decode_key(key: &str) -> Result<Multihash<64>> {
    let decode = || -> std::result::Result<Multihash<64>, DecodeError> {
        let bytes = STANDARD_NO_PAD.decode(key)?;
        Ok(Multihash::from_bytes(&bytes)?)
    };

    decode().map_err(|source| Error::Decode {
        key: key.to_string(),
        source,
    })
}

/// Decode a storage key and wrap it in the default CID flavor (CIDv1, raw).
///
/// The envelope the block was written under is not recorded, so callers that
/// need a different codec must re-wrap the hash.
pub fn cid_from_key(key: &str) -> Result<Cid> {
    Ok(Cid::new_v1(RAW_CODEC, decode_key(key)?))
}

/// [`cid_from_key`] for a key read back as raw column bytes, which may not be
/// UTF-8 if the row was written by something other than this crate.
pub fn cid_from_raw_key(raw: &[u8]) -> Result<Cid> {
    let key = std::str::from_utf8(raw).map_err(|source| Error::Decode {
        key: String::from_utf8_lossy(raw).into_owned(),
        source: source.into(),
    })?;
    cid_from_key(key)
}
