use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to decode storage key {key:?}: {source}")]
    Decode {
        key: String,
        #[source]
        source: DecodeError,
    },

    #[error("Invalid CID {input:?}: {source}")]
    InvalidCid {
        input: String,
        #[source]
        source: cid::Error,
    },

    #[error("Failed to build multihash for block: {0}")]
    Digest(#[source] cid::multihash::Error),
}

/// Why a storage key could not be turned back into a multihash.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("not UTF-8 text: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("not unpadded base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("not a multihash: {0}")]
    Multihash(#[from] cid::multihash::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
