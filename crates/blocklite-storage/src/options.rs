//! Per-store tuning knobs

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Options accepted by [`SqliteBlockstore::open`](crate::SqliteBlockstore::open).
///
/// Every field has a default and unknown keys are ignored when deserializing,
/// so older or newer config files always load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    /// How long a connection waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Page cache size in KiB.
    #[serde(default = "default_cache_size_kib")]
    pub cache_size_kib: u32,

    /// Page size used when the database file is created.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Capacity of the channel between the key enumeration task and its consumer.
    #[serde(default = "default_key_channel_capacity")]
    pub key_channel_capacity: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            busy_timeout_ms: default_busy_timeout_ms(),
            cache_size_kib: default_cache_size_kib(),
            page_size: default_page_size(),
            max_connections: default_max_connections(),
            key_channel_capacity: default_key_channel_capacity(),
        }
    }
}

impl Options {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// `cache_size` pragma value; negative means KiB rather than pages.
    pub fn cache_size_pragma(&self) -> String {
        format!("-{}", self.cache_size_kib)
    }

    pub(crate) fn channel_capacity(&self) -> usize {
        self.key_channel_capacity.max(1)
    }

    pub(crate) fn pool_size(&self) -> u32 {
        self.max_connections.max(1)
    }
}

fn default_busy_timeout_ms() -> u64 {
    10_000
}

fn default_cache_size_kib() -> u32 {
    524_288
}

fn default_page_size() -> u32 {
    4096
}

fn default_max_connections() -> u32 {
    8
}

fn default_key_channel_capacity() -> usize {
    16
}
