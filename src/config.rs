//! Run configuration: a plain struct with a `Default` impl, deliberately
//! not a hierarchical, hot-reloadable configuration system — that
//! machinery is disproportionate to a single-threaded research prototype.

use std::path::PathBuf;

/// Default path for the disk tier's backing file.
pub const DEFAULT_DISK_PATH: &str = "/var/tmp/ssd";

#[derive(Debug, Clone)]
pub struct Config {
    /// Payload bytes per chunk (before compression headroom).
    pub chunk_size: usize,
    /// Number of chunks provisioned in each of the three tiers.
    pub num_chunks: usize,
    /// Number of slots in the hash map's bucket array.
    pub bucket_cap: u32,
    /// Maximum number of fast-tier chain heads before eviction kicks in.
    pub fast_cap: u32,
    /// Backing file for the disk tier.
    pub disk_path: PathBuf,
    /// zstd compression level used by the compressed tier.
    pub compression_level: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: 64,
            num_chunks: 1024,
            bucket_cap: 1024,
            fast_cap: 256,
            disk_path: PathBuf::from(DEFAULT_DISK_PATH),
            compression_level: 3,
        }
    }
}
