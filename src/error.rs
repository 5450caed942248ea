//! Error types for the tiered allocator and hash map.
//!
//! Contract violations (double-acquire, unbalanced flush, destroying a
//! borrowed chunk, an out-of-range tier tag) are programmer errors and
//! `panic!`/`assert!` rather than return a `Result`. `MapError` is reserved
//! for failures that originate in the environment rather than caller
//! misuse: disk-tier file setup and codec failures.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("disk tier backing file error: {0}")]
    DiskBacking(String),

    #[error("compression codec error: {0}")]
    Codec(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, MapError>;
