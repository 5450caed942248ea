//! CLI-facing drivers that exercise the hash map: a word-count placement
//! benchmark and a per-tier memory micro-benchmark.

mod membench;
mod wordcount;

pub use membench::run_memory;
pub use wordcount::run_placement;
