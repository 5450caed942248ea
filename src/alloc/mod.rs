//! Three-tier chunk allocator: fast (heap), compressed (heap + zstd), and
//! disk (mmap'd file). See `tiered` for the façade callers use.

mod compress;
mod disk;
mod pool;
mod tiered;

pub use tiered::TieredAllocator;
