//! The three-tier chunk allocator itself: one `ChunkPool` per tier, an
//! acquire/flush protocol that enforces a linear borrow per chunk, and the
//! migration path that moves a chunk's bytes between tiers (compressing on
//! the way down to the compressed tier, decompressing on the way back up).
//! A handful of fixed-size pools sit behind one façade, with per-tier byte
//! counters for introspection.

use std::path::Path;

use crate::alloc::compress::Codec;
use crate::alloc::disk::DiskRegion;
use crate::alloc::pool::ChunkPool;
use crate::common::{align_up8, Handle, Tier};
use crate::config::Config;
use crate::error::Result;

/// Per-chunk bookkeeping the allocator keeps alongside the pool's
/// allocated/free bitmap: whether the chunk is currently on loan via
/// `acquire`, and (for the compressed tier) how many bytes of its backing
/// slot currently hold compressed data.
struct ChunkMeta {
    borrowed: bool,
    live_len: usize,
}

impl ChunkMeta {
    fn new(live_len: usize) -> Self {
        Self { borrowed: false, live_len }
    }
}

struct TierState {
    pool: ChunkPool,
    meta: Vec<ChunkMeta>,
    storage: Vec<u8>,
}

impl TierState {
    fn new(num_chunks: u32, chunk_capacity: usize, chunk_size: usize) -> Self {
        Self {
            pool: ChunkPool::new(num_chunks),
            meta: (0..num_chunks).map(|_| ChunkMeta::new(chunk_size)).collect(),
            storage: vec![0u8; num_chunks as usize * chunk_capacity],
        }
    }
}

/// Chunk allocator spanning the fast, compressed, and disk tiers.
///
/// `chunk_size` is the logical payload size a caller may use; the
/// compressed tier's backing slots are `chunk_size` bytes too — per-chunk
/// compression only ever operates on exactly that many payload bytes, so a
/// chunk's live length can shrink (compressed tier) but never grow past it.
pub struct TieredAllocator {
    chunk_size: usize,
    fast: TierState,
    compressed: TierState,
    disk_pool: ChunkPool,
    disk_region: DiskRegion,
    disk_meta: Vec<ChunkMeta>,
    codec: Codec,
    memory_usage: [usize; 3],
    /// Decompression scratch for whichever compressed-tier chunk is
    /// currently on loan. `acquire` decompresses into it; `flush`
    /// recompresses it back into the tier's backing slot.
    scratch: Vec<u8>,
    scratch_idx: Option<usize>,
}

impl TieredAllocator {
    pub fn new(config: &Config) -> Result<Self> {
        let chunk_size = config.chunk_size;
        let num_chunks = config.num_chunks as u32;

        let fast = TierState::new(num_chunks, chunk_size, chunk_size);
        let compress_cap = Codec::compress_bound(chunk_size);
        let compressed = TierState::new(num_chunks, compress_cap, chunk_size);

        let disk_pool = ChunkPool::new(num_chunks);
        let disk_region = DiskRegion::new(&disk_path(config), num_chunks as usize * chunk_size)?;
        let disk_meta = (0..num_chunks).map(|_| ChunkMeta::new(chunk_size)).collect();

        let codec = Codec::new(config.compression_level)?;

        Ok(Self {
            chunk_size,
            fast,
            compressed,
            disk_pool,
            disk_region,
            disk_meta,
            codec,
            memory_usage: [0, 0, 0],
            scratch: vec![0u8; chunk_size],
            scratch_idx: None,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn meta_mut(&mut self, tier: Tier, idx: usize) -> &mut ChunkMeta {
        match tier {
            Tier::Fast => &mut self.fast.meta[idx],
            Tier::Compressed => &mut self.compressed.meta[idx],
            Tier::Disk => &mut self.disk_meta[idx],
        }
    }

    fn meta(&self, tier: Tier, idx: usize) -> &ChunkMeta {
        match tier {
            Tier::Fast => &self.fast.meta[idx],
            Tier::Compressed => &self.compressed.meta[idx],
            Tier::Disk => &self.disk_meta[idx],
        }
    }

    /// Allocates a fresh, empty chunk in `tier`. FAST and DISK chunks count
    /// their full `chunk_size` against `memory_usage` immediately. The
    /// compressed tier instead compresses a zero-filled `chunk_size` buffer
    /// into the slot right away, so every live handle always has a valid
    /// compressed representation and an accurate `live_len`/`memory_usage`
    /// from the moment it is created.
    pub fn create(&mut self, tier: Tier) -> Handle {
        let idx = match tier {
            Tier::Fast => self.fast.pool.create(),
            Tier::Compressed => self.compressed.pool.create(),
            Tier::Disk => self.disk_pool.create(),
        };
        if tier == Tier::Compressed {
            let zeroed = vec![0u8; self.chunk_size];
            let cap = self.compressed_slot_cap();
            let start = idx as usize * cap;
            let n = self
                .codec
                .compress_into(&zeroed, &mut self.compressed.storage[start..start + cap])
                .expect("compressing zero-filled chunk failed");
            self.compressed.meta[idx as usize].live_len = n;
            self.memory_usage[Tier::Compressed as usize] += n;
        } else {
            self.meta_mut(tier, idx as usize).live_len = self.chunk_size;
            self.memory_usage[tier as usize] += self.chunk_size;
        }
        Handle::new(tier, idx as u64)
    }

    /// Returns a chunk to its tier's free list. Panics if the chunk is
    /// currently on loan (borrowed) — callers must `flush` first.
    pub fn destroy(&mut self, handle: Handle) {
        assert!(!handle.is_null(), "destroy() called on a null handle");
        let tier = handle.tier();
        let idx = handle.offset() as usize;
        assert!(!self.meta(tier, idx).borrowed, "destroying a borrowed chunk");
        if tier != Tier::Compressed {
            self.memory_usage[tier as usize] -= self.chunk_size;
        } else {
            self.memory_usage[tier as usize] -= self.meta(tier, idx).live_len;
        }
        match tier {
            Tier::Fast => self.fast.pool.destroy(idx as u32),
            Tier::Compressed => self.compressed.pool.destroy(idx as u32),
            Tier::Disk => self.disk_pool.destroy(idx as u32),
        }
    }

    /// Borrows a chunk's payload bytes for mutation. Panics on a double
    /// acquire — the protocol is strictly acquire, mutate in place, flush.
    ///
    /// For the compressed tier this decompresses into an internal scratch
    /// buffer and hands back a `chunk_size`-length logical view; `flush`
    /// recompresses scratch back into the tier's backing slot. Only one
    /// compressed-tier chunk may be on loan at a time, which the
    /// acquire/flush discipline already guarantees. For the disk tier this
    /// advises the OS the slot's pages may be reclaimed before handing back
    /// the mapped pointer; `flush` `msync`s the slot.
    pub fn acquire(&mut self, handle: Handle) -> &mut [u8] {
        assert!(!handle.is_null(), "acquire() called on a null handle");
        let tier = handle.tier();
        let idx = handle.offset() as usize;
        {
            let meta = self.meta_mut(tier, idx);
            assert!(!meta.borrowed, "double acquire on chunk {idx} (tier {})", tier.name());
            meta.borrowed = true;
        }

        if tier == Tier::Compressed {
            let cap = self.compressed_slot_cap();
            let start = idx * cap;
            let live_len = self.compressed.meta[idx].live_len;
            self.scratch.resize(self.chunk_size, 0);
            let n = self
                .codec
                .decompress_into(&self.compressed.storage[start..start + live_len], &mut self.scratch)
                .expect("corrupt compressed-tier chunk");
            debug_assert_eq!(n, self.chunk_size);
            self.scratch_idx = Some(idx);
            return &mut self.scratch;
        }

        if tier == Tier::Disk {
            self.disk_region.advise_dontneed(idx, self.chunk_size);
        }

        self.chunk_bytes_mut(tier, idx)
    }

    /// Ends a borrow started by `acquire`. Panics if the chunk was not on
    /// loan.
    pub fn flush(&mut self, handle: Handle) {
        assert!(!handle.is_null(), "flush() called on a null handle");
        let tier = handle.tier();
        let idx = handle.offset() as usize;
        {
            let meta = self.meta_mut(tier, idx);
            assert!(meta.borrowed, "flush() on a chunk that was never acquired");
            meta.borrowed = false;
        }

        if tier == Tier::Compressed {
            debug_assert_eq!(self.scratch_idx, Some(idx), "flush() of an un-acquired compressed chunk");
            let cap = self.compressed_slot_cap();
            let start = idx * cap;
            let n = self
                .codec
                .compress_into(&self.scratch, &mut self.compressed.storage[start..start + cap])
                .expect("recompression failed");
            let old_len = self.compressed.meta[idx].live_len;
            self.compressed.meta[idx].live_len = n;
            self.memory_usage[Tier::Compressed as usize] += n;
            self.memory_usage[Tier::Compressed as usize] -= old_len;
            self.scratch_idx = None;
        }

        if tier == Tier::Disk {
            self.disk_region.msync(idx, self.chunk_size);
        }
    }

    fn chunk_bytes_mut(&mut self, tier: Tier, idx: usize) -> &mut [u8] {
        match tier {
            Tier::Fast => {
                let cap = self.chunk_size;
                let start = idx * cap;
                &mut self.fast.storage[start..start + cap]
            }
            Tier::Compressed => {
                let cap = self.compressed_slot_cap();
                let start = idx * cap;
                &mut self.compressed.storage[start..start + cap]
            }
            Tier::Disk => self.disk_region.slot_mut(idx, self.chunk_size),
        }
    }

    fn compressed_slot_cap(&self) -> usize {
        align_up8(Codec::compress_bound(self.chunk_size))
    }

    /// True while `handle` refers to a currently allocated chunk.
    pub fn ptr_valid(&self, handle: Handle) -> bool {
        if handle.is_null() {
            return false;
        }
        let idx = handle.offset() as usize;
        match handle.tier() {
            Tier::Fast => self.fast.pool.is_allocated(idx),
            Tier::Compressed => self.compressed.pool.is_allocated(idx),
            Tier::Disk => self.disk_pool.is_allocated(idx),
        }
    }

    /// Moves a chunk's live bytes to a freshly created chunk in `dst_tier`,
    /// destroys the source chunk, and returns the new handle. Compressing
    /// when the destination is the compressed tier, decompressing when the
    /// source was.
    pub fn migrate(&mut self, src: Handle, dst_tier: Tier) -> Result<Handle> {
        assert!(!src.is_null(), "migrate() called on a null handle");
        let src_tier = src.tier();
        let src_idx = src.offset() as usize;
        assert!(
            !self.meta(src_tier, src_idx).borrowed,
            "migrate() called on a borrowed chunk"
        );

        let live_len = self.meta(src_tier, src_idx).live_len;
        let mut payload = vec![0u8; self.chunk_size];

        match (src_tier, dst_tier) {
            (Tier::Compressed, _) => {
                let src_bytes = self.chunk_bytes_mut(src_tier, src_idx);
                let compressed = &src_bytes[..live_len];
                let n = self.codec.decompress_into(compressed, &mut payload)?;
                debug_assert_eq!(n, self.chunk_size);
            }
            _ => {
                let src_bytes = self.chunk_bytes_mut(src_tier, src_idx);
                payload.copy_from_slice(&src_bytes[..self.chunk_size]);
            }
        }

        let dst = self.create(dst_tier);
        let dst_idx = dst.offset() as usize;

        match dst_tier {
            Tier::Compressed => {
                // `create` already compressed a zero-filled placeholder into
                // this slot and counted it; replace it with the real payload.
                let placeholder_len = self.compressed.meta[dst_idx].live_len;
                let dst_bytes = self.chunk_bytes_mut(dst_tier, dst_idx);
                let n = self.codec.compress_into(&payload, dst_bytes)?;
                self.meta_mut(dst_tier, dst_idx).live_len = n;
                self.memory_usage[Tier::Compressed as usize] += n;
                self.memory_usage[Tier::Compressed as usize] -= placeholder_len;
            }
            _ => {
                let dst_bytes = self.chunk_bytes_mut(dst_tier, dst_idx);
                dst_bytes[..self.chunk_size].copy_from_slice(&payload);
            }
        }

        self.destroy(src);

        Ok(dst)
    }

    pub fn memory_usage(&self, tier: Tier) -> usize {
        self.memory_usage[tier as usize]
    }

    pub fn memory_usage_total(&self) -> usize {
        self.memory_usage.iter().sum()
    }
}

fn disk_path(config: &Config) -> &Path {
    config.disk_path.as_path()
}
