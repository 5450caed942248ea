//! Chained hash map backed by `TieredAllocator`: each bucket's chain is a
//! linked list of allocator chunks holding packed `Entry` records, with a
//! Clock (second-chance) sweep migrating cold fast-tier chains down to the
//! compressed tier once too many chain heads live in fast memory.
//!
//! The eviction policy keeps a persistent hand position that sweeps the
//! bucket array, clearing a reference bit on its first pass over a slot
//! and evicting on the second.

use crate::alloc::TieredAllocator;
use crate::common::{Handle, Tier};
use crate::config::Config;
use crate::error::Result;
use crate::map::bucket::{entry_fits, BucketView, BUCKET_DATA_OFFSET, ENTRY_HEADER_LEN};
use crate::map::hash::murmur3_x86_32;

enum PutOutcome {
    Updated,
    Inserted,
    NeedNext(u64),
}

pub struct ChainedHashMap {
    alloc: TieredAllocator,
    heads: Vec<Handle>,
    ref_bits: Vec<bool>,
    hand: usize,
    in_fast: u32,
    fast_cap: u32,
    bucket_cap: usize,
    chunk_size: usize,
    len: u64,
}

impl ChainedHashMap {
    pub fn new(config: &Config) -> Result<Self> {
        assert!(
            config.chunk_size > 2 * ENTRY_HEADER_LEN + BUCKET_DATA_OFFSET,
            "chunk_size {} too small to hold a bucket header and an entry (need > {})",
            config.chunk_size,
            2 * ENTRY_HEADER_LEN + BUCKET_DATA_OFFSET
        );
        let alloc = TieredAllocator::new(config)?;
        let bucket_cap = config.bucket_cap as usize;
        Ok(Self {
            chunk_size: alloc.chunk_size(),
            alloc,
            heads: vec![Handle::null(); bucket_cap],
            ref_bits: vec![false; bucket_cap],
            hand: 0,
            in_fast: 0,
            fast_cap: config.fast_cap,
            bucket_cap,
            len: 0,
        })
    }

    fn bucket_idx(&self, hash: u32) -> usize {
        hash as usize % self.bucket_cap
    }

    /// Inserts or updates `key`'s value. Allocates a new fast-tier chain
    /// head on first use of a bucket, extending the chain with further
    /// fast-tier chunks as entries outgrow the current tail.
    pub fn put(&mut self, key: &[u8], value: u64) -> Result<()> {
        let hash = murmur3_x86_32(key);
        let idx = self.bucket_idx(hash);

        if self.heads[idx].is_null() {
            let head = self.alloc.create(Tier::Fast);
            BucketView::new(self.alloc.acquire(head)).init_empty();
            self.alloc.flush(head);
            self.heads[idx] = head;
            self.in_fast += 1;
        }
        if self.heads[idx].tier() == Tier::Fast {
            self.ref_bits[idx] = true;
        }

        let mut cur = self.heads[idx];
        loop {
            let outcome = {
                let bytes = self.alloc.acquire(cur);
                let mut view = BucketView::new(bytes);
                if let Some((off, _)) = view.find(key, hash) {
                    view.set_value_at(off, value);
                    PutOutcome::Updated
                } else if entry_fits(view.free_space(self.chunk_size), key.len()) {
                    view.append(key, hash, value);
                    PutOutcome::Inserted
                } else {
                    PutOutcome::NeedNext(view.next_raw())
                }
            };
            self.alloc.flush(cur);

            match outcome {
                PutOutcome::Updated => return self.maybe_evict(),
                PutOutcome::Inserted => {
                    self.len += 1;
                    return self.maybe_evict();
                }
                PutOutcome::NeedNext(next_raw) if next_raw != Handle::null().raw() => {
                    cur = Handle::from_raw(next_raw);
                }
                PutOutcome::NeedNext(_) => {
                    let new_chunk = self.alloc.create(Tier::Fast);
                    BucketView::new(self.alloc.acquire(new_chunk)).init_empty();
                    self.alloc.flush(new_chunk);

                    let bytes = self.alloc.acquire(cur);
                    BucketView::new(bytes).set_next_raw(new_chunk.raw());
                    self.alloc.flush(cur);

                    cur = new_chunk;
                }
            }
        }
    }

    pub fn get(&mut self, key: &[u8]) -> Option<u64> {
        let hash = murmur3_x86_32(key);
        let idx = self.bucket_idx(hash);
        if self.heads[idx].is_null() {
            return None;
        }

        let head = self.heads[idx];
        let mut cur = head;
        loop {
            let (found, next_raw) = {
                let bytes = self.alloc.acquire(cur);
                let view = BucketView::new(bytes);
                (view.find(key, hash).map(|(_, v)| v), view.next_raw())
            };
            self.alloc.flush(cur);

            if let Some(v) = found {
                if head.tier() == Tier::Fast {
                    self.ref_bits[idx] = true;
                }
                return Some(v);
            }
            if next_raw == Handle::null().raw() {
                return None;
            }
            cur = Handle::from_raw(next_raw);
        }
    }

    /// Total live entries across all chains.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn memory_usage(&self, tier: Tier) -> usize {
        self.alloc.memory_usage(tier)
    }

    pub fn memory_usage_total(&self) -> usize {
        self.alloc.memory_usage_total()
    }

    /// Fraction of bucket slots whose chain head currently lives in the
    /// fast tier.
    pub fn fast_fraction(&self) -> f64 {
        if self.bucket_cap == 0 {
            return 0.0;
        }
        self.in_fast as f64 / self.bucket_cap as f64
    }

    /// Walks every chain and every chunk in it, returning owned
    /// `(key, value)` pairs. Rust's borrow checker rules out a literal
    /// lending iterator here (each step would need to borrow `self` and
    /// hand back data borrowed from that same call); entries are copied
    /// out eagerly instead.
    pub fn iter(&mut self) -> MapIter {
        let mut pairs = Vec::new();
        let heads: Vec<Handle> = self.heads.clone();
        for head in heads {
            if head.is_null() {
                continue;
            }
            let mut cur = head;
            loop {
                let (entries, next_raw) = {
                    let bytes = self.alloc.acquire(cur);
                    let view = BucketView::new(bytes);
                    (view.iter_owned(), view.next_raw())
                };
                self.alloc.flush(cur);
                pairs.extend(entries);
                if next_raw == Handle::null().raw() {
                    break;
                }
                cur = Handle::from_raw(next_raw);
            }
        }
        MapIter { pairs: pairs.into_iter() }
    }

    /// Runs one step of the Clock sweep if the fast tier is over capacity,
    /// migrating at most one cold chain head to the compressed tier. The
    /// sweep loops until it finds a victim or has proved none is currently
    /// evictable (every slot empty or freshly touched).
    fn maybe_evict(&mut self) -> Result<()> {
        if self.in_fast <= self.fast_cap {
            return Ok(());
        }
        let mut scanned = 0usize;
        while scanned < self.bucket_cap {
            let idx = self.hand;
            self.hand = (self.hand + 1) % self.bucket_cap;
            scanned += 1;

            let head = self.heads[idx];
            if head.is_null() || head.tier() != Tier::Fast {
                continue;
            }
            if self.ref_bits[idx] {
                self.ref_bits[idx] = false;
                continue;
            }

            self.migrate_chain(idx)?;
            return Ok(());
        }
        Ok(())
    }

    /// Migrates every fast-tier chunk in the chain rooted at bucket `idx`
    /// to the compressed tier, updating the chain's head in place.
    fn migrate_chain(&mut self, idx: usize) -> Result<()> {
        let mut cur = self.heads[idx];
        let mut new_head = None;
        let mut prev_new: Option<Handle> = None;

        loop {
            let next_raw = BucketView::new(self.alloc.acquire(cur)).next_raw();
            self.alloc.flush(cur);

            let migrated = self.alloc.migrate(cur, Tier::Compressed)?;
            if new_head.is_none() {
                new_head = Some(migrated);
            }
            if let Some(prev) = prev_new {
                let bytes = self.alloc.acquire(prev);
                BucketView::new(bytes).set_next_raw(migrated.raw());
                self.alloc.flush(prev);
            }
            prev_new = Some(migrated);

            if next_raw == Handle::null().raw() {
                break;
            }
            cur = Handle::from_raw(next_raw);
        }

        self.heads[idx] = new_head.expect("non-empty chain must migrate at least one chunk");
        self.in_fast -= 1;
        Ok(())
    }

    /// Human-readable per-tier occupancy snapshot, used by the CLI driver.
    pub fn debug_summary(&self) -> String {
        format!(
            "entries={} buckets={} fast_heads={}/{} fast_bytes={} compressed_bytes={} disk_bytes={}",
            self.len,
            self.bucket_cap,
            self.in_fast,
            self.fast_cap,
            self.alloc.memory_usage(Tier::Fast),
            self.alloc.memory_usage(Tier::Compressed),
            self.alloc.memory_usage(Tier::Disk),
        )
    }
}

impl Drop for ChainedHashMap {
    fn drop(&mut self) {
        for &head in &self.heads {
            if head.is_null() {
                continue;
            }
            let mut cur = head;
            loop {
                let next_raw = BucketView::new(self.alloc.acquire(cur)).next_raw();
                self.alloc.flush(cur);
                self.alloc.destroy(cur);
                if next_raw == Handle::null().raw() {
                    break;
                }
                cur = Handle::from_raw(next_raw);
            }
        }
    }
}

/// Owned `(key, value)` pairs collected by `ChainedHashMap::iter`.
pub struct MapIter {
    pairs: std::vec::IntoIter<(Vec<u8>, u64)>,
}

impl Iterator for MapIter {
    type Item = (Vec<u8>, u64);

    fn next(&mut self) -> Option<Self::Item> {
        self.pairs.next()
    }
}
