//! Chained hash map: packed bucket layout, the hashing scheme, and the
//! map itself with its Clock eviction sweep.

mod bucket;
mod hash;
mod hashmap;

pub use hashmap::{ChainedHashMap, MapIter};
