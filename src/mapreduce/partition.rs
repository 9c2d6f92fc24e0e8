//! Hash shuffle: routes intermediate keys to reduce partitions
//!
//! Every caller that needs to know which partition owns a key goes through
//! [`partition_for`], so map-side bucketing and reduce-side indexing agree.

use super::types::{KeyValue, Partitions};
use fnv::FnvHasher;
use std::hash::Hasher;
use tracing::trace;

/// Stable 31-bit FNV-1a hash of a key
pub fn ihash(key: &str) -> u32 {
    let mut hasher = FnvHasher::default();
    hasher.write(key.as_bytes());
    (hasher.finish() & 0x7fff_ffff) as u32
}

/// Reduce partition that owns `key`
///
/// Returns `None` when there are no partitions to route to.
pub fn partition_for(key: &str, num_reduce: usize) -> Option<usize> {
    if num_reduce == 0 {
        return None;
    }
    Some(ihash(key) as usize % num_reduce)
}

/// Bucket map output by reduce partition
///
/// Pairs with an empty key are dropped. Values keep their emission order
/// inside each bucket.
pub fn partition_pairs(pairs: Vec<KeyValue>, num_reduce: usize) -> Partitions {
    let mut partitions = Partitions::new();
    for kv in pairs {
        if kv.key.is_empty() {
            trace!("Dropping pair with empty key (value {:?})", kv.value);
            continue;
        }
        match partition_for(&kv.key, num_reduce) {
            Some(reduce) => partitions.entry(reduce).or_default().push(kv),
            None => trace!("No reduce partitions, dropping key {:?}", kv.key),
        }
    }
    partitions
}
