//! LSM Index Module
//!
//! The mutable tier of the store: accepts writes, serves hot reads, and
//! produces ordered batches for flushing.
//!
//! ## Responsibilities
//! - Memtable mutation under a reader-writer lock
//! - Bloom-filter fast path that skips memtable lookups for absent keys
//! - Saturation tracking for the flush trigger
//! - Atomic freeze: swap in a fresh memtable and hand back the frozen one
//!
//! ## Data Structure Choice
//! A `BTreeMap` behind `parking_lot::RwLock`: ordered keys (required for
//! deterministic flush output), concurrent readers, single writer.

mod bloom;
mod memtable;

pub use bloom::BloomFilter;
pub use memtable::{Memtable, Slot};

use parking_lot::RwLock;

use crate::error::{Result, StoreError};

/// Hard cap on memtable growth, as a multiple of the flush threshold.
/// Past this the engine refuses writes instead of growing unboundedly
/// while the Disk Store is failing.
const HARD_LIMIT_FACTOR: usize = 8;

/// Outcome of an LSM lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// A live value in the memtable
    Found(String),

    /// A tombstone: the key is deleted, do not consult lower tiers
    Deleted,

    /// The memtable has no opinion; fall through to the Disk Store
    Absent,
}

/// In-memory mutable index: active memtable plus its Bloom filter
pub struct LsmTree {
    memtable: RwLock<Memtable>,

    /// Covers the active memtable and everything flushed from it since
    /// startup. Never reset during operation; deletes do not update it,
    /// tombstones in the memtable carry the "not found" answer instead.
    bloom: RwLock<BloomFilter>,

    /// Element count that triggers a flush
    max_elements: usize,
}

impl LsmTree {
    /// Create an empty index.
    pub fn new(max_elements: usize, bloom_capacity: usize, bloom_error_rate: f64) -> Self {
        Self {
            memtable: RwLock::new(Memtable::new()),
            bloom: RwLock::new(BloomFilter::new(bloom_capacity, bloom_error_rate)),
            max_elements,
        }
    }

    /// Insert or overwrite a key.
    pub fn put(&self, key: String, value: String) {
        self.bloom.write().insert(&key);
        self.memtable.write().put(key, value);
    }

    /// Record a deletion. The Bloom filter is not updated: filters cannot
    /// remove, so the tombstone in the memtable is what answers "not found".
    pub fn del(&self, key: String) {
        self.memtable.write().delete(key);
    }

    /// Look up a key, consulting the Bloom filter first.
    pub fn get(&self, key: &str) -> Lookup {
        if !self.bloom.read().contains(key) {
            // Definitely not in the memtable; skip straight to disk.
            return Lookup::Absent;
        }

        match self.memtable.read().get(key) {
            Some(Slot::Value(v)) => Lookup::Found(v.clone()),
            Some(Slot::Tombstone) => Lookup::Deleted,
            None => Lookup::Absent,
        }
    }

    /// Insert during startup load, bypassing saturation accounting.
    pub fn load(&self, key: String, value: String) {
        self.put(key, value);
    }

    /// Record a deletion during startup replay, bypassing saturation
    /// accounting.
    pub fn load_tombstone(&self, key: String) {
        self.del(key);
    }

    /// Whether the element count has exceeded the flush threshold.
    pub fn is_saturated(&self) -> bool {
        self.memtable.read().len() > self.max_elements
    }

    /// Fail writes once the memtable has grown to the hard cap.
    pub fn check_capacity(&self) -> Result<()> {
        if self.memtable.read().len() >= self.max_elements.saturating_mul(HARD_LIMIT_FACTOR) {
            return Err(StoreError::MemtableFull);
        }
        Ok(())
    }

    /// Number of entries in the active memtable (tombstones included)
    pub fn len(&self) -> usize {
        self.memtable.read().len()
    }

    /// Whether the active memtable is empty
    pub fn is_empty(&self) -> bool {
        self.memtable.read().is_empty()
    }

    /// Swap in a fresh empty memtable and return the frozen one. The Bloom
    /// filter is left in place: it keeps covering the flushed keys, and a
    /// positive answer for a flushed key simply falls through to disk.
    pub fn freeze(&self) -> Memtable {
        std::mem::take(&mut *self.memtable.write())
    }

    /// Merge a frozen memtable back under the active one after a failed
    /// ingest. Keys written since the freeze are newer and win.
    pub fn restore(&self, frozen: Memtable) {
        let mut active = self.memtable.write();
        for (key, slot) in frozen.into_entries() {
            active.insert_if_absent(key, slot);
        }
    }
}
