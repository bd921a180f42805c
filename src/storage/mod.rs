//! Disk Store Module
//!
//! Partitioned on-disk tier: sink for memtable flushes, source for cold
//! reads, and the data set streamed back into the LSM index at startup.
//!
//! ## Responsibilities
//! - Route keys to partitions by hash
//! - Durably absorb frozen memtables (tombstones remove records)
//! - Serve point lookups for keys no longer in the memtable
//! - Stream all records into the LSM index on startup

mod partition;

pub use partition::Partition;

use std::fs;
use std::path::{Path, PathBuf};

use xxhash_rust::xxh3::xxh3_64;

use crate::error::Result;
use crate::lsm::{LsmTree, Memtable, Slot};

/// Partitioned on-disk key-value store
pub struct DiskStore {
    directory: PathBuf,
    partitions: Vec<Partition>,
}

impl DiskStore {
    /// Open the store under `directory` with a fixed partition count,
    /// creating the directory if needed and reading any existing partition
    /// files.
    pub fn open(directory: &Path, num_partitions: usize) -> Result<Self> {
        fs::create_dir_all(directory)?;

        let mut partitions = Vec::with_capacity(num_partitions);
        for id in 0..num_partitions {
            partitions.push(Partition::open(directory, id)?);
        }

        Ok(Self {
            directory: directory.to_path_buf(),
            partitions,
        })
    }

    /// The partition owning `key`
    fn partition_for(&self, key: &str) -> &Partition {
        let id = (xxh3_64(key.as_bytes()) % self.partitions.len() as u64) as usize;
        &self.partitions[id]
    }

    /// Look up a key in its owning partition.
    pub fn get(&self, key: &str) -> Option<String> {
        self.partition_for(key).get(key)
    }

    /// Absorb a frozen memtable: route every entry to its partition, merge,
    /// and fsync each touched partition file. Returns only on full
    /// durability. On error the touched partitions keep their prior state
    /// and the caller retries on the next cycle.
    pub fn ingest(&self, frozen: &Memtable) -> Result<()> {
        let mut batches: Vec<Vec<(String, Slot)>> = vec![Vec::new(); self.partitions.len()];

        for (key, slot) in frozen.iter() {
            let id = (xxh3_64(key.as_bytes()) % self.partitions.len() as u64) as usize;
            batches[id].push((key.clone(), slot.clone()));
        }

        for (id, batch) in batches.into_iter().enumerate() {
            if batch.is_empty() {
                continue;
            }
            self.partitions[id].apply(&batch)?;
        }

        Ok(())
    }

    /// Stream every record on disk into the LSM index. Used at startup,
    /// before the WAL replay layers un-flushed mutations on top. Returns the
    /// number of records loaded.
    pub fn load_into(&self, lsm: &LsmTree) -> Result<usize> {
        let mut loaded = 0;
        for partition in &self.partitions {
            partition.for_each(|key, value| {
                lsm.load(key.to_string(), value.to_string());
                loaded += 1;
            });
        }
        Ok(loaded)
    }

    /// Number of partitions
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Total live records across all partitions
    pub fn total_entries(&self) -> usize {
        self.partitions.iter().map(|p| p.len()).sum()
    }

    /// The partitions themselves (read-only; used by tests and load)
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Store root directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}
