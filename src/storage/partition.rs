//! Disk Store partition
//!
//! One shard of the on-disk store. Each partition owns a single file of
//! sorted `key|value` lines and an in-memory ordered map mirroring it.
//! Reads are served from the map; an ingest merges into a copy of the map,
//! rewrites the file atomically (write-temp + rename + fsync), and only
//! then commits the copy, so a failed rewrite leaves the partition in its
//! prior state.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::error::Result;
use crate::lsm::Slot;

/// Field delimiter inside a partition file line
const DELIMITER: char = '|';

/// A single shard of the Disk Store
pub struct Partition {
    id: usize,
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl Partition {
    /// Open the partition file for `id` under `dir`, reading any existing
    /// records into memory. The file is created lazily on first ingest.
    pub fn open(dir: &Path, id: usize) -> Result<Self> {
        let path = dir.join(format!("partition_{id}.kv"));
        let mut entries = BTreeMap::new();

        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            for line in reader.lines() {
                let line = line?;
                if let Some((key, value)) = line.split_once(DELIMITER) {
                    entries.insert(key.to_string(), value.to_string());
                }
            }
        }

        Ok(Self {
            id,
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Partition id
    pub fn id(&self) -> usize {
        self.id
    }

    /// Path of the partition file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a key in this partition.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the partition holds no records
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Stream every live `(key, value)` to `sink`, in key order.
    pub fn for_each<F>(&self, mut sink: F)
    where
        F: FnMut(&str, &str),
    {
        for (key, value) in self.entries.read().iter() {
            sink(key, value);
        }
    }

    /// Merge a routed batch into this partition and durably rewrite its
    /// file. A tombstone removes the key. The in-memory map is only updated
    /// after the rewrite has been fsynced and renamed into place.
    pub fn apply(&self, batch: &[(String, Slot)]) -> Result<()> {
        let mut merged = self.entries.read().clone();
        for (key, slot) in batch {
            match slot {
                Slot::Value(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                Slot::Tombstone => {
                    merged.remove(key);
                }
            }
        }

        self.rewrite(&merged)?;
        *self.entries.write() = merged;
        Ok(())
    }

    /// Write the full record set to a temp sibling, fsync it, and rename it
    /// over the live file.
    fn rewrite(&self, records: &BTreeMap<String, String>) -> Result<()> {
        let tmp_path = self.path.with_extension("kv.tmp");

        {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            let mut writer = BufWriter::new(file);

            for (key, value) in records {
                writeln!(writer, "{key}{DELIMITER}{value}")?;
            }

            writer.flush()?;
            writer.get_ref().sync_all()?;
        }

        fs::rename(&tmp_path, &self.path)?;

        // Make the rename itself durable.
        if let Some(dir) = self.path.parent() {
            File::open(dir)?.sync_all()?;
        }

        Ok(())
    }
}
