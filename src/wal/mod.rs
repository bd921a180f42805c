//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging.
//!
//! ## Responsibilities
//! - Buffer one record per mutation before the memtable is touched
//! - Flush-and-fsync on demand (`persist`), the synchronization point that
//!   every read forces before it observes state
//! - Replay surviving records onto the LSM index at startup
//! - Truncate after the Disk Store has durably absorbed a flush
//!
//! All operations serialize through a single internal lock.

mod record;

pub use record::Record;

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::Result;

/// Append-only durability log for mutations
pub struct Wal {
    inner: Mutex<WalInner>,
}

struct WalInner {
    path: PathBuf,

    /// Buffered writer; records may sit here until the next persist
    writer: BufWriter<File>,

    /// Whether any append has happened since the last persist
    dirty: bool,
}

impl Wal {
    /// Open an existing WAL file or create a new one, positioned for append.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Wal {
            inner: Mutex::new(WalInner {
                path: path.to_path_buf(),
                writer: BufWriter::new(file),
                dirty: false,
            }),
        })
    }

    /// Buffer one record. The record is durable only after the next
    /// [`persist`](Self::persist); callers that acknowledge the mutation rely
    /// on every subsequent read forcing that persist first.
    pub fn append(&self, record: &Record) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.writer.write_all(record.encode().as_bytes())?;
        inner.dirty = true;
        Ok(())
    }

    /// Flush the userspace buffer and fsync the file. After return, every
    /// previously appended record is on stable storage.
    pub fn persist(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.flush_and_sync()
    }

    /// Persist only if appends are buffered since the last persist.
    ///
    /// This is what the read path calls: when no mutation is outstanding the
    /// fsync is skipped entirely.
    pub fn persist_if_dirty(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.dirty {
            inner.flush_and_sync()?;
        }
        Ok(())
    }

    /// Read the file from the beginning and feed every valid record to
    /// `apply`, in order. Malformed lines are skipped silently; only I/O
    /// errors fail the replay. Returns the number of records applied.
    pub fn replay<F>(&self, mut apply: F) -> Result<usize>
    where
        F: FnMut(Record),
    {
        let inner = self.inner.lock();

        let file = File::open(&inner.path)?;
        let reader = BufReader::new(file);

        let mut applied = 0;
        for line in reader.lines() {
            let line = line?;
            if let Some(record) = Record::parse(&line) {
                apply(record);
                applied += 1;
            }
        }

        Ok(applied)
    }

    /// Empty the file and reset the write offset to zero. Called only after
    /// the Disk Store has durably absorbed the records being dropped.
    pub fn truncate(&self) -> Result<()> {
        let mut inner = self.inner.lock();

        // Flush first so the BufWriter holds no stale bytes that would
        // resurface after the truncation.
        inner.writer.flush()?;

        let file = inner.writer.get_mut();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;

        inner.dirty = false;
        Ok(())
    }

    /// Path of the underlying file
    pub fn path(&self) -> PathBuf {
        self.inner.lock().path.clone()
    }
}

impl WalInner {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.dirty = false;
        Ok(())
    }
}
