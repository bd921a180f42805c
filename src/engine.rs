//! Engine Module
//!
//! The storage engine coordinating WAL, LSM index, and Disk Store.
//!
//! ## Responsibilities
//! - Write path: WAL append, then memtable mutation, then acknowledgement
//! - Read path: WAL persist (when dirty), memtable lookup, disk fallback
//! - Startup orchestration: disk load, then WAL replay, then background cycle
//! - Background persist cycle: freeze → ingest → WAL truncate
//! - Graceful shutdown: cycle completes, WAL persisted
//!
//! ## Concurrency
//! Mutations serialize through a write gate that the persist cycle also
//! holds across freeze → ingest → truncate. This is what makes truncation
//! safe: while the gate is held no new record can enter the WAL, so
//! truncation only ever drops records whose entries are durably on disk.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::lsm::{LsmTree, Lookup};
use crate::protocol::{Command, Response};
use crate::storage::DiskStore;
use crate::wal::{Record, Wal};

/// The storage engine
pub struct Engine {
    config: Config,
    wal: Wal,
    lsm: LsmTree,
    store: DiskStore,

    /// Serializes mutations against the flush protocol
    write_gate: Mutex<()>,

    /// Nudges the persist cycle when the memtable saturates
    flush_tx: Sender<()>,
    flush_rx: Receiver<()>,

    /// Set once; the persist cycle exits after its current iteration
    shutdown: Arc<AtomicBool>,

    /// Handle of the persist cycle thread, once started
    cycle: Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    /// Open the engine: construct all components, stream the Disk Store
    /// into the LSM index, then replay outstanding WAL records on top.
    ///
    /// The WAL holds the most recent un-flushed mutations, so it must be
    /// replayed after the disk load to overwrite any stale disk values.
    /// Saturation accounting is suppressed for both phases; the first
    /// cycle tick flushes any over-capacity memtable.
    ///
    /// A failure here is a recovery failure: the caller must abort rather
    /// than serve traffic from a partially recovered state.
    pub fn open(config: Config) -> Result<Self> {
        let store = DiskStore::open(&config.directory, config.num_of_partitions)?;

        if let Some(parent) = config.wal_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let wal = Wal::open(&config.wal_path)?;

        let lsm = LsmTree::new(
            config.max_elements_before_flush,
            config.bloom_capacity,
            config.bloom_error_rate,
        );

        let loaded = store.load_into(&lsm)?;
        tracing::info!(
            "loaded {} records from {} partitions",
            loaded,
            store.partition_count()
        );

        let replayed = wal.replay(|record| match record {
            Record::Put { key, value } => lsm.load(key, value),
            Record::Delete { key } => lsm.load_tombstone(key),
        })?;
        tracing::info!("replayed {} WAL records", replayed);

        let (flush_tx, flush_rx) = bounded(1);

        Ok(Self {
            config,
            wal,
            lsm,
            store,
            write_gate: Mutex::new(()),
            flush_tx,
            flush_rx,
            shutdown: Arc::new(AtomicBool::new(false)),
            cycle: Mutex::new(None),
        })
    }

    // =========================================================================
    // Client Operations
    // =========================================================================

    /// Store `value` under `key`. Acknowledged only once the record is in
    /// the WAL buffer and the memtable reflects it.
    pub fn put(&self, key: String, value: String) -> Result<()> {
        validate_key(&key)?;
        validate_value(&value)?;

        {
            let _gate = self.write_gate.lock();
            self.lsm.check_capacity()?;
            self.wal.append(&Record::Put {
                key: key.clone(),
                value: value.clone(),
            })?;
            self.lsm.put(key, value);
        }

        self.request_flush_if_saturated();
        Ok(())
    }

    /// Delete `key` by recording a tombstone.
    pub fn del(&self, key: String) -> Result<()> {
        validate_key(&key)?;

        {
            let _gate = self.write_gate.lock();
            self.lsm.check_capacity()?;
            self.wal.append(&Record::Delete { key: key.clone() })?;
            self.lsm.del(key);
        }

        self.request_flush_if_saturated();
        Ok(())
    }

    /// Fetch the value for `key`, or `None` if absent or deleted.
    ///
    /// Forces WAL persistence first (skipped when nothing is buffered), so
    /// no caller can observe a value whose record is not yet durable.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.wal.persist_if_dirty()?;

        match self.lsm.get(key) {
            Lookup::Found(value) => Ok(Some(value)),
            Lookup::Deleted => Ok(None),
            Lookup::Absent => Ok(self.store.get(key)),
        }
    }

    /// Execute a parsed protocol command and render the response.
    pub fn execute(&self, command: Command) -> Response {
        match command {
            Command::Put { key, value } => match self.put(key, value) {
                Ok(()) => Response::Ok,
                Err(e) => Response::Error(e.to_string()),
            },
            Command::Get { key } => match self.get(&key) {
                Ok(Some(value)) => Response::Value(value),
                Ok(None) => Response::NotFound,
                Err(e) => Response::Error(e.to_string()),
            },
            Command::Del { key } => match self.del(key) {
                Ok(()) => Response::Ok,
                Err(e) => Response::Error(e.to_string()),
            },
        }
    }

    // =========================================================================
    // Flush Protocol
    // =========================================================================

    /// Flush the memtable to the Disk Store, then truncate the WAL.
    ///
    /// Holds the write gate across the whole sequence. On ingest failure the
    /// frozen entries are merged back under the active memtable (newer keys
    /// win) and the WAL is left intact, so no acknowledged write is lost;
    /// the cycle retries on its next tick. Returns the number of entries
    /// flushed.
    pub fn flush(&self) -> Result<usize> {
        let _gate = self.write_gate.lock();

        if self.lsm.is_empty() {
            return Ok(0);
        }

        let frozen = self.lsm.freeze();
        let count = frozen.len();

        if let Err(e) = self.store.ingest(&frozen) {
            self.lsm.restore(frozen);
            return Err(e);
        }

        // Every WAL record is now covered by durable partition files.
        self.wal.truncate()?;

        Ok(count)
    }

    /// Spawn the background persist cycle. Call after `open` has finished
    /// loading and replaying, and before listeners accept traffic.
    pub fn start_persist_cycle(engine: &Arc<Engine>) -> Result<()> {
        let cloned = Arc::clone(engine);
        let handle = thread::Builder::new()
            .name("logkv-persist".to_string())
            .spawn(move || cloned.persist_cycle())?;

        *engine.cycle.lock() = Some(handle);
        Ok(())
    }

    /// The background loop: one flush attempt per compaction period, or
    /// earlier when a saturated writer nudges the channel. Iterations never
    /// overlap. A failed flush is logged and retried on the next tick.
    fn persist_cycle(&self) {
        let period = Duration::from_millis(self.config.compaction_frequency_in_ms.max(1));
        tracing::debug!("persist cycle started (period {:?})", period);

        loop {
            match self.flush_rx.recv_timeout(period) {
                Ok(()) | Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            match self.flush() {
                Ok(0) => {}
                Ok(count) => tracing::debug!("flushed {} entries to disk", count),
                Err(e) => tracing::warn!("flush failed, retrying next cycle: {}", e),
            }

            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }
        }

        tracing::debug!("persist cycle stopped");
    }

    fn request_flush_if_saturated(&self) {
        if self.lsm.is_saturated() {
            // A full channel means a flush is already pending.
            let _ = self.flush_tx.try_send(());
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Graceful shutdown: stop the persist cycle, let its current iteration
    /// complete, and persist the WAL so every acknowledged mutation is on
    /// stable storage.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        let _ = self.flush_tx.try_send(());

        if let Some(handle) = self.cycle.lock().take() {
            if handle.join().is_err() {
                tracing::error!("persist cycle thread panicked");
            }
        }

        if let Err(e) = self.wal.persist() {
            tracing::error!("failed to persist WAL during shutdown: {}", e);
        } else {
            tracing::info!("engine shut down, WAL persisted");
        }
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Entries in the active memtable (tombstones included)
    pub fn memtable_len(&self) -> usize {
        self.lsm.len()
    }

    /// Live records across all Disk Store partitions
    pub fn disk_entries(&self) -> usize {
        self.store.total_entries()
    }

    /// The engine's configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Keys are opaque tokens with three reserved characters: whitespace (the
/// protocol tokenizer), and pipe/newline (the WAL framing). Such tokens are
/// rejected rather than escaped.
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey("key must not be empty".to_string()));
    }
    if key.contains(|c: char| c.is_whitespace() || c == '|') {
        return Err(StoreError::InvalidKey(
            "key must not contain whitespace or '|'".to_string(),
        ));
    }
    Ok(())
}

/// Same restrictions as keys.
fn validate_value(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(StoreError::InvalidValue(
            "value must not be empty".to_string(),
        ));
    }
    if value.contains(|c: char| c.is_whitespace() || c == '|') {
        return Err(StoreError::InvalidValue(
            "value must not contain whitespace or '|'".to_string(),
        ));
    }
    Ok(())
}
