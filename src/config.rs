//! Configuration for logkv
//!
//! Loaded once at startup from a YAML file; every key is optional and falls
//! back to the defaults below.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, StoreError};

/// Default TCP listen port
pub const DEFAULT_TCP_PORT: u16 = 8080;
/// Default UDP listen port
pub const DEFAULT_UDP_PORT: u16 = 1053;
/// Default UDP receive buffer size in bytes
pub const DEFAULT_UDP_BUFFER_SIZE: usize = 1024;
/// Default listen address
pub const DEFAULT_HOST: &str = "localhost";
/// Default WAL file path
pub const DEFAULT_WAL_PATH: &str = "wal.aof";
/// Default memtable saturation bound (element count)
pub const DEFAULT_MAX_ELEMENTS_BEFORE_FLUSH: usize = 1024;
/// Default background cycle period in milliseconds
pub const DEFAULT_COMPACTION_FREQUENCY_MS: u64 = 5000;
/// Default expected distinct keys per memtable
pub const DEFAULT_BLOOM_CAPACITY: usize = 10_000;
/// Default Bloom filter target false-positive rate
pub const DEFAULT_BLOOM_ERROR_RATE: f64 = 0.01;
/// Default Disk Store shard count
pub const DEFAULT_NUM_OF_PARTITIONS: usize = 8;
/// Default Disk Store root directory
pub const DEFAULT_DIRECTORY: &str = "data";

/// Main configuration for a logkv instance
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen port
    pub port: u16,

    /// Listen address for both TCP and UDP
    pub host: String,

    /// UDP listen port
    pub udp_port: u16,

    /// UDP receive buffer in bytes
    pub udp_buffer_size: usize,

    // -------------------------------------------------------------------------
    // Engine Configuration
    // -------------------------------------------------------------------------
    /// WAL file path
    pub wal_path: PathBuf,

    /// Memtable saturation bound; exceeding it triggers a flush
    pub max_elements_before_flush: usize,

    /// Background persist cycle period (milliseconds)
    pub compaction_frequency_in_ms: u64,

    /// Expected distinct keys per memtable (Bloom filter sizing)
    pub bloom_capacity: usize,

    /// Target Bloom filter false-positive rate
    pub bloom_error_rate: f64,

    // -------------------------------------------------------------------------
    // Disk Store Configuration
    // -------------------------------------------------------------------------
    /// Disk Store shard count
    pub num_of_partitions: usize,

    /// Disk Store root directory
    pub directory: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_TCP_PORT,
            host: DEFAULT_HOST.to_string(),
            udp_port: DEFAULT_UDP_PORT,
            udp_buffer_size: DEFAULT_UDP_BUFFER_SIZE,
            wal_path: PathBuf::from(DEFAULT_WAL_PATH),
            max_elements_before_flush: DEFAULT_MAX_ELEMENTS_BEFORE_FLUSH,
            compaction_frequency_in_ms: DEFAULT_COMPACTION_FREQUENCY_MS,
            bloom_capacity: DEFAULT_BLOOM_CAPACITY,
            bloom_error_rate: DEFAULT_BLOOM_ERROR_RATE,
            num_of_partitions: DEFAULT_NUM_OF_PARTITIONS,
            directory: PathBuf::from(DEFAULT_DIRECTORY),
        }
    }
}

impl Config {
    /// Parse a YAML config file. Keys that are absent take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        serde_yaml::from_str(&data)
            .map_err(|e| StoreError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Load a config file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// TCP listen address (`host:port`)
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// UDP listen address (`host:udp_port`)
    pub fn udp_listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.udp_port)
    }
}
