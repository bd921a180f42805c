//! # logkv
//!
//! An embedded key-value store served over a line-oriented text protocol:
//! - Write-Ahead Logging (WAL) for durability, replayed on startup
//! - In-memory LSM index with a Bloom-filter fast path
//! - Partitioned on-disk store absorbing background flushes
//! - TCP (streaming sessions) and UDP (single-command datagrams) front-ends
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  TCP Server / UDP Loop                       │
//! │                   (Multiple Clients)                         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │        (write gate, persist cycle, startup recovery)         │
//! └──────┬──────────────────┬───────────────────────┬───────────┘
//!        │                  │                       │
//!        ▼                  ▼                       ▼
//! ┌─────────────┐   ┌──────────────┐       ┌───────────────┐
//! │     WAL     │   │  LSM Index   │ flush │  Disk Store   │
//! │  (append)   │   │ (memtable +  ├──────▶│ (partitioned  │
//! └─────────────┘   │    bloom)    │       │    files)     │
//!                   └──────────────┘       └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod engine;
pub mod lsm;
pub mod network;
pub mod protocol;
pub mod storage;
pub mod wal;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use engine::Engine;
pub use error::{Result, StoreError};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of logkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
