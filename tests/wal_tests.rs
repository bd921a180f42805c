//! Tests for the Write-Ahead Log
//!
//! These tests verify:
//! - Record framing (pipe-delimited, newline-terminated lines)
//! - Append / persist / replay round trips
//! - Silent skipping of malformed records
//! - Truncation

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use logkv::wal::{Record, Wal};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("wal.aof");
    (temp_dir, wal_path)
}

fn put(key: &str, value: &str) -> Record {
    Record::Put {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn del(key: &str) -> Record {
    Record::Delete {
        key: key.to_string(),
    }
}

fn collect_replay(wal: &Wal) -> Vec<Record> {
    let mut records = Vec::new();
    wal.replay(|r| records.push(r)).unwrap();
    records
}

// =============================================================================
// Append + Replay Tests
// =============================================================================

#[test]
fn test_append_persist_replay() {
    let (_temp, wal_path) = setup_temp_wal();

    let wal = Wal::open(&wal_path).unwrap();
    wal.append(&put("key1", "value1")).unwrap();
    wal.append(&put("key2", "value2")).unwrap();
    wal.append(&del("key1")).unwrap();
    wal.persist().unwrap();

    let records = collect_replay(&wal);
    assert_eq!(
        records,
        vec![put("key1", "value1"), put("key2", "value2"), del("key1")]
    );
}

#[test]
fn test_replay_survives_reopen() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let wal = Wal::open(&wal_path).unwrap();
        wal.append(&put("a", "1")).unwrap();
        wal.append(&put("b", "2")).unwrap();
        wal.persist().unwrap();
    }

    let wal = Wal::open(&wal_path).unwrap();
    let records = collect_replay(&wal);
    assert_eq!(records, vec![put("a", "1"), put("b", "2")]);
}

#[test]
fn test_reopen_appends_rather_than_truncating() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let wal = Wal::open(&wal_path).unwrap();
        wal.append(&put("old", "data")).unwrap();
        wal.persist().unwrap();
    }
    {
        let wal = Wal::open(&wal_path).unwrap();
        wal.append(&put("new", "data")).unwrap();
        wal.persist().unwrap();
    }

    let wal = Wal::open(&wal_path).unwrap();
    assert_eq!(collect_replay(&wal), vec![put("old", "data"), put("new", "data")]);
}

#[test]
fn test_file_format_on_disk() {
    let (_temp, wal_path) = setup_temp_wal();

    let wal = Wal::open(&wal_path).unwrap();
    wal.append(&put("foo", "bar")).unwrap();
    wal.append(&del("foo")).unwrap();
    wal.persist().unwrap();

    let contents = fs::read_to_string(&wal_path).unwrap();
    assert_eq!(contents, "+|foo|bar|\n-|foo|\n");
}

#[test]
fn test_append_is_buffered_until_persist() {
    let (_temp, wal_path) = setup_temp_wal();

    let wal = Wal::open(&wal_path).unwrap();
    wal.append(&put("buffered", "entry")).unwrap();

    // Nothing reaches the file until persist.
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), 0);

    wal.persist().unwrap();
    assert!(fs::metadata(&wal_path).unwrap().len() > 0);
}

// =============================================================================
// Malformed Record Tests
// =============================================================================

#[test]
fn test_malformed_lines_are_skipped() {
    let (_temp, wal_path) = setup_temp_wal();

    // Hand-craft a WAL with garbage interleaved between valid records.
    let mut file = fs::File::create(&wal_path).unwrap();
    file.write_all(b"+|good|value|\n").unwrap();
    file.write_all(b"this is not a record\n").unwrap();
    file.write_all(b"?|unknown|op|\n").unwrap();
    file.write_all(b"+|missing-fields\n").unwrap();
    file.write_all(b"-|gone|\n").unwrap();
    drop(file);

    let wal = Wal::open(&wal_path).unwrap();
    let records = collect_replay(&wal);
    assert_eq!(records, vec![put("good", "value"), del("gone")]);
}

#[test]
fn test_replay_of_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();

    let wal = Wal::open(&wal_path).unwrap();
    assert_eq!(wal.replay(|_| panic!("no records expected")).unwrap(), 0);
}

// =============================================================================
// Truncate Tests
// =============================================================================

#[test]
fn test_truncate_empties_the_file() {
    let (_temp, wal_path) = setup_temp_wal();

    let wal = Wal::open(&wal_path).unwrap();
    wal.append(&put("k1", "v1")).unwrap();
    wal.append(&put("k2", "v2")).unwrap();
    wal.persist().unwrap();

    wal.truncate().unwrap();

    assert_eq!(fs::metadata(&wal_path).unwrap().len(), 0);
    assert_eq!(collect_replay(&wal).len(), 0);
}

#[test]
fn test_append_after_truncate() {
    let (_temp, wal_path) = setup_temp_wal();

    let wal = Wal::open(&wal_path).unwrap();
    wal.append(&put("before", "x")).unwrap();
    wal.persist().unwrap();
    wal.truncate().unwrap();

    wal.append(&put("after", "y")).unwrap();
    wal.persist().unwrap();

    assert_eq!(collect_replay(&wal), vec![put("after", "y")]);
}

#[test]
fn test_truncate_discards_buffered_records() {
    let (_temp, wal_path) = setup_temp_wal();

    let wal = Wal::open(&wal_path).unwrap();
    wal.append(&put("staged", "only")).unwrap();
    // Not persisted; truncate must still leave an empty file behind.
    wal.truncate().unwrap();

    assert_eq!(fs::metadata(&wal_path).unwrap().len(), 0);
    assert_eq!(collect_replay(&wal).len(), 0);
}
