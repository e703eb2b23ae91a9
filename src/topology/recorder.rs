//! Descriptive rows for every constructed device, exported as CSV.
//!
//! The recorder is an explicit accumulator owned by the caller. Rows get a
//! sequence id when written; the buffer is only emptied by an explicit
//! `flush_and_clear`, `clear` or `reset`.
//!
//! CSV columns (no header line):
//! `sequenceId,latitude,longitude,blockNumber,level,parentBlockNumber,regionTag,label`

use chrono::{DateTime, Datelike, TimeZone};
use log::info;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use super::types::Coordinate;

/// Region tag written when none is configured.
pub const DEFAULT_REGION_TAG: &str = "VIC";

/// Parent block number written for the root.
pub const NO_PARENT_BLOCK: i64 = -1;

/// Row content supplied by the assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRow {
    pub coordinate: Coordinate,
    pub block: u32,
    pub level: u8,
    pub parent_block: i64,
    pub label: String,
}

/// A stored row.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderRow {
    pub sequence_id: u64,
    pub latitude: f64,
    pub longitude: f64,
    pub block: u32,
    pub level: u8,
    pub parent_block: i64,
    pub region_tag: String,
    pub label: String,
}

impl RecorderRow {
    fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{}",
            self.sequence_id, self.latitude, self.longitude, self.block, self.level, self.parent_block, self.region_tag, self.label
        )
    }
}

/// Append-only row buffer with a running sequence counter.
///
/// The counter keeps running across builds; call [`reset`](Self::reset) to
/// start again at 0.
#[derive(Debug)]
pub struct TopologyRecorder {
    rows: Vec<RecorderRow>,
    next_sequence_id: u64,
    region_tag: String,
}

impl Default for TopologyRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_REGION_TAG)
    }
}

impl TopologyRecorder {
    pub fn new(region_tag: impl Into<String>) -> Self {
        Self {
            rows: Vec::new(),
            next_sequence_id: 0,
            region_tag: region_tag.into(),
        }
    }

    /// Append a row and return its sequence id.
    pub fn write(&mut self, row: DeviceRow) -> u64 {
        let sequence_id = self.next_sequence_id;
        self.next_sequence_id += 1;
        self.rows.push(RecorderRow {
            sequence_id,
            latitude: row.coordinate.latitude,
            longitude: row.coordinate.longitude,
            block: row.block,
            level: row.level,
            parent_block: row.parent_block,
            region_tag: self.region_tag.clone(),
            label: row.label,
        });
        sequence_id
    }

    /// Current buffer contents, in insertion order.
    pub fn snapshot(&self) -> &[RecorderRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sequence id the next row will get.
    pub fn next_sequence_id(&self) -> u64 {
        self.next_sequence_id
    }

    /// Render the buffer as CSV text.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();
        for row in &self.rows {
            // Writing into a String cannot fail
            let _ = writeln!(csv, "{}", row.to_csv_line());
        }
        csv
    }

    /// Current buffer length and counter, for [`rollback`](Self::rollback).
    pub(crate) fn checkpoint(&self) -> (usize, u64) {
        (self.rows.len(), self.next_sequence_id)
    }

    /// Discard rows written after `checkpoint` and rewind the counter.
    pub(crate) fn rollback(&mut self, checkpoint: (usize, u64)) {
        self.rows.truncate(checkpoint.0);
        self.next_sequence_id = checkpoint.1;
    }

    /// Drop buffered rows; the sequence counter keeps running.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Drop buffered rows and restart the sequence at 0.
    pub fn reset(&mut self) {
        self.rows.clear();
        self.next_sequence_id = 0;
    }

    /// Write the buffer to `dir/edgeResources-<month>_<day>_<year>_<epochMillis>.csv`
    /// and clear it.
    ///
    /// The buffer is kept if writing fails, so the caller may retry elsewhere.
    ///
    /// # Returns
    ///
    /// Path of the written file.
    pub fn flush_and_clear<Tz: TimeZone>(&mut self, dir: &Path, now: &DateTime<Tz>) -> std::io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(artifact_file_name(now));
        fs::write(&path, self.to_csv())?;
        info!("Written {} rows as {}", self.rows.len(), path.display());
        self.rows.clear();
        Ok(path)
    }
}

/// File name of the CSV artifact for a point in time.
pub fn artifact_file_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String {
    format!("edgeResources-{}_{}_{}_{}.csv", now.month(), now.day(), now.year(), now.timestamp_millis())
}
