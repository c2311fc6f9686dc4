//! # Channel Snapshot Module
//!
//! Records decoded channel state to JSONL (JSON Lines) files.
//!
//! One record per line:
//! ```text
//! {"timestamp":"2026-01-01T12:00:00Z","channels":[992,...],"stale":false,"stats":{...}}
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::crsf::decoder::{CrsfDecoder, DecodeStats};
use crate::crsf::protocol::RcChannels;
use crate::error::Result;

/// One point-in-time view of a decoder
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSnapshot {
    /// Wall-clock time the snapshot was taken
    pub timestamp: DateTime<Utc>,

    /// Last valid channel values
    pub channels: RcChannels,

    /// No valid frame within the failsafe timeout
    pub stale: bool,

    /// Milliseconds since the last valid frame, if any
    pub age_ms: Option<u64>,

    /// Decode outcome counters
    pub stats: DecodeStats,
}

impl ChannelSnapshot {
    /// Capture the decoder's state at `now`
    ///
    /// `stale` is set when no valid RC frame arrived within `failsafe_timeout`.
    pub fn capture(decoder: &CrsfDecoder, now: Instant, failsafe_timeout: Duration) -> Self {
        let age = decoder
            .last_update()
            .map(|t| now.saturating_duration_since(t));

        Self {
            timestamp: Utc::now(),
            channels: decoder.channels(),
            stale: age.map_or(true, |age| age > failsafe_timeout),
            age_ms: age.map(|age| age.as_millis() as u64),
            stats: decoder.stats(),
        }
    }
}

/// Appends snapshots to a JSONL file
#[derive(Debug)]
pub struct SnapshotWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    records: u64,
}

impl SnapshotWriter {
    /// Open `path` for appending, creating parent directories as needed
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be created
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            records: 0,
        })
    }

    /// Write one snapshot as a single JSON line
    pub fn write(&mut self, snapshot: &ChannelSnapshot) -> Result<()> {
        serde_json::to_writer(&mut self.writer, snapshot)?;
        self.writer.write_all(b"\n")?;
        self.records += 1;
        Ok(())
    }

    /// Flush buffered records to disk
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Records written since open
    pub fn records(&self) -> u64 {
        self.records
    }

    /// File being written
    pub fn path(&self) -> &Path {
        &self.path
    }
}
