//! Disk overflow reserve
//!
//! Fallback storage for batches the store refused. Records are serialized as
//! newline-delimited JSON into segment files named `{age}_{unix_ts}.log`.
//! New segments enter at age 0; before every segment write the directory is
//! rotated - each existing segment's age is incremented, and segments whose
//! incremented age reaches the retention count are deleted. The reserve is
//! terminal: nothing here replays spilled records, the naming is merely
//! parseable so external recovery tooling can find the oldest and newest
//! segments.
//!
//! Only the single consumer task writes here, so plain synchronous file I/O
//! is sufficient.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;

use crate::config::ReserveConfig;
use crate::record::AccessRecord;

const SEGMENT_EXT: &str = "log";

/// Errors from the overflow reserve.
#[derive(Debug, Error)]
pub enum ReserveError {
    /// The reserve directory could not be written at startup
    #[error("reserve directory '{path}' is not writable: {source}")]
    Unwritable {
        /// The configured directory
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Segment write or rotation failed
    #[error("reserve io error: {0}")]
    Io(#[from] io::Error),

    /// A record could not be serialized
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Outcome of one reserve operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReserveReceipt {
    /// Records serialized to disk
    pub records: u64,
    /// Segment files written
    pub segments: u64,
}

/// Disk-based fallback store for failed batches.
#[derive(Debug)]
pub struct Reserve {
    dir: PathBuf,
    max_segment_size: u64,
    max_files: u32,
}

impl Reserve {
    /// Open the reserve, creating the directory if needed and probing that
    /// it is writable. An unwritable directory is a fatal startup error -
    /// failing fast beats silently losing the durability fallback.
    pub fn open(config: &ReserveConfig) -> Result<Self, ReserveError> {
        let reserve = Self {
            dir: config.dir.clone(),
            max_segment_size: config.max_segment_size,
            max_files: config.max_files,
        };
        reserve.probe().map_err(|source| ReserveError::Unwritable {
            path: config.dir.display().to_string(),
            source,
        })?;
        Ok(reserve)
    }

    /// Create the directory and verify a file can be created, written,
    /// synced, and removed in it.
    fn probe(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let probe_path = self.dir.join(".probe");
        let mut file = fs::File::create(&probe_path)?;
        file.write_all(b"probe")?;
        file.sync_all()?;
        drop(file);
        fs::remove_file(&probe_path)
    }

    /// Serialize `batch` to one or more segment files.
    ///
    /// Records are appended to an in-memory buffer one JSON line at a time;
    /// whenever the next line would push the buffer past the segment size
    /// cap, the buffer is written out as a segment and a fresh one started.
    /// The remainder is written as a final segment. A single record larger
    /// than the cap becomes its own oversized segment.
    pub fn reserve(&self, batch: &[AccessRecord]) -> Result<ReserveReceipt, ReserveError> {
        let mut receipt = ReserveReceipt::default();
        let mut buf: Vec<u8> = Vec::new();

        for record in batch {
            let line = serde_json::to_vec(record)?;
            let appended = line.len() as u64 + 1;
            if !buf.is_empty() && buf.len() as u64 + appended > self.max_segment_size {
                self.write_segment(&buf)?;
                receipt.segments += 1;
                buf.clear();
            }
            buf.extend_from_slice(&line);
            buf.push(b'\n');
            receipt.records += 1;
        }

        if !buf.is_empty() {
            self.write_segment(&buf)?;
            receipt.segments += 1;
        }

        tracing::debug!(
            records = receipt.records,
            segments = receipt.segments,
            dir = %self.dir.display(),
            "batch spilled to overflow reserve"
        );
        Ok(receipt)
    }

    /// Rotate the directory, then write `data` as a new age-0 segment.
    fn write_segment(&self, data: &[u8]) -> Result<(), ReserveError> {
        self.rotate()?;

        if data.len() as u64 > self.max_segment_size {
            tracing::warn!(
                bytes = data.len(),
                cap = self.max_segment_size,
                "single record exceeds segment size cap, writing oversized segment"
            );
        }

        let name = format!("0_{}.{}", Utc::now().timestamp(), SEGMENT_EXT);
        fs::write(self.dir.join(name), data)?;
        Ok(())
    }

    /// Age every existing segment by one generation. Segments whose new age
    /// reaches the retention count are deleted, so at most `max_files`
    /// segments ever exist after a write.
    fn rotate(&self) -> Result<(), ReserveError> {
        let mut segments: Vec<(u32, String, PathBuf)> = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SEGMENT_EXT) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some((age, rest)) = parse_segment_name(name) else {
                tracing::warn!(file = name, "unparseable segment name, leaving in place");
                continue;
            };
            segments.push((age, rest.to_string(), path));
        }

        // Oldest generation first. Segments written in the same second share
        // their `{rest}` part, so the rename target `{age+1}_{rest}` is only
        // guaranteed vacant once the older generation has already moved on.
        segments.sort_by(|a, b| b.0.cmp(&a.0));

        for (age, rest, path) in segments {
            let next = age + 1;
            if next >= self.max_files {
                fs::remove_file(&path)?;
            } else {
                fs::rename(&path, self.dir.join(format!("{next}_{rest}")))?;
            }
        }
        Ok(())
    }

    /// The reserve directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Split `"{age}_{rest}"` into its age counter and remainder.
fn parse_segment_name(name: &str) -> Option<(u32, &str)> {
    let (age, rest) = name.split_once('_')?;
    Some((age.parse().ok()?, rest))
}

#[cfg(test)]
#[path = "reserve_test.rs"]
mod reserve_test;
