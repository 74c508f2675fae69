//! Append-only JSONL journal of pipeline events.
//!
//! The index keeps one record per filename; the journal keeps every outcome.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::warn;

use docsort_core::{PipelineEvent, Result};

/// Bytes read per step when scanning the journal backwards.
const TAIL_CHUNK: u64 = 8 * 1024;

pub struct EventJournal {
    path: PathBuf,
    lock: Mutex<()>,
}

impl EventJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event as a single line.
    pub fn append(&self, event: &PipelineEvent) -> Result<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let _guard = self.lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// The last `limit` events, oldest first. Malformed lines are skipped.
    ///
    /// Reads backwards from the end of the file, so the cost depends on
    /// `limit` rather than on the size of the journal.
    pub fn recent(&self, limit: usize) -> Result<Vec<PipelineEvent>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let _guard = self.lock.lock();
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut pos = file.metadata()?.len();
        // Head of a line whose start lies before `pos`.
        let mut carry: Vec<u8> = Vec::new();
        // Newest first.
        let mut events = Vec::new();

        while pos > 0 && events.len() < limit {
            let start = pos.saturating_sub(TAIL_CHUNK);
            let mut chunk = vec![0u8; (pos - start) as usize];
            file.seek(SeekFrom::Start(start))?;
            file.read_exact(&mut chunk)?;
            chunk.extend_from_slice(&carry);
            pos = start;

            let complete_from = if pos == 0 {
                0
            } else {
                match chunk.iter().position(|&b| b == b'\n') {
                    Some(i) => i + 1,
                    None => {
                        carry = chunk;
                        continue;
                    }
                }
            };

            for line in chunk[complete_from..].split(|&b| b == b'\n').rev() {
                if events.len() == limit {
                    break;
                }
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                match serde_json::from_slice::<PipelineEvent>(line) {
                    Ok(event) => events.push(event),
                    Err(e) => warn!("Skipping malformed journal line: {}", e),
                }
            }
            chunk.truncate(complete_from);
            carry = chunk;
        }

        events.reverse();
        Ok(events)
    }
}
