//! Event log storage
//!
//! The event log is the append-only, ordered list of canonical
//! [`ActionRecord`]s for one capture session. It has to survive the capture
//! agent being torn down and re-injected on every page load, so backends are
//! pluggable:
//!
//! - [`InMemoryEventLog`]: process-lifetime storage, used by tests and by a
//!   controller that outlives page loads
//! - [`FileEventLog`]: one JSONL file per log, flushed to disk on every
//!   append so a crash or reload never loses an acknowledged record
//!
//! # Example
//!
//! ```rust
//! use retrace_core::capture::{ActionRecord, Coordinates};
//! use retrace_core::storage::{EventLog, InMemoryEventLog};
//!
//! let log = InMemoryEventLog::new();
//! log.append(&ActionRecord::scroll(Coordinates::new(0, 120), 1)).unwrap();
//! assert_eq!(log.len().unwrap(), 1);
//! ```

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::warn;

use crate::capture::ActionRecord;
use crate::error::{RetraceError, Result};

/// Durable, ordered record storage
///
/// All methods take `&self`; implementations use interior mutability so a
/// log can be shared behind an `Arc` between the session and its controller.
pub trait EventLog: Send + Sync {
    /// Append a record; it must be readable back once this returns `Ok`
    fn append(&self, record: &ActionRecord) -> Result<()>;

    /// All records in append order
    fn read_all(&self) -> Result<Vec<ActionRecord>>;

    /// Remove every record
    fn clear(&self) -> Result<()>;

    /// Number of stored records
    fn len(&self) -> Result<usize> {
        Ok(self.read_all()?.len())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// The most recently appended record
    fn last(&self) -> Result<Option<ActionRecord>> {
        Ok(self.read_all()?.pop())
    }

    /// Check if backend is usable
    fn health_check(&self) -> Result<()>;

    /// Backend name (for logging)
    fn name(&self) -> &'static str;
}

/// In-memory event log
///
/// Thread-safe via RwLock. Records are lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    records: RwLock<Vec<ActionRecord>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated log, as left behind by an earlier capture agent
    pub fn with_records(records: Vec<ActionRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

impl EventLog for InMemoryEventLog {
    fn append(&self, record: &ActionRecord) -> Result<()> {
        let mut records = self.records.write().map_err(|_| RetraceError::StorageLocked)?;
        records.push(record.clone());
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<ActionRecord>> {
        let records = self.records.read().map_err(|_| RetraceError::StorageLocked)?;
        Ok(records.clone())
    }

    fn clear(&self) -> Result<()> {
        let mut records = self.records.write().map_err(|_| RetraceError::StorageLocked)?;
        records.clear();
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        let records = self.records.read().map_err(|_| RetraceError::StorageLocked)?;
        Ok(records.len())
    }

    fn last(&self) -> Result<Option<ActionRecord>> {
        let records = self.records.read().map_err(|_| RetraceError::StorageLocked)?;
        Ok(records.last().cloned())
    }

    fn health_check(&self) -> Result<()> {
        let _records = self.records.read().map_err(|_| RetraceError::StorageLocked)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}

/// File-backed event log (JSONL)
///
/// One record per line in `<directory>/<key>.jsonl`. Appends are synced to
/// disk before returning. A torn final line (process killed mid-write) is
/// skipped on read and truncated away by the next append.
#[derive(Debug)]
pub struct FileEventLog {
    path: PathBuf,
    // Serializes appends against clear()
    write_lock: RwLock<()>,
}

impl FileEventLog {
    /// Open (or create) the log named `key` inside `directory`
    pub fn open<P: Into<PathBuf>>(directory: P, key: &str) -> Result<Self> {
        let dir = directory.into();
        std::fs::create_dir_all(&dir).map_err(|e| RetraceError::IoError {
            message: format!("Failed to create storage directory: {}", e),
        })?;
        Ok(Self {
            path: dir.join(format!("{}.jsonl", key)),
            write_lock: RwLock::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cut a partial final line left by an interrupted append
    fn discard_torn_tail(&self, file: &mut File) -> std::io::Result<()> {
        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(());
        }

        let mut last = [0u8; 1];
        file.seek(SeekFrom::Start(len - 1))?;
        file.read_exact(&mut last)?;
        if last[0] == b'\n' {
            return Ok(());
        }

        let mut contents = Vec::with_capacity(len as usize);
        file.seek(SeekFrom::Start(0))?;
        file.read_to_end(&mut contents)?;
        let keep = contents
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |newline| newline + 1);

        warn!(
            path = %self.path.display(),
            dropped_bytes = len - keep as u64,
            "Truncating torn final event log line"
        );
        file.set_len(keep as u64)?;
        file.sync_data()
    }
}

impl EventLog for FileEventLog {
    fn append(&self, record: &ActionRecord) -> Result<()> {
        let _guard = self.write_lock.write().map_err(|_| RetraceError::StorageLocked)?;

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| RetraceError::IoError {
                message: format!("Failed to open event log: {}", e),
            })?;

        self.discard_torn_tail(&mut file).map_err(|e| RetraceError::IoError {
            message: format!("Failed to repair event log: {}", e),
        })?;

        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        file.seek(SeekFrom::End(0))
            .and_then(|_| file.write_all(line.as_bytes()))
            .map_err(|e| RetraceError::IoError {
                message: format!("Failed to write event log: {}", e),
            })?;
        file.sync_data().map_err(|e| RetraceError::IoError {
            message: format!("Failed to sync event log: {}", e),
        })?;

        Ok(())
    }

    fn read_all(&self) -> Result<Vec<ActionRecord>> {
        let _guard = self.write_lock.read().map_err(|_| RetraceError::StorageLocked)?;

        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = std::fs::File::open(&self.path).map_err(|e| RetraceError::IoError {
            message: format!("Failed to open event log: {}", e),
        })?;

        let lines: Vec<String> = BufReader::new(file)
            .lines()
            .collect::<std::io::Result<_>>()
            .map_err(|e| RetraceError::IoError {
                message: format!("Failed to read event log: {}", e),
            })?;

        let last_index = lines.len().saturating_sub(1);
        let mut records = Vec::with_capacity(lines.len());
        for (index, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ActionRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) if index == last_index => {
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "Skipping torn final event log line"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(records)
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.write().map_err(|_| RetraceError::StorageLocked)?;
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|e| RetraceError::IoError {
                message: format!("Failed to delete event log: {}", e),
            })?;
        }
        Ok(())
    }

    fn health_check(&self) -> Result<()> {
        match self.path.parent() {
            Some(dir) if dir.is_dir() => Ok(()),
            _ => Err(RetraceError::IoError {
                message: "Event log directory does not exist".to_string(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Coordinates;

    fn sample(ts: i64) -> ActionRecord {
        ActionRecord::click("#go", Coordinates::new(1, 2), ts)
    }

    #[test]
    fn test_in_memory_log() {
        let log = InMemoryEventLog::new();
        log.append(&sample(1)).unwrap();
        log.append(&sample(2)).unwrap();

        assert_eq!(log.len().unwrap(), 2);
        assert_eq!(log.last().unwrap().unwrap().timestamp(), 2);

        log.clear().unwrap();
        assert!(log.is_empty().unwrap());
        assert!(log.last().unwrap().is_none());
    }

    #[test]
    fn test_file_log_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();

        {
            let log = FileEventLog::open(dir.path(), "session").unwrap();
            log.append(&sample(1)).unwrap();
            log.append(&ActionRecord::input("#q", "rust", 2)).unwrap();
        }

        let reopened = FileEventLog::open(dir.path(), "session").unwrap();
        let records = reopened.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], ActionRecord::input("#q", "rust", 2));
        assert_eq!(reopened.name(), "file");
        reopened.health_check().unwrap();
    }

    #[test]
    fn test_file_log_skips_torn_tail() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileEventLog::open(dir.path(), "torn").unwrap();
        log.append(&sample(1)).unwrap();

        let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
        write!(file, "{{\"action\":\"click\",\"loc").unwrap();

        let records = log.read_all().unwrap();
        assert_eq!(records, vec![sample(1)]);
    }

    #[test]
    fn test_append_after_torn_tail_is_durable() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileEventLog::open(dir.path(), "torn-append").unwrap();
        log.append(&ActionRecord::navigate("https://a.test/", "A", 1)).unwrap();

        let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
        write!(file, "{{\"action\":\"click\",\"loc").unwrap();
        drop(file);

        log.append(&sample(2)).unwrap();
        assert_eq!(log.len().unwrap(), 2);

        log.append(&sample(3)).unwrap();
        let records = log.read_all().unwrap();
        assert_eq!(
            records,
            vec![ActionRecord::navigate("https://a.test/", "A", 1), sample(2), sample(3)]
        );
        assert_eq!(log.last().unwrap(), Some(sample(3)));
    }

    #[test]
    fn test_append_after_torn_only_line() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileEventLog::open(dir.path(), "torn-only").unwrap();
        std::fs::write(log.path(), "{\"action\":\"scr").unwrap();

        log.append(&sample(1)).unwrap();
        assert_eq!(log.read_all().unwrap(), vec![sample(1)]);
    }

    #[test]
    fn test_file_log_rejects_corrupt_middle() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileEventLog::open(dir.path(), "corrupt").unwrap();
        std::fs::write(log.path(), "not json\n{\"action\":\"scroll\",\"coordinates\":{\"x\":0,\"y\":9},\"timestamp\":1}\n").unwrap();

        assert!(matches!(log.read_all(), Err(RetraceError::JsonError(_))));
    }

    #[test]
    fn test_file_log_clear() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileEventLog::open(dir.path(), "clear").unwrap();
        log.append(&sample(1)).unwrap();
        log.clear().unwrap();

        assert!(!log.path().exists());
        assert!(log.read_all().unwrap().is_empty());
    }
}
