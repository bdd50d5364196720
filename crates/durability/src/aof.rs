//! Append-only log: every mutating command is framed via
//! [`format::write_record`] and appended to a single growing file.
//! Replaying the file in order reconstructs the keyspace from empty.

use crate::format::{read_record, write_record};
use crate::record::LogRecord;
use crate::DurabilityError;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// How aggressively the log is flushed to disk.
///
/// Mirrors Redis's `appendfsync`: `Always` is the safest and slowest,
/// `No` leaves durability entirely to the OS page cache flush schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FsyncPolicy {
    Always,
    #[default]
    EverySec,
    No,
}

struct Inner {
    writer: BufWriter<File>,
    pending_since_fsync: bool,
}

/// A single append-only log file plus the bookkeeping needed to replay
/// or rewrite it. `ember-engine` is the only caller that knows how to
/// turn a live `Store` into [`LogRecord`]s and back; this type just
/// frames and persists whatever records it's handed.
pub struct AppendLog {
    path: PathBuf,
    policy: FsyncPolicy,
    inner: Mutex<Inner>,
}

impl AppendLog {
    pub fn open(path: impl Into<PathBuf>, policy: FsyncPolicy) -> Result<Self, DurabilityError> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, policy, inner: Mutex::new(Inner { writer: BufWriter::new(file), pending_since_fsync: false }) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `record`, applying the configured fsync policy.
    /// `EverySec` marks the write pending; the caller's background
    /// ticker is expected to call [`Self::fsync_if_due`] on a timer.
    pub fn append(&self, record: &LogRecord) -> Result<(), DurabilityError> {
        let mut inner = self.inner.lock();
        write_record(&mut inner.writer, record)?;
        inner.writer.flush()?;
        match self.policy {
            FsyncPolicy::Always => {
                inner.writer.get_ref().sync_data()?;
                inner.pending_since_fsync = false;
            }
            FsyncPolicy::EverySec => inner.pending_since_fsync = true,
            FsyncPolicy::No => {}
        }
        Ok(())
    }

    /// Syncs to disk if a write is outstanding under `EverySec`. No-op
    /// under the other two policies.
    pub fn fsync_if_due(&self) -> Result<(), DurabilityError> {
        let mut inner = self.inner.lock();
        if self.policy == FsyncPolicy::EverySec && inner.pending_since_fsync {
            inner.writer.get_ref().sync_data()?;
            inner.pending_since_fsync = false;
        }
        Ok(())
    }

    /// Replays every record currently on disk, in order. A trailing
    /// partial record (process died mid-write) is tolerated and
    /// dropped rather than treated as corruption.
    pub fn replay(path: &Path) -> Result<Vec<LogRecord>, DurabilityError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut records = Vec::new();
        loop {
            match read_record(&mut reader) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => break,
                Err(err) => {
                    warn!(%err, path = %path.display(), "stopping replay at first unreadable record");
                    break;
                }
            }
        }
        debug!(count = records.len(), "replayed append-only log");
        Ok(records)
    }

    /// Rewrites the log to contain exactly `records`, compacting away
    /// superseded mutations (Redis's `BGREWRITEAOF`). Writes to a temp
    /// file and renames over the original so a crash mid-rewrite never
    /// leaves a half-written log in place.
    pub fn rewrite(path: &Path, records: impl Iterator<Item = LogRecord>) -> Result<(), DurabilityError> {
        let tmp_path = path.with_extension("aof.rewrite");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            let mut count = 0usize;
            for record in records {
                write_record(&mut writer, &record)?;
                count += 1;
            }
            writer.flush()?;
            writer.get_ref().sync_data()?;
            debug!(count, "rewrote append-only log");
        }
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DurableValue;
    use bytes::Bytes;
    use tempfile::tempdir;

    fn set_record(db: u16, key: &str) -> LogRecord {
        LogRecord::Set { db, key: Bytes::copy_from_slice(key.as_bytes()), value: DurableValue::Str(Bytes::from_static(b"v")), ttl_remaining: None }
    }

    #[test]
    fn append_then_replay_preserves_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ember.aof");
        let log = AppendLog::open(&path, FsyncPolicy::Always).unwrap();
        log.append(&set_record(0, "a")).unwrap();
        log.append(&set_record(0, "b")).unwrap();
        log.append(&LogRecord::Delete { db: 0, key: Bytes::from_static(b"a") }).unwrap();

        let replayed = AppendLog::replay(&path).unwrap();
        assert_eq!(replayed.len(), 3);
        assert_eq!(replayed[2], LogRecord::Delete { db: 0, key: Bytes::from_static(b"a") });
    }

    #[test]
    fn replay_of_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.aof");
        assert!(AppendLog::replay(&path).unwrap().is_empty());
    }

    #[test]
    fn rewrite_replaces_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ember.aof");
        let log = AppendLog::open(&path, FsyncPolicy::Always).unwrap();
        log.append(&set_record(0, "a")).unwrap();
        log.append(&set_record(0, "b")).unwrap();
        drop(log);

        AppendLog::rewrite(&path, vec![set_record(0, "b")].into_iter()).unwrap();
        let replayed = AppendLog::replay(&path).unwrap();
        assert_eq!(replayed, vec![set_record(0, "b")]);
    }

    #[test]
    fn truncated_trailing_record_is_dropped_not_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ember.aof");
        let log = AppendLog::open(&path, FsyncPolicy::Always).unwrap();
        log.append(&set_record(0, "a")).unwrap();
        drop(log);

        let mut bytes = std::fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 2);
        std::fs::write(&path, bytes).unwrap();

        let replayed = AppendLog::replay(&path).unwrap();
        assert!(replayed.is_empty());
    }
}
