//! Point-in-time dump: a sequence of [`LogRecord::Set`] records, one
//! per live key, written atomically via a temp-file-then-rename.

use crate::format::{read_record, write_record};
use crate::record::LogRecord;
use crate::DurabilityError;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

pub struct SnapshotWriter;

impl SnapshotWriter {
    /// Writes `records` to a temp file beside `path`, then renames it
    /// into place — readers (and a crash mid-write) only ever see a
    /// complete file or the previous one.
    pub fn write_all(path: &Path, records: impl Iterator<Item = LogRecord>) -> Result<(), DurabilityError> {
        let tmp_path = tmp_path_for(path);
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            let mut count = 0usize;
            for record in records {
                write_record(&mut writer, &record)?;
                count += 1;
            }
            std::io::Write::flush(&mut writer)?;
            info!(count, path = %path.display(), "wrote snapshot");
        }
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

pub struct SnapshotReader;

impl SnapshotReader {
    pub fn read_all(path: &Path) -> Result<Vec<LogRecord>, DurabilityError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut records = Vec::new();
        while let Some(record) = read_record(&mut reader)? {
            records.push(record);
        }
        Ok(records)
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = tmp.extension().and_then(|e| e.to_str()).unwrap_or("");
    tmp.set_extension(format!("{ext}.tmp"));
    tmp
}

/// Current wall-clock time in milliseconds, used for `LASTSAVE`.
pub fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tempfile::tempdir;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.rdb");
        let records = vec![
            LogRecord::Set { db: 0, key: Bytes::from_static(b"k1"), value: crate::record::DurableValue::Str(Bytes::from_static(b"v1")), ttl_remaining: None },
            LogRecord::Set { db: 1, key: Bytes::from_static(b"k2"), value: crate::record::DurableValue::Str(Bytes::from_static(b"v2")), ttl_remaining: None },
        ];
        SnapshotWriter::write_all(&path, records.clone().into_iter()).unwrap();
        let loaded = SnapshotReader::read_all(&path).unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.rdb");
        assert_eq!(SnapshotReader::read_all(&path).unwrap(), Vec::new());
    }

    #[test]
    fn write_replaces_previous_snapshot_atomically() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.rdb");
        SnapshotWriter::write_all(
            &path,
            vec![LogRecord::FlushAll].into_iter(),
        )
        .unwrap();
        SnapshotWriter::write_all(
            &path,
            vec![LogRecord::Set { db: 0, key: Bytes::from_static(b"k"), value: crate::record::DurableValue::Str(Bytes::from_static(b"v")), ttl_remaining: None }].into_iter(),
        )
        .unwrap();
        let loaded = SnapshotReader::read_all(&path).unwrap();
        assert_eq!(loaded.len(), 1);
    }
}
