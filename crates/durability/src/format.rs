//! On-disk framing shared by the append-only log and snapshot files.
//!
//! ```text
//! ┌──────────────┬──────────────────┬───────────────┐
//! │ Length (4)   │ Payload (var)    │ CRC32 (4)     │
//! └──────────────┴──────────────────┴───────────────┘
//! ```
//!
//! `Length` and `CRC32` are little-endian and cover the rmp-serde
//! payload only. A record whose CRC doesn't match what's stored is
//! corruption, not absence — callers surface it as
//! [`crate::DurabilityError::Corrupt`] rather than silently truncating.

use crate::DurabilityError;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{self, Read, Write};

pub fn write_record<W: Write, T: Serialize>(writer: &mut W, record: &T) -> Result<(), DurabilityError> {
    let payload = rmp_serde::to_vec(record)?;
    let mut hasher = Hasher::new();
    hasher.update(&payload);
    let checksum = hasher.finalize();

    writer.write_u32::<LittleEndian>(payload.len() as u32)?;
    writer.write_all(&payload)?;
    writer.write_u32::<LittleEndian>(checksum)?;
    Ok(())
}

/// Reads one record, or `None` at a clean end-of-file (zero bytes read
/// for the length prefix).
pub fn read_record<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<Option<T>, DurabilityError> {
    let len = match reader.read_u32::<LittleEndian>() {
        Ok(len) => len,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload)?;
    let stored_checksum = reader.read_u32::<LittleEndian>()?;

    let mut hasher = Hasher::new();
    hasher.update(&payload);
    if hasher.finalize() != stored_checksum {
        return Err(DurabilityError::Corrupt("checksum mismatch".into()));
    }
    let record = rmp_serde::from_slice(&payload)?;
    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Cursor;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        a: u32,
        b: String,
    }

    #[test]
    fn roundtrip() {
        let mut buf = Vec::new();
        write_record(&mut buf, &Sample { a: 1, b: "hi".into() }).unwrap();
        write_record(&mut buf, &Sample { a: 2, b: "there".into() }).unwrap();

        let mut cursor = Cursor::new(buf);
        let r1: Sample = read_record(&mut cursor).unwrap().unwrap();
        let r2: Sample = read_record(&mut cursor).unwrap().unwrap();
        assert_eq!(r1, Sample { a: 1, b: "hi".into() });
        assert_eq!(r2, Sample { a: 2, b: "there".into() });
        let eof: Option<Sample> = read_record(&mut cursor).unwrap();
        assert_eq!(eof, None);
    }

    #[test]
    fn corrupted_payload_is_detected() {
        let mut buf = Vec::new();
        write_record(&mut buf, &Sample { a: 1, b: "hi".into() }).unwrap();
        buf[5] ^= 0xFF; // flip a byte inside the payload, leaving the stored CRC stale
        let mut cursor = Cursor::new(buf);
        let result: Result<Option<Sample>, _> = read_record(&mut cursor);
        assert!(matches!(result, Err(DurabilityError::Corrupt(_))));
    }
}
