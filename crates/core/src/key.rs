//! Binary-safe key and logical-database index types.

use bytes::Bytes;
use std::fmt;

/// A binary-safe key. Keys are arbitrary byte strings, not necessarily UTF-8.
///
/// Cloning a `Key` is O(1): it shares the underlying buffer via `Bytes`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Bytes);

impl Key {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Key(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key(Bytes::from(s.into_bytes()))
    }
}

impl From<Vec<u8>> for Key {
    fn from(v: Vec<u8>) -> Self {
        Key(Bytes::from(v))
    }
}

impl From<Bytes> for Key {
    fn from(b: Bytes) -> Self {
        Key(b)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "Key({:?})", s),
            Err(_) => write!(f, "Key({:?})", &self.0[..]),
        }
    }
}

/// Index of one of the engine's up-to-2^16 independent logical databases.
///
/// Databases are created lazily on first reference (see the keyspace store).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DbIndex(u16);

impl DbIndex {
    pub const MAX: u32 = 1 << 16;

    pub fn new(index: u16) -> Self {
        DbIndex(index)
    }

    pub fn as_u16(self) -> u16 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl Default for DbIndex {
    fn default() -> Self {
        DbIndex(0)
    }
}

impl fmt::Display for DbIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_from_str_and_debug() {
        let k = Key::from("hello");
        assert_eq!(k.as_bytes(), b"hello");
        assert_eq!(format!("{:?}", k), "Key(\"hello\")");
    }

    #[test]
    fn key_clone_is_cheap_share() {
        let k1 = Key::from("shared");
        let k2 = k1.clone();
        assert_eq!(k1, k2);
    }

    #[test]
    fn db_index_default_is_zero() {
        assert_eq!(DbIndex::default().as_u16(), 0);
    }

    #[test]
    fn db_index_roundtrip() {
        let idx = DbIndex::new(42);
        assert_eq!(idx.as_u16(), 42);
        assert_eq!(idx.as_usize(), 42usize);
    }
}
