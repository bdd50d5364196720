//! Argument parsing and key/value plumbing shared by every command module.

use bytes::Bytes;
use ember_core::{DbIndex, Error, Key};
use ember_primitives::Value;
use ember_storage::Store;

pub fn key(args: &[Bytes], idx: usize) -> Key {
    Key::from(args[idx].clone())
}

pub fn parse_i64(arg: &Bytes) -> Result<i64, Error> {
    std::str::from_utf8(arg).ok().and_then(|s| s.parse().ok()).ok_or(Error::NotAnInteger)
}

pub fn parse_f64(arg: &Bytes) -> Result<f64, Error> {
    std::str::from_utf8(arg).ok().and_then(|s| s.parse().ok()).ok_or(Error::InvalidScore)
}

pub fn upper(arg: &Bytes) -> String {
    String::from_utf8_lossy(arg).to_ascii_uppercase()
}

/// Runs `f` against the live value at `key`, first creating it via
/// `default` if absent. Surfaces `Error::WrongType` if `f` does (a
/// type-check mismatch inside `f` should map to that before calling
/// this, typically via [`require_type`]).
pub fn mutate_or_create<T>(
    store: &Store,
    db: DbIndex,
    k: &Key,
    default: impl FnOnce() -> Value,
    f: impl FnOnce(&mut Value) -> Result<T, Error>,
) -> Result<T, Error> {
    if !store.exists(db, k) {
        store.set(db, k.clone(), default());
    }
    store.with_value_mut(db, k, f).ok_or_else(|| Error::Internal("key vanished mid-mutation".into()))?
}

pub fn require_list(v: &mut Value) -> Result<&mut ember_primitives::List, Error> {
    v.as_list_mut().ok_or(Error::WrongType)
}

pub fn require_set(v: &mut Value) -> Result<&mut ember_primitives::Set, Error> {
    v.as_set_mut().ok_or(Error::WrongType)
}

pub fn require_hash(v: &mut Value) -> Result<&mut ember_primitives::Hash, Error> {
    v.as_hash_mut().ok_or(Error::WrongType)
}

pub fn require_zset(v: &mut Value) -> Result<&mut ember_primitives::SortedSet, Error> {
    v.as_sorted_set_mut().ok_or(Error::WrongType)
}
