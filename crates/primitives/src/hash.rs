//! Field-value map with optional per-field expiration.
//!
//! `IndexMap` keeps field insertion order (Redis `HGETALL`/`HKEYS` return
//! fields in the order they were first set) while still giving `O(1)`
//! lookup. The TTL added here is not part of the classic Redis hash type;
//! it exists so `HEXPIRE`/`HPERSIST`/`HTTL` can attach a lifetime to an
//! individual field without promoting the whole key to a sorted-set-style
//! container.

use bytes::Bytes;
use ember_core::Clock;
use indexmap::IndexMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct FieldEntry {
    value: Bytes,
    expires_at: Option<Instant>,
}

#[derive(Debug, Clone, Default)]
pub struct Hash {
    fields: IndexMap<Bytes, FieldEntry>,
}

/// Outcome of a conditional field set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Created,
    Updated,
    /// Rejected because `set_nx` was used on an existing field.
    Unchanged,
}

impl Hash {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `now` is used to treat an already-expired field as absent without
    /// waiting for the next sweep.
    pub fn get(&self, field: &[u8], now: Instant) -> Option<&Bytes> {
        let entry = self.fields.get(field)?;
        if entry.expires_at.is_some_and(|at| at <= now) {
            return None;
        }
        Some(&entry.value)
    }

    pub fn contains(&self, field: &[u8], now: Instant) -> bool {
        self.get(field, now).is_some()
    }

    /// Unconditional set. Returns whether `field` was newly created.
    pub fn set(&mut self, field: Bytes, value: Bytes) -> bool {
        match self.fields.insert(field, FieldEntry { value, expires_at: None }) {
            Some(_) => false,
            None => true,
        }
    }

    /// Sets `field` only if absent (or logically expired).
    pub fn set_nx(&mut self, field: Bytes, value: Bytes, now: Instant) -> SetOutcome {
        if self.contains(&field, now) {
            return SetOutcome::Unchanged;
        }
        let created = !self.fields.contains_key(&field);
        self.fields.insert(field, FieldEntry { value, expires_at: None });
        if created {
            SetOutcome::Created
        } else {
            SetOutcome::Updated
        }
    }

    /// Removes `field`s, returning how many were present.
    pub fn remove(&mut self, fields: &[Bytes]) -> i64 {
        let mut removed = 0;
        for f in fields {
            if self.fields.shift_remove(f).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Adds `delta` to the integer parsed from `field`'s current value
    /// (treating an absent field as `0`), storing and returning the result.
    pub fn incr_by(&mut self, field: Bytes, delta: i64, now: Instant) -> Result<i64, std::num::ParseIntError> {
        let current = match self.get(&field, now) {
            Some(v) => std::str::from_utf8(v).unwrap_or("0").parse::<i64>()?,
            None => 0,
        };
        let next = current.wrapping_add(delta);
        self.fields.insert(field, FieldEntry { value: Bytes::from(next.to_string()), expires_at: None });
        Ok(next)
    }

    pub fn incr_by_float(&mut self, field: Bytes, delta: f64, now: Instant) -> Result<f64, std::num::ParseFloatError> {
        let current = match self.get(&field, now) {
            Some(v) => std::str::from_utf8(v).unwrap_or("0").parse::<f64>()?,
            None => 0.0,
        };
        let next = current + delta;
        self.fields.insert(field, FieldEntry { value: Bytes::from(next.to_string()), expires_at: None });
        Ok(next)
    }

    pub fn keys(&self, now: Instant) -> Vec<Bytes> {
        self.live_iter(now).map(|(k, _)| k.clone()).collect()
    }

    pub fn values(&self, now: Instant) -> Vec<Bytes> {
        self.live_iter(now).map(|(_, e)| e.value.clone()).collect()
    }

    pub fn entries(&self, now: Instant) -> Vec<(Bytes, Bytes)> {
        self.live_iter(now).map(|(k, e)| (k.clone(), e.value.clone())).collect()
    }

    fn live_iter(&self, now: Instant) -> impl Iterator<Item = (&Bytes, &FieldEntry)> {
        self.fields.iter().filter(move |(_, e)| !e.expires_at.is_some_and(|at| at <= now))
    }

    /// Attaches (or replaces) a TTL on `field`. No-op, returns `false`,
    /// if the field does not exist.
    pub fn expire_field(&mut self, field: &[u8], at: Instant) -> bool {
        match self.fields.get_mut(field) {
            Some(entry) => {
                entry.expires_at = Some(at);
                true
            }
            None => false,
        }
    }

    /// Clears `field`'s TTL, making it persistent again.
    pub fn persist_field(&mut self, field: &[u8]) -> bool {
        match self.fields.get_mut(field) {
            Some(entry) if entry.expires_at.is_some() => {
                entry.expires_at = None;
                true
            }
            _ => false,
        }
    }

    pub fn field_ttl(&self, field: &[u8], now: Instant) -> Option<Option<std::time::Duration>> {
        let entry = self.fields.get(field)?;
        if entry.expires_at.is_some_and(|at| at <= now) {
            return None;
        }
        Some(entry.expires_at.map(|at| at.saturating_duration_since(now)))
    }

    /// Removes every field whose TTL has elapsed as of `clock.now()`,
    /// returning how many were swept. Called from the same active-expiration
    /// sweep that handles whole-key TTLs.
    pub fn sweep_expired_fields(&mut self, clock: &dyn Clock) -> usize {
        let now = clock.now();
        let expired: Vec<Bytes> = self
            .fields
            .iter()
            .filter(|(_, e)| e.expires_at.is_some_and(|at| at <= now))
            .map(|(k, _)| k.clone())
            .collect();
        let count = expired.len();
        for k in expired {
            self.fields.shift_remove(&k);
        }
        count
    }

    pub fn memory_usage(&self) -> usize {
        self.fields.iter().map(|(k, e)| k.len() + e.value.len() + 32).sum()
    }

    /// Flattens live fields to `(field, value, ttl_remaining)` for
    /// persistence. `Instant` itself is never serialized — only the
    /// duration remaining as of `now`, reconstituted against a fresh
    /// `Instant` on load via [`Self::from_plain`].
    pub fn to_plain(&self, now: Instant) -> Vec<(Bytes, Bytes, Option<Duration>)> {
        self.live_iter(now)
            .map(|(k, e)| (k.clone(), e.value.clone(), e.expires_at.map(|at| at.saturating_duration_since(now))))
            .collect()
    }

    pub fn from_plain(fields: Vec<(Bytes, Bytes, Option<Duration>)>, now: Instant) -> Self {
        let mut hash = Self::new();
        for (field, value, ttl) in fields {
            hash.fields.insert(field, FieldEntry { value, expires_at: ttl.map(|d| now + d) });
        }
        hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::SystemClock;

    fn b(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn set_nx_rejects_existing() {
        let mut h = Hash::new();
        let now = Instant::now();
        assert_eq!(h.set_nx(b("f"), b("v1"), now), SetOutcome::Created);
        assert_eq!(h.set_nx(b("f"), b("v2"), now), SetOutcome::Unchanged);
        assert_eq!(h.get(b"f", now), Some(&b("v1")));
    }

    #[test]
    fn incr_by_parses_and_stores() {
        let mut h = Hash::new();
        let now = Instant::now();
        assert_eq!(h.incr_by(b("n"), 5, now).unwrap(), 5);
        assert_eq!(h.incr_by(b("n"), -2, now).unwrap(), 3);
    }

    #[test]
    fn field_expiry_hides_then_sweeps() {
        let mut h = Hash::new();
        let clock = SystemClock::new();
        let now = clock.now();
        h.set(b("f"), b("v"));
        assert!(h.expire_field(b"f", now - std::time::Duration::from_secs(1)));
        assert!(h.get(b"f", now).is_none());
        assert_eq!(h.len(), 1);
        assert_eq!(h.sweep_expired_fields(&clock), 1);
        assert_eq!(h.len(), 0);
    }

    #[test]
    fn persist_field_clears_ttl() {
        let mut h = Hash::new();
        let now = Instant::now();
        h.set(b("f"), b("v"));
        h.expire_field(b"f", now + std::time::Duration::from_secs(60));
        assert!(h.persist_field(b"f"));
        assert_eq!(h.field_ttl(b"f", now), Some(None));
    }

    #[test]
    fn to_plain_from_plain_roundtrips_ttl() {
        let mut h = Hash::new();
        let now = Instant::now();
        h.set(b("f"), b("v"));
        h.expire_field(b"f", now + Duration::from_secs(30));
        let flat = h.to_plain(now);
        let restored = Hash::from_plain(flat, now);
        let ttl = restored.field_ttl(b"f", now).unwrap().unwrap();
        assert!(ttl <= Duration::from_secs(30) && ttl > Duration::from_secs(29));
    }

    #[test]
    fn insertion_order_preserved() {
        let mut h = Hash::new();
        let now = Instant::now();
        h.set(b("z"), b("1"));
        h.set(b("a"), b("2"));
        h.set(b("m"), b("3"));
        assert_eq!(h.keys(now), vec![b("z"), b("a"), b("m")]);
    }
}
