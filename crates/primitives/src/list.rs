//! Doubly-ended sequence of binary-safe elements, ordered by insertion.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct List {
    items: VecDeque<Bytes>,
}

impl List {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push_left(&mut self, values: impl IntoIterator<Item = Bytes>) -> usize {
        for v in values {
            self.items.push_front(v);
        }
        self.items.len()
    }

    pub fn push_right(&mut self, values: impl IntoIterator<Item = Bytes>) -> usize {
        for v in values {
            self.items.push_back(v);
        }
        self.items.len()
    }

    pub fn pop_left(&mut self, count: usize) -> Vec<Bytes> {
        (0..count).filter_map(|_| self.items.pop_front()).collect()
    }

    pub fn pop_right(&mut self, count: usize) -> Vec<Bytes> {
        (0..count).filter_map(|_| self.items.pop_back()).collect()
    }

    fn resolve_index(&self, index: i64) -> Option<usize> {
        let len = self.items.len() as i64;
        let i = if index < 0 { len + index } else { index };
        if i < 0 || i >= len {
            None
        } else {
            Some(i as usize)
        }
    }

    pub fn get(&self, index: i64) -> Option<&Bytes> {
        self.items.get(self.resolve_index(index)?)
    }

    pub fn set(&mut self, index: i64, value: Bytes) -> bool {
        match self.resolve_index(index) {
            Some(i) => {
                self.items[i] = value;
                true
            }
            None => false,
        }
    }

    /// Redis-style inclusive range with negative-index wraparound.
    pub fn range(&self, start: i64, stop: i64) -> Vec<Bytes> {
        let len = self.items.len() as i64;
        if len == 0 {
            return Vec::new();
        }
        let norm = |i: i64| if i < 0 { (len + i).max(0) } else { i };
        let lo = norm(start).min(len - 1).max(0);
        let hi = norm(stop).min(len - 1);
        if hi < lo {
            return Vec::new();
        }
        self.items.iter().skip(lo as usize).take((hi - lo + 1) as usize).cloned().collect()
    }

    /// Removes up to `count` occurrences of `value`.
    ///
    /// `count > 0` walks head-to-tail, `count < 0` walks tail-to-head,
    /// `count == 0` removes every occurrence. Returns the number removed.
    pub fn remove_value(&mut self, count: i64, value: &[u8]) -> usize {
        if count == 0 {
            let before = self.items.len();
            self.items.retain(|v| v.as_ref() != value);
            return before - self.items.len();
        }
        let limit = count.unsigned_abs() as usize;
        let mut removed = 0;
        if count > 0 {
            let mut kept = VecDeque::with_capacity(self.items.len());
            for item in self.items.drain(..) {
                if removed < limit && item.as_ref() == value {
                    removed += 1;
                } else {
                    kept.push_back(item);
                }
            }
            self.items = kept;
        } else {
            let mut kept = VecDeque::with_capacity(self.items.len());
            for item in self.items.drain(..).rev() {
                if removed < limit && item.as_ref() == value {
                    removed += 1;
                } else {
                    kept.push_front(item);
                }
            }
            self.items = kept;
        }
        removed
    }

    /// Trims the list so only `[start, stop]` (Redis-style, inclusive,
    /// negative-index) survives.
    pub fn trim(&mut self, start: i64, stop: i64) {
        let kept = self.range(start, stop);
        self.items = kept.into();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bytes> {
        self.items.iter()
    }

    pub fn memory_usage(&self) -> usize {
        self.items.iter().map(|v| v.len() + 16).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn push_and_range() {
        let mut l = List::new();
        l.push_right(vec![b("a"), b("b"), b("c")]);
        l.push_left(vec![b("z")]);
        assert_eq!(l.range(0, -1), vec![b("z"), b("a"), b("b"), b("c")]);
    }

    #[test]
    fn negative_index_get_and_set() {
        let mut l = List::new();
        l.push_right(vec![b("a"), b("b"), b("c")]);
        assert_eq!(l.get(-1), Some(&b("c")));
        assert!(l.set(-1, b("z")));
        assert_eq!(l.get(2), Some(&b("z")));
    }

    #[test]
    fn remove_value_directional() {
        let mut l = List::new();
        l.push_right(vec![b("a"), b("x"), b("a"), b("x"), b("a")]);
        assert_eq!(l.remove_value(2, b"a"), 2);
        assert_eq!(l.range(0, -1), vec![b("x"), b("x"), b("a")]);
    }

    #[test]
    fn remove_value_from_tail() {
        let mut l = List::new();
        l.push_right(vec![b("a"), b("x"), b("a")]);
        assert_eq!(l.remove_value(-1, b"a"), 1);
        assert_eq!(l.range(0, -1), vec![b("a"), b("x")]);
    }

    #[test]
    fn trim_keeps_window() {
        let mut l = List::new();
        l.push_right(vec![b("a"), b("b"), b("c"), b("d")]);
        l.trim(1, 2);
        assert_eq!(l.range(0, -1), vec![b("b"), b("c")]);
    }
}
