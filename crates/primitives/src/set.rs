//! Unordered collection of unique binary-safe members.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Set {
    members: HashSet<Bytes>,
}

impl Set {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `members`, returning how many were not already present.
    pub fn add(&mut self, members: impl IntoIterator<Item = Bytes>) -> i64 {
        let mut added = 0;
        for m in members {
            if self.members.insert(m) {
                added += 1;
            }
        }
        added
    }

    /// Removes `members`, returning how many were actually present.
    pub fn remove(&mut self, members: &[Bytes]) -> i64 {
        let mut removed = 0;
        for m in members {
            if self.members.remove(m) {
                removed += 1;
            }
        }
        removed
    }

    pub fn contains(&self, member: &[u8]) -> bool {
        self.members.contains(member)
    }

    pub fn cardinality(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> impl Iterator<Item = &Bytes> {
        self.members.iter()
    }

    /// Moves `member` out of `self` and into `dest`, returning whether the
    /// move happened (no-op, returns `false`, if `member` was absent).
    pub fn move_member(&mut self, dest: &mut Set, member: &[u8]) -> bool {
        match self.members.take(member) {
            Some(m) => {
                dest.members.insert(m);
                true
            }
            None => false,
        }
    }

    /// Removes and returns up to `count` members at random.
    pub fn pop_random(&mut self, count: usize) -> Vec<Bytes> {
        use rand::seq::IteratorRandom;
        let chosen: Vec<Bytes> = self
            .members
            .iter()
            .cloned()
            .choose_multiple(&mut rand::thread_rng(), count.min(self.members.len()));
        for m in &chosen {
            self.members.remove(m);
        }
        chosen
    }

    /// Returns up to `|count|` members at random without removing them.
    /// Negative `count` allows the same member to be drawn more than once.
    pub fn get_random(&self, count: i64) -> Vec<Bytes> {
        use rand::seq::IteratorRandom;
        use rand::Rng;
        if self.members.is_empty() {
            return Vec::new();
        }
        let mut rng = rand::thread_rng();
        if count < 0 {
            let all: Vec<&Bytes> = self.members.iter().collect();
            (0..(-count) as usize).map(|_| all[rng.gen_range(0..all.len())].clone()).collect()
        } else {
            self.members.iter().cloned().choose_multiple(&mut rng, count as usize)
        }
    }

    pub fn union(sets: &[&Set]) -> Set {
        let mut out = Set::new();
        for s in sets {
            out.members.extend(s.members.iter().cloned());
        }
        out
    }

    pub fn intersect(sets: &[&Set]) -> Set {
        let mut out = Set::new();
        let Some((first, rest)) = sets.split_first() else {
            return out;
        };
        for m in &first.members {
            if rest.iter().all(|s| s.members.contains(m)) {
                out.members.insert(m.clone());
            }
        }
        out
    }

    pub fn difference(sets: &[&Set]) -> Set {
        let mut out = Set::new();
        let Some((first, rest)) = sets.split_first() else {
            return out;
        };
        for m in &first.members {
            if !rest.iter().any(|s| s.members.contains(m)) {
                out.members.insert(m.clone());
            }
        }
        out
    }

    pub fn memory_usage(&self) -> usize {
        self.members.iter().map(|m| m.len() + 16).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn add_is_idempotent() {
        let mut s = Set::new();
        assert_eq!(s.add(vec![b("a"), b("b")]), 2);
        assert_eq!(s.add(vec![b("a")]), 0);
        assert_eq!(s.cardinality(), 2);
    }

    #[test]
    fn move_member_transfers_ownership() {
        let mut src = Set::new();
        let mut dst = Set::new();
        src.add(vec![b("a")]);
        assert!(src.move_member(&mut dst, b"a"));
        assert!(!src.contains(b"a"));
        assert!(dst.contains(b"a"));
        assert!(!src.move_member(&mut dst, b"a"));
    }

    #[test]
    fn intersect_and_diff() {
        let mut a = Set::new();
        a.add(vec![b("x"), b("y"), b("z")]);
        let mut b1 = Set::new();
        b1.add(vec![b("y"), b("z"), b("w")]);
        let inter = Set::intersect(&[&a, &b1]);
        assert_eq!(inter.cardinality(), 2);
        assert!(inter.contains(b"y") && inter.contains(b"z"));

        let diff = Set::difference(&[&a, &b1]);
        assert_eq!(diff.cardinality(), 1);
        assert!(diff.contains(b"x"));
    }

    #[test]
    fn union_of_three() {
        let mut a = Set::new();
        a.add(vec![b("1")]);
        let mut c = Set::new();
        c.add(vec![b("2")]);
        let mut d = Set::new();
        d.add(vec![b("3")]);
        let u = Set::union(&[&a, &c, &d]);
        assert_eq!(u.cardinality(), 3);
    }
}
