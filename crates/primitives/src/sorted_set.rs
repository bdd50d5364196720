//! Sorted set: unique members ordered by `(score, member)`.
//!
//! Maintains both a member→score map and a `BTreeSet<(Score, Bytes)>`
//! index so that rank/range/score/lex queries are all `O(log n + k)`.
//! The two structures are kept in lockstep by every mutating method —
//! never mutate `by_score` without updating `scores` in the same call,
//! and vice versa.

use bytes::Bytes;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors specific to sorted-set operations.
#[derive(Debug, Error, PartialEq)]
pub enum ZSetError {
    #[error("score is not a number (NaN)")]
    NotANumber,
    #[error("GT, LT, and/or NX options at the same time are not compatible")]
    IncompatibleOptions,
    #[error("INCR option supports a single increment-element pair")]
    IncrSingleElementOnly,
    #[error("resulting score is not a number (NaN)")]
    ResultingScoreNotANumber,
}

type Result<T> = std::result::Result<T, ZSetError>;

/// `f64` wrapper that is `Ord` because sorted-set scores may never be NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Score(f64);

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).expect("NaN score")
    }
}

/// Existence condition for `add_or_update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    None,
    /// Only update members that already exist.
    Xx,
    /// Only create new members; never modify an existing one.
    Nx,
}

/// Directional condition for `add_or_update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    None,
    /// Update only when the new score is strictly greater.
    Gt,
    /// Update only when the new score is strictly less.
    Lt,
}

/// Outcome of `add_or_update`.
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    /// Count of added members, or added+modified when `changed` was requested.
    Count(i64),
    /// The new score of the single member touched, for `incr` mode.
    /// `None` means the update was rejected by NX/XX/GT/LT.
    Incremented(Option<f64>),
}

/// Aggregator for `union`/`inter`/`diff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Min,
    Max,
}

impl Aggregate {
    fn combine(self, acc: f64, v: f64) -> f64 {
        match self {
            Aggregate::Sum => acc + v,
            Aggregate::Min => acc.min(v),
            Aggregate::Max => acc.max(v),
        }
    }
}

/// Combinator kind for `combine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Union,
    Inter,
    Diff,
}

#[derive(Debug, Clone, Default)]
pub struct SortedSet {
    /// member -> score, insertion order preserved for deterministic iteration
    /// when scores tie (not load-bearing for ordering, only for stable output).
    scores: IndexMap<Bytes, f64>,
    by_score: BTreeSet<(Score, Bytes)>,
}

impl SortedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn score(&self, member: &[u8]) -> Option<f64> {
        self.scores.get(member).copied()
    }

    pub fn contains(&self, member: &[u8]) -> bool {
        self.scores.contains_key(member)
    }

    /// Flat `(member, score)` pairs for persistence; rebuild with
    /// [`Self::from_pairs`].
    pub fn snapshot(&self) -> Vec<(Bytes, f64)> {
        self.scores.iter().map(|(m, s)| (m.clone(), *s)).collect()
    }

    pub fn from_pairs(pairs: Vec<(Bytes, f64)>) -> Self {
        let mut set = Self::new();
        for (member, score) in pairs {
            set.insert_raw(member, score);
        }
        set
    }

    /// Memory footprint estimate for the memory governor: member bytes
    /// plus a fixed per-entry overhead for the score and index nodes.
    pub fn memory_usage(&self) -> usize {
        self.scores
            .keys()
            .map(|m| m.len() + std::mem::size_of::<f64>() * 2 + 24)
            .sum()
    }

    fn insert_raw(&mut self, member: Bytes, score: f64) {
        if let Some(old) = self.scores.insert(member.clone(), score) {
            self.by_score.remove(&(Score(old), member.clone()));
        }
        self.by_score.insert((Score(score), member));
    }

    fn remove_raw(&mut self, member: &[u8]) -> Option<f64> {
        let old = self.scores.shift_remove(member)?;
        self.by_score.remove(&(Score(old), Bytes::copy_from_slice(member)));
        Some(old)
    }

    pub fn remove(&mut self, member: &[u8]) -> bool {
        self.remove_raw(member).is_some()
    }

    /// Rank of `member` (0 = lowest score), or `None` if absent.
    pub fn rank(&self, member: &[u8]) -> Option<usize> {
        let score = self.score(member)?;
        let target = (Score(score), Bytes::copy_from_slice(member));
        Some(self.by_score.range(..&target).count())
    }

    /// Add members or update their scores.
    ///
    /// `members` is `(score, member)` pairs. `incr` treats `score` as a
    /// delta applied to the member's current score (default 0) rather
    /// than an absolute value, and is rejected for more than one member.
    pub fn add_or_update(
        &mut self,
        members: Vec<(f64, Bytes)>,
        policy: UpdatePolicy,
        comparison: Comparison,
        changed: bool,
        incr: bool,
    ) -> Result<AddOutcome> {
        if members.iter().any(|(s, _)| s.is_nan()) {
            return Err(ZSetError::NotANumber);
        }
        if policy == UpdatePolicy::Nx && comparison != Comparison::None {
            return Err(ZSetError::IncompatibleOptions);
        }
        if incr && members.len() > 1 {
            return Err(ZSetError::IncrSingleElementOnly);
        }

        if incr {
            let (delta, member) = members.into_iter().next().unwrap();
            let existing = self.score(&member);
            let new_score = existing.unwrap_or(0.0) + delta;
            if new_score.is_nan() {
                return Err(ZSetError::ResultingScoreNotANumber);
            }
            if !self.update_allowed(existing, new_score, policy, comparison) {
                return Ok(AddOutcome::Incremented(None));
            }
            self.insert_raw(member, new_score);
            return Ok(AddOutcome::Incremented(Some(new_score)));
        }

        let mut added = 0i64;
        let mut changed_count = 0i64;
        for (score, member) in members {
            let existing = self.score(&member);
            if !self.update_allowed(existing, score, policy, comparison) {
                continue;
            }
            match existing {
                None => {
                    added += 1;
                    changed_count += 1;
                    self.insert_raw(member, score);
                }
                Some(old) => {
                    if old != score {
                        changed_count += 1;
                        self.insert_raw(member, score);
                    }
                }
            }
        }
        Ok(AddOutcome::Count(if changed { changed_count } else { added }))
    }

    fn update_allowed(
        &self,
        existing: Option<f64>,
        new_score: f64,
        policy: UpdatePolicy,
        comparison: Comparison,
    ) -> bool {
        match (existing, policy) {
            (Some(_), UpdatePolicy::Nx) => return false,
            (None, UpdatePolicy::Xx) => return false,
            _ => {}
        }
        if let Some(old) = existing {
            match comparison {
                Comparison::Gt if new_score <= old => return false,
                Comparison::Lt if new_score >= old => return false,
                Comparison::Gt | Comparison::Lt if old.is_infinite() && new_score != old => {
                    return false;
                }
                _ => {}
            }
        }
        true
    }

    pub fn incr_by(&mut self, member: Bytes, delta: f64) -> Result<f64> {
        match self.add_or_update(vec![(delta, member)], UpdatePolicy::None, Comparison::None, false, true)? {
            AddOutcome::Incremented(Some(score)) => Ok(score),
            _ => unreachable!("unconditional incr always succeeds"),
        }
    }

    /// Members by rank range `[start, stop]` (inclusive, Redis-style
    /// negative indices count from the end). `reverse` walks from the
    /// highest score down.
    pub fn range_by_rank(&self, start: i64, stop: i64, reverse: bool) -> Vec<(Bytes, f64)> {
        let len = self.len() as i64;
        if len == 0 {
            return Vec::new();
        }
        let (lo, hi) = match normalize_range(start, stop, len) {
            Some(r) => r,
            None => return Vec::new(),
        };
        let iter: Box<dyn Iterator<Item = &(Score, Bytes)>> = if reverse {
            Box::new(self.by_score.iter().rev())
        } else {
            Box::new(self.by_score.iter())
        };
        iter.skip(lo as usize)
            .take((hi - lo + 1) as usize)
            .map(|(s, m)| (m.clone(), s.0))
            .collect()
    }

    /// Members with `min <= score <= max` (or exclusive at either end).
    pub fn range_by_score(
        &self,
        min: f64,
        min_exclusive: bool,
        max: f64,
        max_exclusive: bool,
        offset: usize,
        count: Option<usize>,
        reverse: bool,
    ) -> Vec<(Bytes, f64)> {
        let mut out: Vec<(Bytes, f64)> = self
            .by_score
            .iter()
            .filter(|(s, _)| {
                let above_min = if min_exclusive { s.0 > min } else { s.0 >= min };
                let below_max = if max_exclusive { s.0 < max } else { s.0 <= max };
                above_min && below_max
            })
            .map(|(s, m)| (m.clone(), s.0))
            .collect();
        if reverse {
            out.reverse();
        }
        apply_window(out, offset, count)
    }

    /// Members with lexicographic value between `min` and `max`.
    ///
    /// Caller contract (per design): valid only when every member in
    /// the queried range shares a single score; this method does not
    /// itself verify that precondition.
    pub fn range_by_lex(
        &self,
        min: LexBound,
        max: LexBound,
        offset: usize,
        count: Option<usize>,
        reverse: bool,
    ) -> Vec<Bytes> {
        let mut members: Vec<&Bytes> = self.by_score.iter().map(|(_, m)| m).collect();
        members.sort();
        let mut out: Vec<Bytes> = members
            .into_iter()
            .filter(|m| min.matches_lower(m) && max.matches_upper(m))
            .cloned()
            .collect();
        if reverse {
            out.reverse();
        }
        apply_window(out, offset, count)
    }

    pub fn lex_count(&self, min: LexBound, max: LexBound) -> usize {
        self.range_by_lex(min, max, 0, None, false).len()
    }

    pub fn count_by_score(&self, min: f64, min_exclusive: bool, max: f64, max_exclusive: bool) -> usize {
        self.range_by_score(min, min_exclusive, max, max_exclusive, 0, None, false).len()
    }

    pub fn pop_min(&mut self, n: usize) -> Vec<(Bytes, f64)> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let Some((score, member)) = self.by_score.iter().next().cloned() else {
                break;
            };
            self.remove_raw(&member);
            out.push((member, score.0));
        }
        out
    }

    pub fn pop_max(&mut self, n: usize) -> Vec<(Bytes, f64)> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let Some((score, member)) = self.by_score.iter().next_back().cloned() else {
                break;
            };
            self.remove_raw(&member);
            out.push((member, score.0));
        }
        out
    }

    /// `n` random members with their scores. Negative `n` allows repeats
    /// and returns `|n|` draws; positive `n` returns up to `n` distinct
    /// members.
    pub fn random(&self, n: i64) -> Vec<(Bytes, f64)> {
        use rand::seq::SliceRandom;
        use rand::Rng;
        if self.is_empty() {
            return Vec::new();
        }
        let all: Vec<(Bytes, f64)> = self.scores.iter().map(|(m, s)| (m.clone(), *s)).collect();
        let mut rng = rand::thread_rng();
        if n < 0 {
            let count = (-n) as usize;
            (0..count).map(|_| all[rng.gen_range(0..all.len())].clone()).collect()
        } else {
            let count = (n as usize).min(all.len());
            let mut shuffled = all;
            shuffled.shuffle(&mut rng);
            shuffled.truncate(count);
            shuffled
        }
    }

    /// Combine `inputs` (each a weighted sorted set) via `op`, aggregating
    /// with `aggregate` the weighted scores of members present in the result.
    pub fn combine(inputs: &[(&SortedSet, f64)], op: SetOp, aggregate: Aggregate) -> SortedSet {
        let mut result = SortedSet::new();
        if inputs.is_empty() {
            return result;
        }
        let weighted = |set: &SortedSet, member: &[u8], weight: f64| -> Option<f64> {
            set.score(member).map(|s| s * weight)
        };
        let candidate_members: Vec<Bytes> = match op {
            SetOp::Union => {
                let mut seen = std::collections::HashSet::new();
                let mut members = Vec::new();
                for (set, _) in inputs {
                    for m in set.scores.keys() {
                        if seen.insert(m.clone()) {
                            members.push(m.clone());
                        }
                    }
                }
                members
            }
            SetOp::Inter => inputs[0]
                .0
                .scores
                .keys()
                .filter(|m| inputs[1..].iter().all(|(s, _)| s.contains(m)))
                .cloned()
                .collect(),
            SetOp::Diff => inputs[0]
                .0
                .scores
                .keys()
                .filter(|m| !inputs[1..].iter().any(|(s, _)| s.contains(m)))
                .cloned()
                .collect(),
        };

        for member in candidate_members {
            let mut acc: Option<f64> = None;
            for (set, weight) in inputs {
                if let Some(w) = weighted(set, &member, *weight) {
                    acc = Some(match acc {
                        None => w,
                        Some(a) => aggregate.combine(a, w),
                    });
                }
            }
            if let Some(score) = acc {
                result.insert_raw(member, score);
            }
        }
        result
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Bytes, f64)> {
        self.by_score.iter().map(|(s, m)| (m, s.0))
    }
}

/// One endpoint of a lexicographic range query (Redis `[`/`(`/`-`/`+` syntax).
#[derive(Debug, Clone)]
pub enum LexBound {
    NegInf,
    PosInf,
    Inclusive(Bytes),
    Exclusive(Bytes),
}

impl LexBound {
    fn matches_lower(&self, m: &[u8]) -> bool {
        match self {
            LexBound::NegInf => true,
            LexBound::PosInf => false,
            LexBound::Inclusive(b) => m >= b.as_ref(),
            LexBound::Exclusive(b) => m > b.as_ref(),
        }
    }

    fn matches_upper(&self, m: &[u8]) -> bool {
        match self {
            LexBound::PosInf => true,
            LexBound::NegInf => false,
            LexBound::Inclusive(b) => m <= b.as_ref(),
            LexBound::Exclusive(b) => m < b.as_ref(),
        }
    }
}

fn normalize_range(start: i64, stop: i64, len: i64) -> Option<(i64, i64)> {
    let norm = |i: i64| -> i64 {
        if i < 0 {
            (len + i).max(0)
        } else {
            i
        }
    };
    let lo = norm(start).min(len - 1).max(0);
    let hi = norm(stop).min(len - 1);
    if hi < lo || len == 0 {
        None
    } else {
        Some((lo, hi))
    }
}

fn apply_window<T>(items: Vec<T>, offset: usize, count: Option<usize>) -> Vec<T> {
    let mut iter = items.into_iter().skip(offset);
    match count {
        Some(c) => iter.by_ref().take(c).collect(),
        None => iter.collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn add_basic_and_rank_order() {
        let mut z = SortedSet::new();
        z.add_or_update(
            vec![(5.5, b("m1")), (10.0, b("m2")), (1.0, b("m3"))],
            UpdatePolicy::None,
            Comparison::None,
            false,
            false,
        )
        .unwrap();
        assert_eq!(z.rank(b"m3"), Some(0));
        assert_eq!(z.rank(b"m1"), Some(1));
        assert_eq!(z.rank(b"m2"), Some(2));
    }

    #[test]
    fn nx_never_modifies_existing() {
        let mut z = SortedSet::new();
        z.add_or_update(vec![(1.0, b("a"))], UpdatePolicy::None, Comparison::None, false, false).unwrap();
        z.add_or_update(vec![(99.0, b("a"))], UpdatePolicy::Nx, Comparison::None, false, false).unwrap();
        assert_eq!(z.score(b"a"), Some(1.0));
    }

    #[test]
    fn xx_never_creates() {
        let mut z = SortedSet::new();
        let out = z
            .add_or_update(vec![(1.0, b("a"))], UpdatePolicy::Xx, Comparison::None, false, false)
            .unwrap();
        assert_eq!(out, AddOutcome::Count(0));
        assert!(z.score(b"a").is_none());
    }

    #[test]
    fn gt_rejects_non_increasing() {
        let mut z = SortedSet::new();
        z.add_or_update(vec![(10.0, b("a"))], UpdatePolicy::None, Comparison::None, false, false).unwrap();
        z.add_or_update(vec![(5.0, b("a"))], UpdatePolicy::None, Comparison::Gt, false, false).unwrap();
        assert_eq!(z.score(b"a"), Some(10.0));
        z.add_or_update(vec![(20.0, b("a"))], UpdatePolicy::None, Comparison::Gt, false, false).unwrap();
        assert_eq!(z.score(b"a"), Some(20.0));
    }

    #[test]
    fn nx_with_gt_is_rejected() {
        let mut z = SortedSet::new();
        let err = z
            .add_or_update(vec![(1.0, b("a"))], UpdatePolicy::Nx, Comparison::Gt, false, false)
            .unwrap_err();
        assert_eq!(err, ZSetError::IncompatibleOptions);
    }

    #[test]
    fn incr_rejects_multiple_members() {
        let mut z = SortedSet::new();
        let err = z
            .add_or_update(vec![(1.0, b("a")), (1.0, b("b"))], UpdatePolicy::None, Comparison::None, false, true)
            .unwrap_err();
        assert_eq!(err, ZSetError::IncrSingleElementOnly);
    }

    #[test]
    fn scenario_s3_xx_lt_ch() {
        let mut z = SortedSet::new();
        z.add_or_update(
            vec![(5.5, b("m1")), (67.77, b("m2")), (10.0, b("m3"))],
            UpdatePolicy::None,
            Comparison::None,
            false,
            false,
        )
        .unwrap();
        let out = z
            .add_or_update(
                vec![(3.5, b("m1")), (100.5, b("m4")), (15.0, b("m5"))],
                UpdatePolicy::Xx,
                Comparison::Lt,
                true,
                false,
            )
            .unwrap();
        assert_eq!(out, AddOutcome::Count(1));
        assert_eq!(z.score(b"m1"), Some(3.5));
        assert!(z.score(b"m4").is_none());
        assert!(z.score(b"m5").is_none());
    }

    #[test]
    fn scenario_s2_weighted_intersection_max() {
        let mut a = SortedSet::new();
        a.add_or_update(
            vec![(100.0, b("one")), (2.0, b("two")), (8.0, b("eight"))],
            UpdatePolicy::None,
            Comparison::None,
            false,
            false,
        )
        .unwrap();
        let mut set_b = SortedSet::new();
        set_b
            .add_or_update(
                vec![(1.0, b("one")), (2.0, b("two")), (80.0, b("eight"))],
                UpdatePolicy::None,
                Comparison::None,
                false,
                false,
            )
            .unwrap();
        let mut c = SortedSet::new();
        c.add_or_update(
            vec![(1000.0, b("one")), (800.0, b("eight"))],
            UpdatePolicy::None,
            Comparison::None,
            false,
            false,
        )
        .unwrap();

        let result = SortedSet::combine(&[(&a, 1.0), (&set_b, 5.0), (&c, 3.0)], SetOp::Inter, Aggregate::Max);
        assert_eq!(result.score(b"one"), Some(3000.0));
        assert_eq!(result.score(b"eight"), Some(2400.0));
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn pop_min_and_max() {
        let mut z = SortedSet::new();
        z.add_or_update(
            vec![(1.0, b("a")), (2.0, b("b")), (3.0, b("c"))],
            UpdatePolicy::None,
            Comparison::None,
            false,
            false,
        )
        .unwrap();
        assert_eq!(z.pop_min(1), vec![(b("a"), 1.0)]);
        assert_eq!(z.pop_max(1), vec![(b("c"), 3.0)]);
        assert_eq!(z.len(), 1);
    }

    #[test]
    fn range_by_rank_negative_indices() {
        let mut z = SortedSet::new();
        z.add_or_update(
            vec![(1.0, b("a")), (2.0, b("b")), (3.0, b("c"))],
            UpdatePolicy::None,
            Comparison::None,
            false,
            false,
        )
        .unwrap();
        let all = z.range_by_rank(0, -1, false);
        assert_eq!(all.len(), 3);
        let last_two = z.range_by_rank(-2, -1, false);
        assert_eq!(last_two, vec![(b("b"), 2.0), (b("c"), 3.0)]);
    }

    #[test]
    fn total_ordering_never_ties() {
        let mut z = SortedSet::new();
        z.add_or_update(
            vec![(1.0, b("alpha")), (1.0, b("beta"))],
            UpdatePolicy::None,
            Comparison::None,
            false,
            false,
        )
        .unwrap();
        let r1 = z.rank(b"alpha").unwrap();
        let r2 = z.rank(b"beta").unwrap();
        assert_ne!(r1, r2);
    }
}
