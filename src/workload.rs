// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Seeded workload generation.
//!
//! ChaCha8 is portable and stable across platforms, so the same seed yields
//! the same vectors and batches everywhere.

use crate::codec::Op;
use rand::seq::index::sample;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Shape of a skewed, bursty write stream.
///
/// Most writes land on the first `hot_fraction` of the indices, and a burst
/// rewrites the index touched last. Batches drawn this way routinely write
/// the same index more than once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkewProfile {
    pub hot_fraction: f64,
    /// Chance that a non-burst write picks a hot index.
    pub hot_prob: f64,
    /// Chance that a write reuses the previous index.
    pub burst_prob: f64,
}

impl SkewProfile {
    /// Telemetry-like stream: 2% hot keys take 85% of fresh writes, 20% bursts.
    pub const TELEMETRY: SkewProfile = SkewProfile {
        hot_fraction: 0.02,
        hot_prob: 0.85,
        burst_prob: 0.20,
    };

    /// Size of the hot set over `len` indices, at least one.
    pub fn hot_len(&self, len: usize) -> usize {
        ((len as f64 * self.hot_fraction) as usize).clamp(1, len.max(1))
    }
}

#[derive(Debug, Clone)]
pub struct Workload {
    rng: ChaCha8Rng,
    len: usize,
    value_max: u32,
    /// Index of the last non-burst skewed write.
    last_index: usize,
}

impl Workload {
    /// Generator over indices `0..len` and values `0..=value_max`.
    pub fn new(seed: u64, len: usize, value_max: u32) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            len,
            value_max,
            last_index: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn next_value(&mut self) -> u32 {
        self.rng.gen_range(0..=self.value_max)
    }

    pub fn values(&mut self) -> Vec<u32> {
        (0..self.len).map(|_| self.next_value()).collect()
    }

    /// `m` ops on distinct indices (capped at `len`), in generation order.
    pub fn next_ops(&mut self, m: usize) -> Vec<Op> {
        let m = m.min(self.len);
        let indices = sample(&mut self.rng, self.len, m).into_vec();
        indices
            .into_iter()
            .map(|i| Op::new(i as u64, self.next_value()))
            .collect()
    }

    /// `m` ops drawn from `profile`. Indices may repeat within the batch.
    pub fn next_skewed_ops(&mut self, m: usize, profile: &SkewProfile) -> Vec<Op> {
        let hot = profile.hot_len(self.len);
        let mut ops = Vec::with_capacity(m);
        for _ in 0..m {
            let index = if self.rng.gen::<f64>() < profile.burst_prob {
                self.last_index
            } else {
                let fresh = if self.rng.gen::<f64>() < profile.hot_prob || hot >= self.len {
                    self.rng.gen_range(0..hot)
                } else {
                    self.rng.gen_range(hot..self.len)
                };
                self.last_index = fresh;
                fresh
            };
            ops.push(Op::new(index as u64, self.next_value()));
        }
        ops
    }

    /// A shuffled copy of `ops`. Writes to one index keep their relative
    /// order, so the copy applies to the same vector as the original.
    pub fn shuffled(&mut self, ops: &[Op]) -> Vec<Op> {
        let mut slots: Vec<u64> = ops.iter().map(|op| op.index).collect();
        slots.shuffle(&mut self.rng);

        let mut pending: BTreeMap<u64, VecDeque<u32>> = BTreeMap::new();
        for op in ops {
            pending.entry(op.index).or_default().push_back(op.value);
        }
        slots
            .into_iter()
            .filter_map(|index| {
                let value = pending.get_mut(&index)?.pop_front()?;
                Some(Op::new(index, value))
            })
            .collect()
    }

    /// Shuffles any slice in place with this generator.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    pub fn index(&mut self) -> usize {
        self.rng.gen_range(0..self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_workload() {
        let mut a = Workload::new(7, 64, 1000);
        let mut b = Workload::new(7, 64, 1000);
        assert_eq!(a.values(), b.values());
        assert_eq!(a.next_ops(4), b.next_ops(4));

        let mut c = Workload::new(8, 64, 1000);
        assert_ne!(Workload::new(7, 64, 1000).values(), c.values());
    }

    #[test]
    fn test_ops_have_distinct_indices_in_range() {
        let mut w = Workload::new(1, 16, 10);
        for _ in 0..100 {
            let mut ops = w.next_ops(8);
            assert_eq!(ops.len(), 8);
            assert!(ops.iter().all(|op| op.index < 16 && op.value <= 10));
            ops.sort();
            ops.dedup_by_key(|op| op.index);
            assert_eq!(ops.len(), 8);
        }
        assert_eq!(w.next_ops(100).len(), 16);
    }

    #[test]
    fn test_skewed_ops_favor_hot_keys_and_repeat() {
        let profile = SkewProfile::TELEMETRY;
        let mut w = Workload::new(46, 1000, 100);
        let hot = profile.hot_len(1000);
        assert_eq!(hot, 20);

        let (mut hot_writes, mut total, mut batches_with_repeats) = (0, 0, 0);
        for _ in 0..500 {
            let ops = w.next_skewed_ops(4, &profile);
            assert_eq!(ops.len(), 4);
            assert!(ops.iter().all(|op| op.index < 1000 && op.value <= 100));
            hot_writes += ops.iter().filter(|op| (op.index as usize) < hot).count();
            total += ops.len();
            let mut indices: Vec<u64> = ops.iter().map(|op| op.index).collect();
            indices.sort_unstable();
            indices.dedup();
            if indices.len() < ops.len() {
                batches_with_repeats += 1;
            }
        }
        assert!(hot_writes * 10 > total * 7, "{hot_writes} of {total} writes hit the hot set");
        assert!(batches_with_repeats > 50);
    }

    #[test]
    fn test_shuffle_keeps_per_index_order() {
        let ops = vec![Op::new(3, 1), Op::new(1, 9), Op::new(3, 2), Op::new(3, 3), Op::new(0, 4)];
        let mut w = Workload::new(5, 8, 10);
        for _ in 0..20 {
            let shuffled = w.shuffled(&ops);
            assert_eq!(shuffled.len(), ops.len());
            let threes: Vec<u32> = shuffled.iter().filter(|op| op.index == 3).map(|op| op.value).collect();
            assert_eq!(threes, vec![1, 2, 3]);
            let mut sorted = shuffled.clone();
            sorted.sort();
            let mut expected = ops.clone();
            expected.sort();
            assert_eq!(sorted, expected);
        }
    }

    #[test]
    fn test_single_index_space() {
        let mut w = Workload::new(1, 1, 10);
        let ops = w.next_skewed_ops(6, &SkewProfile::TELEMETRY);
        assert!(ops.iter().all(|op| op.index == 0));
    }
}
