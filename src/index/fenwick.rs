// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Fenwick (binary indexed) tree over a delta stream.
//!
//! Accumulators are `u64` and updated with wrapping arithmetic. A point update
//! adds `new - old` modulo 2^64, so every prefix sum is exact as long as the
//! true sum fits in 64 bits, which holds for any vector of fewer than 2^32
//! `u32` values.
//!
//! The old value at an index is read back from the tree itself
//! (`prefix_sum(i) - prefix_sum(i - 1)`), so the vector is never stored.

use crate::codec::{check_indices, decode_delta, Op};
use crate::error::{Result, WirePackError};
use tracing::{debug, warn};

#[inline]
fn lowbit(i: usize) -> usize {
    i & i.wrapping_neg()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SumIndex {
    /// 1-indexed; `tree[0]` is unused.
    tree: Vec<u64>,
}

impl SumIndex {
    /// All-zero index over `len` elements.
    pub fn new(len: usize) -> Result<Self> {
        if len == 0 {
            return Err(WirePackError::InvalidLength { what: "sum index", len });
        }
        Ok(Self { tree: vec![0; len + 1] })
    }

    /// Linear-time build from an initial vector.
    pub fn from_values(values: &[u32]) -> Result<Self> {
        let mut index = Self::new(values.len())?;
        let n = values.len();
        for (i0, &v) in values.iter().enumerate() {
            index.tree[i0 + 1] = index.tree[i0 + 1].wrapping_add(u64::from(v));
        }
        for i in 1..=n {
            let parent = i + lowbit(i);
            if parent <= n {
                let carried = index.tree[i];
                index.tree[parent] = index.tree[parent].wrapping_add(carried);
            }
        }
        debug!(len = n, "sum index built");
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.tree.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds `delta` at 0-indexed `index`.
    ///
    /// The resulting point value must stay a `u32`; anything else is rejected
    /// before the tree moves, since `point_value` could not read it back.
    pub fn add(&mut self, index: usize, delta: i64) -> Result<()> {
        let n = self.len();
        if index >= n {
            return Err(WirePackError::IndexOutOfRange { index: index as u64, len: n });
        }
        let old = i64::from(self.point_value(index)?);
        let updated = old.checked_add(delta).filter(|v| (0..=i64::from(u32::MAX)).contains(v));
        if updated.is_none() {
            return Err(WirePackError::ValueOutOfRange {
                index: index as u64,
                value: old.saturating_add(delta),
            });
        }
        let delta = delta as u64;
        let mut i = index + 1;
        while i <= n {
            self.tree[i] = self.tree[i].wrapping_add(delta);
            i += lowbit(i);
        }
        Ok(())
    }

    /// Sum over `[0..=r]`. `r` past the end is clamped to the last element.
    pub fn prefix_sum(&self, r: usize) -> u64 {
        let mut i = r.min(self.len() - 1) + 1;
        let mut sum = 0u64;
        while i > 0 {
            sum = sum.wrapping_add(self.tree[i]);
            i -= lowbit(i);
        }
        sum
    }

    /// Sum over `[l..=r]`; zero when `r < l`.
    pub fn range_sum(&self, l: usize, r: usize) -> u64 {
        if r < l {
            return 0;
        }
        let upper = self.prefix_sum(r);
        if l == 0 {
            upper
        } else {
            upper.wrapping_sub(self.prefix_sum(l - 1))
        }
    }

    pub fn total(&self) -> u64 {
        self.prefix_sum(self.len() - 1)
    }

    /// Current value at `index`, recovered in O(log n).
    pub fn point_value(&self, index: usize) -> Result<u32> {
        if index >= self.len() {
            return Err(WirePackError::IndexOutOfRange { index: index as u64, len: self.len() });
        }
        Ok(self.range_sum(index, index) as u32)
    }

    /// Sets `index` to `value` by adding the difference.
    pub fn set(&mut self, index: usize, value: u32) -> Result<()> {
        let old = self.point_value(index)?;
        if old != value {
            self.add(index, i64::from(value) - i64::from(old))?;
        }
        Ok(())
    }

    pub fn apply_ops(&mut self, ops: &[Op]) -> Result<()> {
        check_indices(ops, self.len())?;
        for op in ops {
            self.set(op.index as usize, op.value)?;
        }
        Ok(())
    }

    /// Applies one encoded delta. Decoding and bounds checks finish before any accumulator moves.
    pub fn apply_delta(&mut self, delta_bytes: &[u8]) -> Result<()> {
        let ops = decode_delta(delta_bytes)?;
        self.apply_ops(&ops)
    }

    /// Compares every prefix sum with a scan of `snapshot`.
    pub fn verify_against(&self, snapshot: &[u32]) -> Result<()> {
        if snapshot.len() != self.len() {
            return Err(WirePackError::InvalidLength { what: "sum index snapshot", len: snapshot.len() });
        }
        let mut running = 0u64;
        for (r, &v) in snapshot.iter().enumerate() {
            running = running.wrapping_add(u64::from(v));
            let maintained = self.prefix_sum(r);
            if maintained != running {
                warn!(r, maintained, expected = running, "sum index diverged from snapshot");
                return Err(WirePackError::InvariantViolation {
                    structure: "SumIndex",
                    detail: format!("prefix_sum({r}) = {maintained}, snapshot sum = {running}"),
                });
            }
        }
        Ok(())
    }
}
