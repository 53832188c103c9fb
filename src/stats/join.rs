// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Grouped join sum over two delta streams.
//!
//! Maintains, for two column vectors `a` and `b` joined on row position,
//! ```text
//! SELECT row % groups, SUM(a[row] + b[row])
//! WHERE a[row] > a_above AND b[row] < b_below
//! GROUP BY row % groups
//! ```
//! A write to either side moves only the group of the touched row, by the
//! difference between the row's old and new contribution. Group sums are `u64`
//! and updated with wrapping arithmetic; they are exact while the true sum
//! fits, which holds for fewer than 2^31 rows.

use crate::codec::{check_indices, decode_delta, Op};
use crate::error::{Result, WirePackError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinQuery {
    pub groups: usize,
    /// Rows qualify only when `a` is strictly above this.
    pub a_above: u32,
    /// Rows qualify only when `b` is strictly below this.
    pub b_below: u32,
}

impl JoinQuery {
    pub fn new(groups: usize, a_above: u32, b_below: u32) -> Result<Self> {
        if groups == 0 {
            return Err(WirePackError::InvalidLength { what: "join group count", len: groups });
        }
        Ok(Self { groups, a_above, b_below })
    }

    #[inline]
    pub fn group_of(&self, row: usize) -> usize {
        row % self.groups
    }

    /// What one row adds to its group.
    #[inline]
    pub fn contribution(&self, a: u32, b: u32) -> u64 {
        if a > self.a_above && b < self.b_below {
            u64::from(a) + u64::from(b)
        } else {
            0
        }
    }
}

fn check_columns(a: &[u32], b: &[u32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(WirePackError::InvalidLength { what: "join b column", len: b.len() });
    }
    if a.is_empty() {
        return Err(WirePackError::InvalidLength { what: "join column", len: 0 });
    }
    Ok(())
}

/// Group sums recomputed by scanning both columns.
pub fn snapshot_group_sums(query: &JoinQuery, a: &[u32], b: &[u32]) -> Result<Vec<u64>> {
    check_columns(a, b)?;
    let mut sums = vec![0u64; query.groups];
    for (row, (&ai, &bi)) in a.iter().zip(b).enumerate() {
        let g = query.group_of(row);
        sums[g] = sums[g].wrapping_add(query.contribution(ai, bi));
    }
    Ok(sums)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedJoinSum {
    query: JoinQuery,
    a: Vec<u32>,
    b: Vec<u32>,
    sums: Vec<u64>,
}

impl GroupedJoinSum {
    pub fn new(query: JoinQuery, a: Vec<u32>, b: Vec<u32>) -> Result<Self> {
        let sums = snapshot_group_sums(&query, &a, &b)?;
        debug!(rows = a.len(), groups = query.groups, "grouped join sum built");
        Ok(Self { query, a, b, sums })
    }

    pub fn query(&self) -> &JoinQuery {
        &self.query
    }

    pub fn len(&self) -> usize {
        self.a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    pub fn a(&self) -> &[u32] {
        &self.a
    }

    pub fn b(&self) -> &[u32] {
        &self.b
    }

    pub fn group_sums(&self) -> &[u64] {
        &self.sums
    }

    pub fn group_sum(&self, group: usize) -> Option<u64> {
        self.sums.get(group).copied()
    }

    fn shift(&mut self, row: usize, old: u64, new: u64) {
        let g = self.query.group_of(row);
        self.sums[g] = self.sums[g].wrapping_sub(old).wrapping_add(new);
    }

    /// O(1): rewrites `a[row]` and moves its group.
    pub fn set_a(&mut self, row: usize, value: u32) -> Result<()> {
        let old_a = *self
            .a
            .get(row)
            .ok_or(WirePackError::IndexOutOfRange { index: row as u64, len: self.a.len() })?;
        let b = self.b[row];
        let (old, new) = (self.query.contribution(old_a, b), self.query.contribution(value, b));
        self.shift(row, old, new);
        self.a[row] = value;
        Ok(())
    }

    pub fn set_b(&mut self, row: usize, value: u32) -> Result<()> {
        let old_b = *self
            .b
            .get(row)
            .ok_or(WirePackError::IndexOutOfRange { index: row as u64, len: self.b.len() })?;
        let a = self.a[row];
        let (old, new) = (self.query.contribution(a, old_b), self.query.contribution(a, value));
        self.shift(row, old, new);
        self.b[row] = value;
        Ok(())
    }

    pub fn apply_a_ops(&mut self, ops: &[Op]) -> Result<()> {
        check_indices(ops, self.len())?;
        for op in ops {
            self.set_a(op.index as usize, op.value)?;
        }
        Ok(())
    }

    pub fn apply_b_ops(&mut self, ops: &[Op]) -> Result<()> {
        check_indices(ops, self.len())?;
        for op in ops {
            self.set_b(op.index as usize, op.value)?;
        }
        Ok(())
    }

    pub fn apply_a_delta(&mut self, delta_bytes: &[u8]) -> Result<()> {
        let ops = decode_delta(delta_bytes)?;
        self.apply_a_ops(&ops)
    }

    pub fn apply_b_delta(&mut self, delta_bytes: &[u8]) -> Result<()> {
        let ops = decode_delta(delta_bytes)?;
        self.apply_b_ops(&ops)
    }

    /// Compares every maintained group with a rescan of an external snapshot.
    pub fn verify_against(&self, a: &[u32], b: &[u32]) -> Result<()> {
        if a.len() != self.len() {
            return Err(WirePackError::InvalidLength { what: "join snapshot", len: a.len() });
        }
        let expected = snapshot_group_sums(&self.query, a, b)?;
        let diverged = self.sums.iter().zip(&expected).position(|(got, want)| got != want);
        if let Some(group) = diverged {
            let (maintained, recomputed) = (self.sums[group], expected[group]);
            warn!(group, maintained, recomputed, "grouped join sum diverged");
            return Err(WirePackError::InvariantViolation {
                structure: "GroupedJoinSum",
                detail: format!("group {group} = {maintained}, snapshot = {recomputed}"),
            });
        }
        Ok(())
    }
}
