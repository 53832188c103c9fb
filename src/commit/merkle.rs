// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Incremental Merkle commitment over a power-of-two leaf count.
//!
//! ```text
//! levels[0]      = leaf_hash(v_i)               (N hashes)
//! levels[k][j]   = H(levels[k-1][2j] || levels[k-1][2j+1])
//! levels[last]   = [root]
//! ```
//! Every level is kept as a flat `Vec`, so a point update is one walk from
//! the leaf to the root touching `log2(N)` internal nodes.

use crate::codec::{check_indices, decode_delta, Op};
use crate::error::{Result, WirePackError};
use crate::hash::{leaf_hash, node_hash, to_hex, Hash32};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct CommitmentTree {
    levels: Vec<Vec<Hash32>>,
    hash_ops: u64,
}

fn check_leaf_count(len: usize) -> Result<()> {
    if len == 0 || !len.is_power_of_two() {
        return Err(WirePackError::InvalidLength { what: "commitment tree leaf count", len });
    }
    Ok(())
}

/// Builds all levels from leaf hashes; returns them with the number of node hashes computed.
fn build_levels(leaves: Vec<Hash32>) -> (Vec<Vec<Hash32>>, u64) {
    let mut hash_ops = 0u64;
    let mut levels = vec![leaves];
    while levels[levels.len() - 1].len() > 1 {
        let prev = &levels[levels.len() - 1];
        let next: Vec<Hash32> = prev
            .chunks_exact(2)
            .map(|pair| node_hash(&pair[0], &pair[1]))
            .collect();
        hash_ops += next.len() as u64;
        levels.push(next);
    }
    (levels, hash_ops)
}

/// Root of the tree over `values`, computed from scratch in O(N).
pub fn merkle_rebuild(values: &[u32]) -> Result<Hash32> {
    check_leaf_count(values.len())?;
    let (levels, _) = build_levels(values.iter().map(|&v| leaf_hash(v)).collect());
    Ok(levels[levels.len() - 1][0])
}

impl CommitmentTree {
    pub fn from_values(values: &[u32]) -> Result<Self> {
        check_leaf_count(values.len())?;
        let (levels, hash_ops) = build_levels(values.iter().map(|&v| leaf_hash(v)).collect());
        debug!(leaves = values.len(), hash_ops, "commitment tree built");
        Ok(Self { levels, hash_ops })
    }

    /// Tree over `len` zero leaves.
    pub fn zeros(len: usize) -> Result<Self> {
        check_leaf_count(len)?;
        let (levels, hash_ops) = build_levels(vec![leaf_hash(0); len]);
        Ok(Self { levels, hash_ops })
    }

    pub fn root(&self) -> Hash32 {
        self.levels[self.levels.len() - 1][0]
    }

    pub fn root_hex(&self) -> String {
        to_hex(&self.root())
    }

    pub fn len(&self) -> usize {
        self.levels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    /// Number of internal levels (`log2(N)`).
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn leaf(&self, index: usize) -> Option<&Hash32> {
        self.levels[0].get(index)
    }

    /// Internal-node hashes computed since construction, including the build.
    pub fn hash_ops(&self) -> u64 {
        self.hash_ops
    }

    /// Sets leaf `index` to `value` and rehashes its ancestors. Returns the new root.
    pub fn set(&mut self, index: usize, value: u32) -> Result<Hash32> {
        if index >= self.len() {
            return Err(WirePackError::IndexOutOfRange { index: index as u64, len: self.len() });
        }
        self.levels[0][index] = leaf_hash(value);

        let mut i = index;
        for lvl in 1..self.levels.len() {
            let parent = i / 2;
            let below = &self.levels[lvl - 1];
            let hash = node_hash(&below[2 * parent], &below[2 * parent + 1]);
            self.levels[lvl][parent] = hash;
            self.hash_ops += 1;
            i = parent;
        }
        Ok(self.root())
    }

    pub fn apply_ops(&mut self, ops: &[Op]) -> Result<Hash32> {
        check_indices(ops, self.len())?;
        for op in ops {
            self.set(op.index as usize, op.value)?;
        }
        Ok(self.root())
    }

    /// Applies one encoded delta and returns the new root.
    pub fn apply_delta(&mut self, delta_bytes: &[u8]) -> Result<Hash32> {
        let ops = decode_delta(delta_bytes)?;
        self.apply_ops(&ops)
    }

    /// Rebuilds from `values` and compares roots.
    pub fn verify_against(&self, values: &[u32]) -> Result<()> {
        if values.len() != self.len() {
            return Err(WirePackError::InvalidLength { what: "commitment snapshot", len: values.len() });
        }
        let rebuilt = merkle_rebuild(values)?;
        if rebuilt != self.root() {
            warn!(maintained = %self.root_hex(), rebuilt = %to_hex(&rebuilt), "commitment root diverged");
            return Err(WirePackError::InvariantViolation {
                structure: "CommitmentTree",
                detail: format!("root {} != rebuilt {}", self.root_hex(), to_hex(&rebuilt)),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_delta;

    #[test]
    fn test_root_of_two_leaves() {
        let tree = CommitmentTree::from_values(&[1, 2]).unwrap();
        assert_eq!(tree.root(), node_hash(&leaf_hash(1), &leaf_hash(2)));
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_single_leaf_root_is_leaf() {
        let tree = CommitmentTree::from_values(&[42]).unwrap();
        assert_eq!(tree.root(), leaf_hash(42));
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn test_non_power_of_two_rejected() {
        assert!(CommitmentTree::from_values(&[1, 2, 3]).is_err());
        assert!(CommitmentTree::from_values(&[]).is_err());
        assert!(merkle_rebuild(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_point_update_matches_rebuild() {
        let mut values: Vec<u32> = (0..16).collect();
        let mut tree = CommitmentTree::from_values(&values).unwrap();

        let root = tree.apply_delta(&encode_delta(&[Op::new(5, 500), Op::new(11, 7)])).unwrap();
        values[5] = 500;
        values[11] = 7;

        assert_eq!(root, merkle_rebuild(&values).unwrap());
        assert!(tree.verify_against(&values).is_ok());
    }

    #[test]
    fn test_update_cost_is_logarithmic() {
        let mut tree = CommitmentTree::zeros(1024).unwrap();
        let after_build = tree.hash_ops();
        assert_eq!(after_build, 1023);

        tree.set(700, 9).unwrap();
        assert_eq!(tree.hash_ops() - after_build, 10);
    }

    #[test]
    fn test_verify_detects_stale_root() {
        let mut tree = CommitmentTree::from_values(&[0, 0, 0, 0]).unwrap();
        tree.set(2, 3).unwrap();
        let err = tree.verify_against(&[0, 0, 0, 0]).unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_out_of_range_leaves_root_unchanged() {
        let mut tree = CommitmentTree::zeros(4).unwrap();
        let root = tree.root();
        assert!(tree.apply_ops(&[Op::new(1, 1), Op::new(4, 1)]).is_err());
        assert_eq!(tree.root(), root);
    }
}
