// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Last-writer-wins multi-writer merge.
//!
//! Each cell holds `(timestamp, value)`. A write replaces the cell only when
//! its `(timestamp, value)` pair is strictly greater than the stored one.
//! Timestamps compare as `(writer_id, counter)`; the value only decides
//! between two writes carrying the same timestamp. `apply` is therefore a
//! pointwise maximum: commutative, associative and idempotent, so folding the
//! union of all writers' ops in any order reaches the same map.

use crate::canonical::canonical_ops;
use crate::codec::{check_indices, decode_delta, Op};
use crate::error::{Result, WirePackError};
use crate::hash::Hash32;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Writer timestamp. Field order gives the lexicographic `(writer_id, counter)` ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub writer_id: u32,
    pub counter: u64,
}

impl Timestamp {
    pub fn new(writer_id: u32, counter: u64) -> Self {
        Self { writer_id, counter }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub timestamp: Timestamp,
    pub value: u32,
}

impl Cell {
    fn key(&self) -> (Timestamp, u32) {
        (self.timestamp, self.value)
    }
}

/// One writer's canonical deltas. The delta at position `k` carries timestamp `(writer_id, k)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterLog {
    pub writer_id: u32,
    deltas: Vec<Vec<u8>>,
}

impl WriterLog {
    pub fn new(writer_id: u32) -> Self {
        Self { writer_id, deltas: Vec::new() }
    }

    /// Appends a delta and returns the timestamp it was assigned.
    pub fn push(&mut self, delta_bytes: Vec<u8>) -> Timestamp {
        let ts = Timestamp::new(self.writer_id, self.deltas.len() as u64);
        self.deltas.push(delta_bytes);
        ts
    }

    pub fn deltas(&self) -> &[Vec<u8>] {
        &self.deltas
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// `(timestamp, delta)` pairs in log order.
    pub fn entries(&self) -> impl Iterator<Item = (Timestamp, &[u8])> + '_ {
        self.deltas
            .iter()
            .enumerate()
            .map(move |(k, d)| (Timestamp::new(self.writer_id, k as u64), d.as_slice()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeStore {
    len: usize,
    cells: FxHashMap<u64, Cell>,
}

impl MergeStore {
    /// Empty store over indices `0..len`.
    pub fn new(len: usize) -> Self {
        Self { len, cells: FxHashMap::default() }
    }

    /// Index space size.
    pub fn capacity(&self) -> usize {
        self.len
    }

    /// Number of written cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, index: u64) -> Option<&Cell> {
        self.cells.get(&index)
    }

    /// Writes `value` at `index` if `(ts, value)` beats the stored cell. Returns whether it did.
    pub fn apply(&mut self, index: u64, ts: Timestamp, value: u32) -> Result<bool> {
        if index >= self.len as u64 {
            return Err(WirePackError::IndexOutOfRange { index, len: self.len });
        }
        let incoming = Cell { timestamp: ts, value };
        match self.cells.get_mut(&index) {
            Some(cell) if incoming.key() <= cell.key() => Ok(false),
            Some(cell) => {
                *cell = incoming;
                Ok(true)
            }
            None => {
                self.cells.insert(index, incoming);
                Ok(true)
            }
        }
    }

    /// Applies one batch under a single timestamp. Returns the number of cells overwritten.
    ///
    /// Ops sharing an index collapse to the last one first, so the timestamp
    /// tie-break on value only ever decides between different batches.
    pub fn apply_ops(&mut self, ts: Timestamp, ops: &[Op]) -> Result<usize> {
        check_indices(ops, self.len)?;
        let mut written = 0;
        for op in &canonical_ops(ops) {
            if self.apply(op.index, ts, op.value)? {
                written += 1;
            }
        }
        Ok(written)
    }

    pub fn apply_delta(&mut self, ts: Timestamp, delta_bytes: &[u8]) -> Result<usize> {
        let ops = decode_delta(delta_bytes)?;
        self.apply_ops(ts, &ops)
    }

    /// Folds one writer's whole log into the store.
    pub fn apply_log(&mut self, log: &WriterLog) -> Result<usize> {
        let mut written = 0;
        for (ts, delta) in log.entries() {
            written += self.apply_delta(ts, delta)?;
        }
        Ok(written)
    }

    /// State-based join with another replica.
    pub fn merge(&mut self, other: &MergeStore) -> Result<()> {
        if other.len != self.len {
            return Err(WirePackError::InvalidLength { what: "merge replica", len: other.len });
        }
        for (&index, cell) in &other.cells {
            self.apply(index, cell.timestamp, cell.value)?;
        }
        Ok(())
    }

    /// Cells sorted by index.
    pub fn entries(&self) -> Vec<(u64, Cell)> {
        let mut out: Vec<(u64, Cell)> = self.cells.iter().map(|(&i, &c)| (i, c)).collect();
        out.sort_unstable_by_key(|(i, _)| *i);
        out
    }

    /// Materializes the merged values over a base vector of zeros.
    pub fn values(&self) -> Vec<u32> {
        let mut out = vec![0u32; self.len];
        for (&index, cell) in &self.cells {
            out[index as usize] = cell.value;
        }
        out
    }

    /// BLAKE3 over the sorted cells.
    pub fn state_hash(&self) -> Hash32 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.len as u64).to_le_bytes());
        for (index, cell) in self.entries() {
            hasher.update(&index.to_le_bytes());
            hasher.update(&cell.timestamp.writer_id.to_le_bytes());
            hasher.update(&cell.timestamp.counter.to_le_bytes());
            hasher.update(&cell.value.to_le_bytes());
        }
        *hasher.finalize().as_bytes()
    }
}

/// Merges writer logs in the order given.
pub fn merge_logs(len: usize, logs: &[WriterLog]) -> Result<MergeStore> {
    let mut store = MergeStore::new(len);
    for log in logs {
        store.apply_log(log)?;
    }
    Ok(store)
}
