// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Delta encoding: a batch of sparse point updates.

use super::varint::{read_uvarint, uvarint_len, write_uvarint};
use super::{expect_end, read_u32, to_usize, write_u32};
use crate::error::{CodecError, Result, WirePackError};
use serde::{Deserialize, Serialize};

/// Smallest possible encoded op: 1-byte index + 4-byte value.
const MIN_OP_BYTES: usize = 5;

/// Set `index` to `value`.
///
/// Ordering is `(index, value)`, which is the canonical sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Op {
    pub index: u64,
    pub value: u32,
}

impl Op {
    pub fn new(index: u64, value: u32) -> Self {
        Self { index, value }
    }
}

pub fn encode_delta(ops: &[Op]) -> Vec<u8> {
    let body: usize = ops.iter().map(|op| uvarint_len(op.index) + 4).sum();
    let mut out = Vec::with_capacity(uvarint_len(ops.len() as u64) + body);
    write_uvarint(&mut out, ops.len() as u64);
    for op in ops {
        write_uvarint(&mut out, op.index);
        write_u32(&mut out, op.value);
    }
    out
}

/// Decodes a complete delta. Trailing bytes are malformed.
pub fn decode_delta(bytes: &[u8]) -> std::result::Result<Vec<Op>, CodecError> {
    let mut offset = 0;
    let count = to_usize(read_uvarint(bytes, &mut offset)?)?;

    let available = bytes.len() - offset;
    let min_needed = count.saturating_mul(MIN_OP_BYTES);
    if min_needed > available {
        return Err(CodecError::Truncated {
            what: "delta body",
            offset,
            needed: min_needed,
            available,
        });
    }

    let mut ops = Vec::with_capacity(count);
    for _ in 0..count {
        let index = read_uvarint(bytes, &mut offset)?;
        let value = read_u32(bytes, &mut offset, "delta value")?;
        ops.push(Op { index, value });
    }
    expect_end(bytes, offset, "delta")?;
    Ok(ops)
}

/// Fails on the first op whose index is outside `0..len`.
pub fn check_indices(ops: &[Op], len: usize) -> Result<()> {
    match ops.iter().find(|op| op.index >= len as u64) {
        Some(op) => Err(WirePackError::IndexOutOfRange { index: op.index, len }),
        None => Ok(()),
    }
}

/// A decoded delta.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    ops: Vec<Op>,
}

impl Delta {
    pub fn new(ops: Vec<Op>) -> Self {
        Self { ops }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self::new(decode_delta(bytes)?))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        encode_delta(&self.ops)
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<Op> {
        self.ops
    }

    pub fn push(&mut self, op: Op) {
        self.ops.push(op);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl From<Vec<Op>> for Delta {
    fn from(ops: Vec<Op>) -> Self {
        Self::new(ops)
    }
}
