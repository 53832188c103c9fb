// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Unsigned variable-length integers.

use crate::config::MAX_VARINT_SHIFT;
use crate::error::CodecError;

/// Appends `value` as a uvarint.
pub fn write_uvarint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            out.push(byte | 0x80);
        } else {
            out.push(byte);
            break;
        }
    }
}

/// Reads a uvarint at `offset`, advancing it past the encoded bytes.
pub fn read_uvarint(buf: &[u8], offset: &mut usize) -> Result<u64, CodecError> {
    let start = *offset;
    let mut pos = start;
    let mut shift = 0u32;
    let mut value = 0u64;

    loop {
        let byte = *buf
            .get(pos)
            .ok_or(CodecError::TruncatedVarint { offset: start })?;
        pos += 1;

        let payload = u64::from(byte & 0x7F);
        // Only the lowest payload bit still fits once 63 bits are consumed.
        if shift == MAX_VARINT_SHIFT && payload > 1 {
            return Err(CodecError::VarintOverflow { offset: start });
        }
        value |= payload << shift;

        if byte & 0x80 == 0 {
            *offset = pos;
            return Ok(value);
        }

        shift += 7;
        if shift > MAX_VARINT_SHIFT {
            return Err(CodecError::VarintOverflow { offset: start });
        }
    }
}

/// Number of bytes `write_uvarint` emits for `value`.
pub fn uvarint_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.max(1).div_ceil(7)
}
