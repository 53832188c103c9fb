// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Delta streams: length-prefixed concatenation of encoded deltas.

use super::varint::{read_uvarint, write_uvarint};
use super::{expect_end, to_usize};
use crate::error::CodecError;

pub fn encode_delta_stream<D: AsRef<[u8]>>(deltas: &[D]) -> Vec<u8> {
    let mut out = Vec::new();
    write_uvarint(&mut out, deltas.len() as u64);
    for delta in deltas {
        let bytes = delta.as_ref();
        write_uvarint(&mut out, bytes.len() as u64);
        out.extend_from_slice(bytes);
    }
    out
}

/// Splits a stream into its frames. Frames borrow from `bytes`; their contents are not decoded.
pub fn decode_delta_stream(bytes: &[u8]) -> Result<Vec<&[u8]>, CodecError> {
    let mut offset = 0;
    let count = to_usize(read_uvarint(bytes, &mut offset)?)?;

    // Each frame takes at least one length byte.
    if count > bytes.len() - offset {
        return Err(CodecError::DeclaredLengthExceeds {
            declared: count,
            available: bytes.len() - offset,
        });
    }

    let mut frames = Vec::with_capacity(count);
    for _ in 0..count {
        let len = to_usize(read_uvarint(bytes, &mut offset)?)?;
        let available = bytes.len() - offset;
        if len > available {
            return Err(CodecError::Truncated {
                what: "delta frame",
                offset,
                needed: len,
                available,
            });
        }
        frames.push(&bytes[offset..offset + len]);
        offset += len;
    }
    expect_end(bytes, offset, "delta stream")?;
    Ok(frames)
}
