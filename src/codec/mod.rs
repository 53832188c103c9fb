// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! WirePack codec.
//!
//! ```text
//! uvarint      := 7 payload bits per byte, high bit = more bytes follow
//! Template     := uvarint(N) || N x u32_le
//! Delta        := uvarint(M) || M x (uvarint(index) || u32_le(value))
//! Delta Stream := uvarint(K) || K x (uvarint(len) || delta_bytes)
//! Container    := Template[mode, raw_len, comp_len] || ceil(comp_len/4) x u32 words
//! ```

pub mod varint;
pub mod template;
pub mod delta;
pub mod stream;
pub mod container;

pub use container::{decode_bytes, encode_bytes, ContainerMode};
pub use delta::{check_indices, decode_delta, encode_delta, Delta, Op};
pub use stream::{decode_delta_stream, encode_delta_stream};
pub use template::{decode_template, diff_templates, encode_template, Template};

use crate::error::CodecError;
use byteorder::{ByteOrder, LittleEndian};

pub(crate) fn read_u32(buf: &[u8], offset: &mut usize, what: &'static str) -> Result<u32, CodecError> {
    let available = buf.len().saturating_sub(*offset);
    if available < 4 {
        return Err(CodecError::Truncated {
            what,
            offset: *offset,
            needed: 4,
            available,
        });
    }
    let val = LittleEndian::read_u32(&buf[*offset..*offset + 4]);
    *offset += 4;
    Ok(val)
}

pub(crate) fn write_u32(out: &mut Vec<u8>, val: u32) {
    let mut bytes = [0u8; 4];
    LittleEndian::write_u32(&mut bytes, val);
    out.extend_from_slice(&bytes);
}

/// Rejects unread bytes after a complete body.
pub(crate) fn expect_end(buf: &[u8], offset: usize, what: &'static str) -> Result<(), CodecError> {
    if offset != buf.len() {
        return Err(CodecError::TrailingBytes {
            what,
            offset,
            remaining: buf.len() - offset,
        });
    }
    Ok(())
}

/// Converts a decoded count to `usize`.
pub(crate) fn to_usize(value: u64) -> Result<usize, CodecError> {
    usize::try_from(value).map_err(|_| CodecError::LengthOverflow { value })
}
