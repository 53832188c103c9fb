// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Generic bytes container.
//!
//! # Layout
//! ```text
//! [Template: mode, raw_len, comp_len][payload words, zero padded to 4 bytes]
//! ```
//! `mode = 0` stores the payload as-is, `mode = 1` stores it deflated.
//! Compression is only attempted for payloads of at least
//! [`COMPRESS_MIN_BYTES`] and only kept when it actually shrinks the payload.

use super::template::{encode_template, read_template};
use super::expect_end;
use crate::config::{COMPRESS_MIN_BYTES, DEFLATE_LEVEL};
use crate::error::CodecError;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ContainerMode {
    Identity = 0,
    Deflate = 1,
}

impl ContainerMode {
    pub fn from_u32(val: u32) -> Option<Self> {
        match val {
            0 => Some(ContainerMode::Identity),
            1 => Some(ContainerMode::Deflate),
            _ => None,
        }
    }
}

fn checked_u32(len: usize) -> Result<u32, CodecError> {
    u32::try_from(len).map_err(|_| CodecError::LengthOverflow { value: len as u64 })
}

fn deflate(payload: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::new(DEFLATE_LEVEL));
    encoder
        .write_all(payload)
        .map_err(|e| CodecError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CodecError::Compression(e.to_string()))
}

/// Deflate cannot expand input by more than about 1032:1.
const MAX_INFLATE_RATIO: usize = 1032;

fn inflate(compressed: &[u8], raw_len: usize) -> Result<Vec<u8>, CodecError> {
    // The header is untrusted; reserve no more than the stream can produce.
    let mut out = Vec::with_capacity(raw_len.min(compressed.len().saturating_mul(MAX_INFLATE_RATIO)));
    // Read one byte past raw_len so oversized output is detected without inflating all of it.
    DeflateDecoder::new(compressed)
        .take(raw_len as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| CodecError::Compression(e.to_string()))?;
    Ok(out)
}

pub fn encode_bytes(payload: &[u8]) -> Result<Vec<u8>, CodecError> {
    let raw_len = checked_u32(payload.len())?;

    let compressed = if payload.len() >= COMPRESS_MIN_BYTES {
        Some(deflate(payload)?).filter(|c| c.len() < payload.len())
    } else {
        None
    };

    let (mode, body) = match compressed.as_deref() {
        Some(c) => (ContainerMode::Deflate, c),
        None => (ContainerMode::Identity, payload),
    };
    let comp_len = checked_u32(body.len())?;

    let mut out = encode_template(&[mode as u32, raw_len, comp_len]);
    out.extend_from_slice(body);
    let pad = (4 - body.len() % 4) % 4;
    out.resize(out.len() + pad, 0);
    Ok(out)
}

pub fn decode_bytes(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut offset = 0;
    let header = read_template(bytes, &mut offset)?;
    let &[mode, raw_len, comp_len] = header.as_slice() else {
        return Err(CodecError::BadContainerHeader { words: header.len() as u64 });
    };

    let mode = ContainerMode::from_u32(mode).ok_or(CodecError::UnknownContainerMode(mode))?;
    let raw_len = raw_len as usize;
    let comp_len = comp_len as usize;

    let available = bytes.len() - offset;
    if comp_len > available {
        return Err(CodecError::DeclaredLengthExceeds {
            declared: comp_len,
            available,
        });
    }
    let padded = comp_len.div_ceil(4) * 4;
    if padded > available {
        return Err(CodecError::Truncated {
            what: "container padding",
            offset: offset + comp_len,
            needed: padded - comp_len,
            available: available - comp_len,
        });
    }
    expect_end(bytes, offset + padded, "container")?;

    let body = &bytes[offset..offset + comp_len];
    let payload = match mode {
        ContainerMode::Identity => body.to_vec(),
        ContainerMode::Deflate => inflate(body, raw_len)?,
    };

    if payload.len() != raw_len {
        return Err(CodecError::DecompressedLengthMismatch {
            expected: raw_len,
            found: payload.len(),
        });
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode_of(container: &[u8]) -> u32 {
        u32::from_le_bytes(container[1..5].try_into().unwrap())
    }

    #[test]
    fn test_small_payload_stays_identity() {
        let payload = b"hello";
        let container = encode_bytes(payload).unwrap();
        assert_eq!(mode_of(&container), 0);
        // header template (1 + 12) + 5 bytes payload + 3 pad
        assert_eq!(container.len(), 13 + 8);
        assert_eq!(decode_bytes(&container).unwrap(), payload);
    }

    #[test]
    fn test_repetitive_payload_is_deflated() {
        let payload = vec![0xABu8; 4096];
        let container = encode_bytes(&payload).unwrap();
        assert_eq!(mode_of(&container), 1);
        assert!(container.len() < payload.len());
        assert_eq!(container.len() % 4, 1, "uvarint header byte + whole words");
        assert_eq!(decode_bytes(&container).unwrap(), payload);
    }

    #[test]
    fn test_empty_payload() {
        let container = encode_bytes(&[]).unwrap();
        assert_eq!(decode_bytes(&container).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let container = encode_template(&[7, 0, 0]);
        assert_eq!(decode_bytes(&container).unwrap_err(), CodecError::UnknownContainerMode(7));
    }

    #[test]
    fn test_bad_header_rejected() {
        let container = encode_template(&[0, 0]);
        assert_eq!(
            decode_bytes(&container).unwrap_err(),
            CodecError::BadContainerHeader { words: 2 }
        );
    }

    #[test]
    fn test_declared_length_exceeds_payload() {
        let mut container = encode_template(&[0, 100, 100]);
        container.extend_from_slice(&[0u8; 8]);
        assert_eq!(
            decode_bytes(&container).unwrap_err(),
            CodecError::DeclaredLengthExceeds { declared: 100, available: 8 }
        );
    }

    #[test]
    fn test_raw_len_mismatch_rejected() {
        let mut container = encode_template(&[0, 5, 4]);
        container.extend_from_slice(b"abcd");
        assert_eq!(
            decode_bytes(&container).unwrap_err(),
            CodecError::DecompressedLengthMismatch { expected: 5, found: 4 }
        );

        let payload = vec![1u8; 1024];
        let mut container = encode_bytes(&payload).unwrap();
        // Claim a shorter raw length than the deflated stream expands to.
        container[5..9].copy_from_slice(&1000u32.to_le_bytes());
        assert_eq!(
            decode_bytes(&container).unwrap_err(),
            CodecError::DecompressedLengthMismatch { expected: 1000, found: 1001 }
        );
    }

    #[test]
    fn test_corrupt_deflate_stream() {
        let mut container = encode_template(&[1, 64, 4]);
        container.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(matches!(
            decode_bytes(&container),
            Err(CodecError::Compression(_)) | Err(CodecError::DecompressedLengthMismatch { .. })
        ));
    }

    #[test]
    fn test_huge_declared_raw_len_is_rejected() {
        // Four payload bytes cannot inflate to 4 GiB.
        let mut container = encode_template(&[1, u32::MAX, 4]);
        container.extend_from_slice(&[3, 0, 0, 0]);
        assert!(matches!(
            decode_bytes(&container),
            Err(CodecError::Compression(_)) | Err(CodecError::DecompressedLengthMismatch { .. })
        ));
        assert!(inflate(&[3, 0], u32::MAX as usize).unwrap().is_empty());
    }
}
