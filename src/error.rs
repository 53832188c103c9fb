// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.
//!
//! Three families are kept apart:
//! - [`CodecError`]: malformed input, detected while decoding.
//! - [`WirePackError::InvariantViolation`]: a maintained value disagreed with
//!   a snapshot recompute. This is a logic error, never an input error.
//! - [`WirePackError::ChainBroken`]: a receipt chain failed verification.

use core::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Truncated uvarint at offset {offset}")]
    TruncatedVarint { offset: usize },

    #[error("Uvarint at offset {offset} exceeds 63 bits")]
    VarintOverflow { offset: usize },

    #[error("Truncated {what} at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        what: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Trailing bytes after {what} at offset {offset}: {remaining} unread")]
    TrailingBytes {
        what: &'static str,
        offset: usize,
        remaining: usize,
    },

    #[error("Declared length {declared} exceeds available payload {available}")]
    DeclaredLengthExceeds { declared: usize, available: usize },

    #[error("Unknown container mode: {0}")]
    UnknownContainerMode(u32),

    #[error("Container header must hold 3 words, found {words}")]
    BadContainerHeader { words: u64 },

    #[error("Decompressed length mismatch: expected {expected}, found {found}")]
    DecompressedLengthMismatch { expected: usize, found: usize },

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Length {value} does not fit the wire format")]
    LengthOverflow { value: u64 },
}

/// What went wrong at the first failing receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    ParentMismatch,
    DeltaHashMismatch,
    SignatureMismatch,
    ReceiptHashMismatch,
    HeadMismatch,
    LengthMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainFault {
    pub index: usize,
    pub kind: FaultKind,
}

impl fmt::Display for ChainFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} at receipt {}", self.kind, self.index)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WirePackError {
    #[error("Malformed input: {0}")]
    Codec(#[from] CodecError),

    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: u64, len: usize },

    #[error("Value {value} at index {index} leaves the u32 range")]
    ValueOutOfRange { index: u64, value: i64 },

    #[error("Invalid {what} length: {len}")]
    InvalidLength { what: &'static str, len: usize },

    #[error("Invariant violated in {structure}: {detail}")]
    InvariantViolation {
        structure: &'static str,
        detail: String,
    },

    #[error("Receipt chain broken: {0}")]
    ChainBroken(ChainFault),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl WirePackError {
    /// True for errors caused by bad input bytes.
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, WirePackError::Codec(_))
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, WirePackError::InvariantViolation { .. })
    }
}

pub type Result<T> = std::result::Result<T, WirePackError>;
