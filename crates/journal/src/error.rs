// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::io;
use thiserror::Error;
use wirepack::WirePackError;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Invalid magic bytes in journal header")]
    InvalidMagic,
    #[error("Unsupported journal version: {0}")]
    UnsupportedVersion(u32),
    #[error("Checksum mismatch at entry {seq}: expected {expected}, found {found}")]
    ChecksumMismatch { seq: u64, expected: u64, found: u64 },
    #[error("Truncated journal at offset {offset}")]
    Truncated { offset: usize },
    #[error("Sequence gap: expected entry {expected}, found {found}")]
    SequenceGap { expected: u64, found: u64 },
    #[error("Journal entry {seq} does not match the chain being synced")]
    ChainDiverged { seq: u64 },
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error(transparent)]
    WirePack(#[from] WirePackError),
}

pub type Result<T> = std::result::Result<T, JournalError>;
