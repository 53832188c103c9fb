// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Protocol constants.

/// Identifier written into run receipts.
pub const CODEC_ID: &str = "wirepack_v1";

/// A uvarint whose accumulated shift passes this bound is rejected.
pub const MAX_VARINT_SHIFT: u32 = 63;

/// Payloads shorter than this are never compressed by the bytes container.
pub const COMPRESS_MIN_BYTES: usize = 64;

/// Deflate level used by the bytes container (0..=9).
pub const DEFLATE_LEVEL: u32 = 9;

/// Length in bytes of every hash in the system (BLAKE3).
pub const HASH_LEN: usize = 32;

/// Parent hash of the first receipt in a chain.
pub const ZERO_HASH: [u8; HASH_LEN] = [0u8; HASH_LEN];

/// Fixed demo key for receipt signatures. Not a secret.
pub const DEMO_SIGNING_KEY: &[u8] = b"wirepack-demo-key";
