// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Canonical BLAKE3 hashing.
//!
//! Every externally visible digest in wirepack is BLAKE3:
//! - delta hashes, receipt signatures and receipt hashes
//! - commitment tree leaves and internal nodes
//! - state anchors and drift hashes in run receipts
//!
//! Same bytes in, same 32 bytes out, on every architecture.

use crate::codec::template::encode_template;
use crate::config::HASH_LEN;

pub type Hash32 = [u8; HASH_LEN];

/// BLAKE3 of a byte slice.
pub fn hash_bytes(data: &[u8]) -> Hash32 {
    *blake3::hash(data).as_bytes()
}

/// BLAKE3 of the concatenation of `parts`, without building the concatenation.
pub fn hash_concat(parts: &[&[u8]]) -> Hash32 {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Leaf hash: the value widened to 8 bytes, little-endian.
pub fn leaf_hash(value: u32) -> Hash32 {
    hash_bytes(&u64::from(value).to_le_bytes())
}

/// Internal node hash: `H(left || right)`.
pub fn node_hash(left: &Hash32, right: &Hash32) -> Hash32 {
    hash_concat(&[left, right])
}

/// State anchor: BLAKE3 of the template encoding of `values`.
pub fn state_hash(values: &[u32]) -> Hash32 {
    hash_bytes(&encode_template(values))
}

pub fn to_hex(hash: &Hash32) -> String {
    hex::encode(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake3_bytes_hash() {
        let data = b"test data";
        let hash1 = hash_bytes(data);
        let hash2 = hash_bytes(data);

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 32);
    }

    #[test]
    fn test_hash_concat_matches_joined_input() {
        let joined = hash_bytes(b"parentdelta");
        let streamed = hash_concat(&[b"parent", b"delta"]);
        assert_eq!(joined, streamed);
    }

    #[test]
    fn test_leaf_hash_is_eight_byte_widening() {
        let expected = hash_bytes(&[7, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(leaf_hash(7), expected);
        assert_ne!(leaf_hash(7), leaf_hash(8));
    }

    #[test]
    fn test_node_hash_is_order_sensitive() {
        let a = leaf_hash(1);
        let b = leaf_hash(2);
        assert_ne!(node_hash(&a, &b), node_hash(&b, &a));
    }

    #[test]
    fn test_state_hash_tracks_values() {
        assert_eq!(state_hash(&[1, 2, 3]), state_hash(&[1, 2, 3]));
        assert_ne!(state_hash(&[1, 2, 3]), state_hash(&[1, 2, 4]));
        assert_eq!(to_hex(&state_hash(&[])).len(), 64);
    }
}
