// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Hash-linked delta receipts.
//!
//! ```text
//! delta_hash   = H(delta_bytes)
//! signature    = H(key || parent_hash || delta_hash)
//! receipt_hash = H(parent_hash || delta_hash || signature)
//! ```
//! The first receipt's parent is the zero hash; every later parent is the
//! previous receipt's `receipt_hash`.

pub mod chain;
pub mod gated;

pub use chain::{verify_chain, verify_chain_detailed, ReceiptChain};
pub use gated::GatedSum;

use crate::config::DEMO_SIGNING_KEY;
use crate::hash::{hash_bytes, hash_concat, Hash32};
use serde::{Deserialize, Serialize};

/// Produces the signature field of a receipt.
///
/// The demo implementation is a keyed hash. A real MAC or signature scheme
/// plugs in here without touching chain verification.
pub trait ReceiptSigner {
    fn sign(&self, parent_hash: &Hash32, delta_hash: &Hash32) -> Hash32;
}

/// `H(key || parent || delta_hash)` with a fixed key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedHashSigner {
    key: Vec<u8>,
}

impl KeyedHashSigner {
    pub fn new(key: &[u8]) -> Self {
        Self { key: key.to_vec() }
    }
}

impl Default for KeyedHashSigner {
    fn default() -> Self {
        Self::new(DEMO_SIGNING_KEY)
    }
}

impl ReceiptSigner for KeyedHashSigner {
    fn sign(&self, parent_hash: &Hash32, delta_hash: &Hash32) -> Hash32 {
        hash_concat(&[&self.key, parent_hash, delta_hash])
    }
}

pub fn receipt_hash(parent_hash: &Hash32, delta_hash: &Hash32, signature: &Hash32) -> Hash32 {
    hash_concat(&[parent_hash, delta_hash, signature])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub parent_hash: Hash32,
    pub delta: Vec<u8>,
    pub delta_hash: Hash32,
    pub signature: Hash32,
    pub receipt_hash: Hash32,
}

impl Receipt {
    /// Receipt signed with the demo key.
    pub fn new(parent_hash: Hash32, delta: Vec<u8>) -> Self {
        Self::with_signer(&KeyedHashSigner::default(), parent_hash, delta)
    }

    pub fn with_signer<S: ReceiptSigner + ?Sized>(signer: &S, parent_hash: Hash32, delta: Vec<u8>) -> Self {
        let delta_hash = hash_bytes(&delta);
        let signature = signer.sign(&parent_hash, &delta_hash);
        let receipt_hash = receipt_hash(&parent_hash, &delta_hash, &signature);
        Self {
            parent_hash,
            delta,
            delta_hash,
            signature,
            receipt_hash,
        }
    }
}
