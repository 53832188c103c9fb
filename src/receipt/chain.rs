// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Append-only receipt chain and fail-fast verification.

use super::{receipt_hash, KeyedHashSigner, Receipt, ReceiptSigner};
use crate::config::ZERO_HASH;
use crate::error::{ChainFault, FaultKind, Result, WirePackError};
use crate::hash::{hash_bytes, to_hex, Hash32};
use tracing::{debug, warn};

/// Walks `receipts` from the zero hash and stops at the first mismatch.
///
/// Returns the head hash (last `receipt_hash`, or the zero hash for an empty chain).
pub fn verify_chain_detailed<S: ReceiptSigner + ?Sized>(
    signer: &S,
    receipts: &[Receipt],
) -> std::result::Result<Hash32, ChainFault> {
    let mut expected = ZERO_HASH;
    for (index, r) in receipts.iter().enumerate() {
        let fault = |kind| {
            warn!(index, ?kind, "receipt chain verification failed");
            ChainFault { index, kind }
        };
        if r.parent_hash != expected {
            return Err(fault(FaultKind::ParentMismatch));
        }
        if hash_bytes(&r.delta) != r.delta_hash {
            return Err(fault(FaultKind::DeltaHashMismatch));
        }
        if signer.sign(&expected, &r.delta_hash) != r.signature {
            return Err(fault(FaultKind::SignatureMismatch));
        }
        if receipt_hash(&expected, &r.delta_hash, &r.signature) != r.receipt_hash {
            return Err(fault(FaultKind::ReceiptHashMismatch));
        }
        expected = r.receipt_hash;
    }
    Ok(expected)
}

/// True when every receipt links, hashes and signs correctly under the demo key.
pub fn verify_chain(receipts: &[Receipt]) -> bool {
    verify_chain_detailed(&KeyedHashSigner::default(), receipts).is_ok()
}

#[derive(Debug, Clone)]
pub struct ReceiptChain<S: ReceiptSigner = KeyedHashSigner> {
    signer: S,
    receipts: Vec<Receipt>,
    head: Hash32,
}

impl ReceiptChain<KeyedHashSigner> {
    pub fn new() -> Self {
        Self::with_signer(KeyedHashSigner::default())
    }

    /// Adopts externally stored receipts after verifying them.
    pub fn from_receipts(receipts: Vec<Receipt>) -> Result<Self> {
        let signer = KeyedHashSigner::default();
        let head = verify_chain_detailed(&signer, &receipts).map_err(WirePackError::ChainBroken)?;
        debug!(receipts = receipts.len(), head = %to_hex(&head), "receipt chain adopted");
        Ok(Self { signer, receipts, head })
    }
}

impl Default for ReceiptChain<KeyedHashSigner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ReceiptSigner> ReceiptChain<S> {
    pub fn with_signer(signer: S) -> Self {
        Self {
            signer,
            receipts: Vec::new(),
            head: ZERO_HASH,
        }
    }

    /// Wraps `delta` in a receipt linked to the current head.
    pub fn append(&mut self, delta: Vec<u8>) -> &Receipt {
        let receipt = Receipt::with_signer(&self.signer, self.head, delta);
        self.head = receipt.receipt_hash;
        self.receipts.push(receipt);
        &self.receipts[self.receipts.len() - 1]
    }

    /// Hash of the last receipt, or the zero hash.
    pub fn head(&self) -> Hash32 {
        self.head
    }

    pub fn len(&self) -> usize {
        self.receipts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty()
    }

    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    pub fn into_receipts(self) -> Vec<Receipt> {
        self.receipts
    }

    #[cfg(test)]
    pub(crate) fn receipts_mut(&mut self) -> &mut Vec<Receipt> {
        &mut self.receipts
    }

    /// Verifies every receipt and that the walk ends at the recorded head.
    ///
    /// The head check catches a receipt removed from the end, which a walk alone accepts.
    pub fn verify(&self) -> Result<()> {
        let reached = verify_chain_detailed(&self.signer, &self.receipts).map_err(WirePackError::ChainBroken)?;
        if reached != self.head {
            warn!(reached = %to_hex(&reached), head = %to_hex(&self.head), "receipt chain head mismatch");
            return Err(WirePackError::ChainBroken(ChainFault {
                index: self.receipts.len(),
                kind: FaultKind::HeadMismatch,
            }));
        }
        Ok(())
    }

    /// Verifies `receipts` against an externally anchored head and length.
    pub fn verify_anchored(&self, receipts: &[Receipt], head: &Hash32, len: usize) -> Result<()> {
        if receipts.len() != len {
            return Err(WirePackError::ChainBroken(ChainFault {
                index: receipts.len().min(len),
                kind: FaultKind::LengthMismatch,
            }));
        }
        let reached = verify_chain_detailed(&self.signer, receipts).map_err(WirePackError::ChainBroken)?;
        if reached != *head {
            return Err(WirePackError::ChainBroken(ChainFault {
                index: receipts.len(),
                kind: FaultKind::HeadMismatch,
            }));
        }
        Ok(())
    }
}
