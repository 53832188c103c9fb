// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Receipt-gated range sums.
//!
//! Every committed delta is canonicalized, applied to a [`SumIndex`] and
//! wrapped in a receipt. Queries are answered only while the receipt chain
//! verifies end to end.

use super::chain::ReceiptChain;
use crate::canonical::canonicalize;
use crate::error::Result;
use crate::hash::Hash32;
use crate::index::SumIndex;

#[derive(Debug, Clone)]
pub struct GatedSum {
    index: SumIndex,
    chain: ReceiptChain,
}

impl GatedSum {
    pub fn from_values(values: &[u32]) -> Result<Self> {
        Ok(Self {
            index: SumIndex::from_values(values)?,
            chain: ReceiptChain::new(),
        })
    }

    /// Canonicalizes, applies and records one delta. Returns the new chain head.
    ///
    /// A delta that fails to decode or apply is not recorded.
    pub fn commit(&mut self, delta_bytes: &[u8]) -> Result<Hash32> {
        let canonical = canonicalize(delta_bytes)?;
        self.index.apply_delta(&canonical)?;
        Ok(self.chain.append(canonical).receipt_hash)
    }

    pub fn chain(&self) -> &ReceiptChain {
        &self.chain
    }

    #[cfg(test)]
    pub(crate) fn chain_mut(&mut self) -> &mut ReceiptChain {
        &mut self.chain
    }

    /// `sum(values[l..=r])`, released only for an intact chain.
    pub fn range_sum(&self, l: usize, r: usize) -> Result<u64> {
        self.chain.verify()?;
        Ok(self.index.range_sum(l, r))
    }

    pub fn total(&self) -> Result<u64> {
        self.chain.verify()?;
        Ok(self.index.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_delta, Op};
    use crate::error::WirePackError;

    #[test]
    fn test_queries_unlock_on_valid_chain() {
        let mut gated = GatedSum::from_values(&[10, 20, 30]).unwrap();
        gated.commit(&encode_delta(&[Op::new(1, 99)])).unwrap();
        gated.commit(&encode_delta(&[Op::new(2, 1), Op::new(0, 0)])).unwrap();

        assert_eq!(gated.range_sum(0, 2).unwrap(), 100);
        assert_eq!(gated.total().unwrap(), 100);
        assert_eq!(gated.chain().len(), 2);
    }

    #[test]
    fn test_tampered_chain_locks_queries() {
        let mut gated = GatedSum::from_values(&[1, 2, 3, 4]).unwrap();
        gated.commit(&encode_delta(&[Op::new(3, 40)])).unwrap();
        gated.commit(&encode_delta(&[Op::new(0, 10)])).unwrap();

        gated.chain_mut().receipts_mut()[0].delta[1] ^= 0x02;
        let err = gated.range_sum(0, 3).unwrap_err();
        assert!(matches!(err, WirePackError::ChainBroken(_)));
    }

    #[test]
    fn test_rejected_delta_is_not_recorded() {
        let mut gated = GatedSum::from_values(&[1, 2]).unwrap();
        assert!(gated.commit(&encode_delta(&[Op::new(5, 1)])).is_err());
        assert!(gated.chain().is_empty());
        assert_eq!(gated.total().unwrap(), 3);
    }
}
