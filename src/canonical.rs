// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Canonical delta form.
//!
//! Canonicalization keeps the last submitted value for each index, then sorts
//! by `(index, value)` and re-encodes. With one op per index the result is a
//! pure function of the op set, so producers that never coordinate still emit
//! byte-identical deltas for the same updates.
//!
//! A batch that writes one index twice collapses to its last write, which is
//! what applying the batch in order would leave behind.

use crate::codec::{decode_delta, encode_delta, Op};
use crate::error::Result;
use std::collections::BTreeMap;

/// Canonical op list: last write per index, ascending by index.
pub fn canonical_ops(ops: &[Op]) -> Vec<Op> {
    let mut last: BTreeMap<u64, u32> = BTreeMap::new();
    for op in ops {
        last.insert(op.index, op.value);
    }
    last.into_iter().map(|(index, value)| Op { index, value }).collect()
}

/// Decode, coalesce, sort, re-encode.
pub fn canonicalize(delta_bytes: &[u8]) -> Result<Vec<u8>> {
    let ops = decode_delta(delta_bytes)?;
    Ok(encode_delta(&canonical_ops(&ops)))
}

/// Canonical bytes straight from ops.
pub fn canonical_delta(ops: &[Op]) -> Vec<u8> {
    encode_delta(&canonical_ops(ops))
}

/// True when `delta_bytes` already is its own canonical form, byte for byte.
///
/// Strictly ascending indices are not enough: an overlong uvarint decodes to
/// the same ops but is not the canonical encoding.
pub fn is_canonical(delta_bytes: &[u8]) -> Result<bool> {
    Ok(canonicalize(delta_bytes)? == delta_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CodecError, WirePackError};

    #[test]
    fn test_sorts_by_index() {
        let raw = encode_delta(&[Op::new(5, 1), Op::new(2, 9), Op::new(7, 3)]);
        let canon = canonicalize(&raw).unwrap();
        assert_eq!(canon, encode_delta(&[Op::new(2, 9), Op::new(5, 1), Op::new(7, 3)]));
        assert!(is_canonical(&canon).unwrap());
        assert!(!is_canonical(&raw).unwrap());
    }

    #[test]
    fn test_idempotent() {
        let raw = encode_delta(&[Op::new(3, 30), Op::new(1, 10), Op::new(2, 20)]);
        let once = canonicalize(&raw).unwrap();
        let twice = canonicalize(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_order_erasing_for_distinct_indices() {
        let a = encode_delta(&[Op::new(1, 10), Op::new(2, 20), Op::new(3, 30)]);
        let b = encode_delta(&[Op::new(3, 30), Op::new(1, 10), Op::new(2, 20)]);
        assert_eq!(canonicalize(&a).unwrap(), canonicalize(&b).unwrap());
    }

    #[test]
    fn test_duplicate_index_keeps_last_write() {
        let raw = encode_delta(&[Op::new(4, 900), Op::new(1, 1), Op::new(4, 5)]);
        let canon = canonicalize(&raw).unwrap();
        assert_eq!(decode_delta(&canon).unwrap(), vec![Op::new(1, 1), Op::new(4, 5)]);

        // Same as applying the raw batch in order.
        let mut applied = crate::codec::Template::zeros(5);
        applied.apply_delta(&raw).unwrap();
        let mut via_canon = crate::codec::Template::zeros(5);
        via_canon.apply_delta(&canon).unwrap();
        assert_eq!(applied, via_canon);
    }

    #[test]
    fn test_overlong_varint_is_not_canonical() {
        // count 1, index 1 spelled as two bytes (0x81 0x00), value 0x63.
        let overlong = [0x01, 0x81, 0x00, 0x63, 0, 0, 0];
        assert_eq!(decode_delta(&overlong).unwrap(), vec![Op::new(1, 0x63)]);
        assert!(!is_canonical(&overlong).unwrap());
        let canon = canonicalize(&overlong).unwrap();
        assert_eq!(canon, vec![0x01, 0x01, 0x63, 0, 0, 0]);
        assert!(is_canonical(&canon).unwrap());
    }

    #[test]
    fn test_malformed_input_fails_before_sorting() {
        let err = canonicalize(&[0x02, 0x01]).unwrap_err();
        assert!(matches!(err, WirePackError::Codec(CodecError::Truncated { .. })));
    }
}
