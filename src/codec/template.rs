// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Template encoding: the full fixed-length vector.

use super::delta::{check_indices, decode_delta, Op};
use super::varint::{read_uvarint, uvarint_len, write_uvarint};
use super::{expect_end, read_u32, to_usize, write_u32};
use crate::error::{CodecError, Result, WirePackError};

pub fn encode_template(values: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(uvarint_len(values.len() as u64) + values.len() * 4);
    write_uvarint(&mut out, values.len() as u64);
    for &value in values {
        write_u32(&mut out, value);
    }
    out
}

/// Decodes a complete template. Trailing bytes are malformed.
pub fn decode_template(bytes: &[u8]) -> std::result::Result<Vec<u32>, CodecError> {
    let mut offset = 0;
    let values = read_template(bytes, &mut offset)?;
    expect_end(bytes, offset, "template")?;
    Ok(values)
}

/// Reads a template body at `offset`; used where a template is followed by more data.
pub(crate) fn read_template(buf: &[u8], offset: &mut usize) -> std::result::Result<Vec<u32>, CodecError> {
    let count = to_usize(read_uvarint(buf, offset)?)?;

    // Check the declared body against the buffer before allocating for it.
    let available = buf.len() - *offset;
    let needed = count
        .checked_mul(4)
        .ok_or(CodecError::LengthOverflow { value: count as u64 })?;
    if needed > available {
        return Err(CodecError::Truncated {
            what: "template body",
            offset: *offset,
            needed,
            available,
        });
    }

    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(read_u32(buf, offset, "template value")?);
    }
    Ok(values)
}

/// Sparse patch turning `base` into `current`: one op per differing index.
pub fn diff_templates(base: &[u32], current: &[u32]) -> Result<Vec<Op>> {
    if base.len() != current.len() {
        return Err(WirePackError::InvalidLength {
            what: "template pair",
            len: current.len(),
        });
    }
    Ok(base
        .iter()
        .zip(current)
        .enumerate()
        .filter(|(_, (b, c))| b != c)
        .map(|(i, (_, &c))| Op::new(i as u64, c))
        .collect())
}

/// A materialized template. Its length is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    values: Vec<u32>,
}

impl Template {
    pub fn new(values: Vec<u32>) -> Self {
        Self { values }
    }

    pub fn zeros(len: usize) -> Self {
        Self { values: vec![0; len] }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self::new(decode_template(bytes)?))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        encode_template(&self.values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[u32] {
        &self.values
    }

    pub fn into_values(self) -> Vec<u32> {
        self.values
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        self.values.get(index).copied()
    }

    /// Applies ops in order. Every index is checked before the first write.
    pub fn apply_ops(&mut self, ops: &[Op]) -> Result<()> {
        check_indices(ops, self.values.len())?;
        for op in ops {
            self.values[op.index as usize] = op.value;
        }
        Ok(())
    }

    pub fn apply_delta(&mut self, delta_bytes: &[u8]) -> Result<()> {
        let ops = decode_delta(delta_bytes)?;
        self.apply_ops(&ops)
    }

    /// Sum of `values[l..=r]`, computed by scanning.
    pub fn range_sum(&self, l: usize, r: usize) -> u64 {
        if r < l || l >= self.values.len() {
            return 0;
        }
        let r = r.min(self.values.len() - 1);
        self.values[l..=r].iter().map(|&v| u64::from(v)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_wire_example() {
        let bytes = encode_template(&[3, 7]);
        assert_eq!(bytes, vec![0x02, 0x03, 0x00, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00]);
        assert_eq!(decode_template(&bytes).unwrap(), vec![3, 7]);
    }

    #[test]
    fn test_empty_template() {
        let bytes = encode_template(&[]);
        assert_eq!(bytes, vec![0x00]);
        assert!(decode_template(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_body() {
        let mut bytes = encode_template(&[1, 2, 3]);
        bytes.pop();
        let err = decode_template(&bytes).unwrap_err();
        assert_eq!(
            err,
            CodecError::Truncated {
                what: "template body",
                offset: 1,
                needed: 12,
                available: 11,
            }
        );
    }

    #[test]
    fn test_huge_declared_count_does_not_allocate() {
        let mut bytes = Vec::new();
        write_uvarint(&mut bytes, 1 << 40);
        assert!(matches!(
            decode_template(&bytes),
            Err(CodecError::Truncated { .. }) | Err(CodecError::LengthOverflow { .. })
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = encode_template(&[9]);
        bytes.push(0);
        assert_eq!(
            decode_template(&bytes).unwrap_err(),
            CodecError::TrailingBytes { what: "template", offset: 5, remaining: 1 }
        );
    }

    #[test]
    fn test_apply_delta_and_range_sum() {
        let mut template = Template::new(vec![10, 20, 30]);
        let delta = crate::codec::encode_delta(&[Op::new(1, 99)]);
        template.apply_delta(&delta).unwrap();
        assert_eq!(template.values(), &[10, 99, 30]);
        assert_eq!(template.range_sum(0, 1), 109);
        assert_eq!(template.range_sum(1, 2), 129);
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let mut template = Template::new(vec![1, 2, 3]);
        let err = template.apply_ops(&[Op::new(0, 50), Op::new(3, 60)]).unwrap_err();
        assert_eq!(err, WirePackError::IndexOutOfRange { index: 3, len: 3 });
        assert_eq!(template.values(), &[1, 2, 3]);
    }

    #[test]
    fn test_diff_templates_patch() {
        let base = vec![1, 2, 3, 4];
        let current = vec![1, 5, 3, 0];
        let ops = diff_templates(&base, &current).unwrap();
        assert_eq!(ops, vec![Op::new(1, 5), Op::new(3, 0)]);

        let mut template = Template::new(base);
        template.apply_ops(&ops).unwrap();
        assert_eq!(template.values(), current.as_slice());

        assert!(diff_templates(&[1], &[1, 2]).is_err());
    }
}
