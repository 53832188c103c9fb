// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Pearson correlation sufficient statistics over two parallel delta streams.
//!
//! Five running sums are kept in `i128`:
//! ```text
//! Sx, Sy, Sxx, Syy, Sxy
//! numerator = n*Sxy - Sx*Sy
//! var_x     = n*Sxx - Sx^2
//! var_y     = n*Syy - Sy^2
//! denominator^2 = var_x * var_y
//! ```
//! With `n < 2^31` and `u32` inputs every component fits `i128` exactly.
//! Their product may not, so components are compared factor by factor and
//! `denominator_sq` is checked.

use crate::codec::{check_indices, decode_delta, Op};
use crate::error::{Result, WirePackError};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Longest supported vector; keeps `n * Sxx` inside `i128`.
pub const MAX_LEN: usize = i32::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PearsonComponents {
    pub numerator: i128,
    pub var_x: i128,
    pub var_y: i128,
}

impl PearsonComponents {
    /// `var_x * var_y`, or `None` when the product leaves `i128`.
    pub fn denominator_sq(&self) -> Option<i128> {
        self.var_x.checked_mul(self.var_y)
    }

    /// Lossy coefficient for display. `None` when either side has zero variance.
    pub fn coefficient(&self) -> Option<f64> {
        if self.var_x == 0 || self.var_y == 0 {
            return None;
        }
        Some(self.numerator as f64 / ((self.var_x as f64).sqrt() * (self.var_y as f64).sqrt()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Sums {
    sx: i128,
    sy: i128,
    sxx: i128,
    syy: i128,
    sxy: i128,
}

impl Sums {
    fn scan(x: &[u32], y: &[u32]) -> Self {
        let mut s = Sums::default();
        for (&xi, &yi) in x.iter().zip(y) {
            let (xi, yi) = (i128::from(xi), i128::from(yi));
            s.sx += xi;
            s.sy += yi;
            s.sxx += xi * xi;
            s.syy += yi * yi;
            s.sxy += xi * yi;
        }
        s
    }

    fn components(&self, n: usize) -> PearsonComponents {
        let n = n as i128;
        PearsonComponents {
            numerator: n * self.sxy - self.sx * self.sy,
            var_x: n * self.sxx - self.sx * self.sx,
            var_y: n * self.syy - self.sy * self.sy,
        }
    }
}

fn check_pair(x: &[u32], y: &[u32]) -> Result<()> {
    if x.len() != y.len() {
        return Err(WirePackError::InvalidLength { what: "correlation y vector", len: y.len() });
    }
    if x.is_empty() || x.len() > MAX_LEN {
        return Err(WirePackError::InvalidLength { what: "correlation vector", len: x.len() });
    }
    Ok(())
}

/// Components recomputed by scanning both vectors.
pub fn recompute(x: &[u32], y: &[u32]) -> Result<PearsonComponents> {
    check_pair(x, y)?;
    Ok(Sums::scan(x, y).components(x.len()))
}

#[derive(Debug, Clone)]
pub struct CorrelationAggregator {
    x: Vec<u32>,
    y: Vec<u32>,
    sums: Sums,
}

impl CorrelationAggregator {
    pub fn new(x: Vec<u32>, y: Vec<u32>) -> Result<Self> {
        check_pair(&x, &y)?;
        let sums = Sums::scan(&x, &y);
        Ok(Self { x, y, sums })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn x(&self) -> &[u32] {
        &self.x
    }

    pub fn y(&self) -> &[u32] {
        &self.y
    }

    /// O(1): adjusts the sums by the change at `index`.
    pub fn set_x(&mut self, index: usize, value: u32) -> Result<()> {
        let old = *self
            .x
            .get(index)
            .ok_or(WirePackError::IndexOutOfRange { index: index as u64, len: self.x.len() })?;
        let (old, new, y) = (i128::from(old), i128::from(value), i128::from(self.y[index]));
        let d = new - old;
        self.sums.sx += d;
        self.sums.sxx += new * new - old * old;
        self.sums.sxy += d * y;
        self.x[index] = value;
        Ok(())
    }

    pub fn set_y(&mut self, index: usize, value: u32) -> Result<()> {
        let old = *self
            .y
            .get(index)
            .ok_or(WirePackError::IndexOutOfRange { index: index as u64, len: self.y.len() })?;
        let (old, new, x) = (i128::from(old), i128::from(value), i128::from(self.x[index]));
        let d = new - old;
        self.sums.sy += d;
        self.sums.syy += new * new - old * old;
        self.sums.sxy += x * d;
        self.y[index] = value;
        Ok(())
    }

    pub fn apply_x_ops(&mut self, ops: &[Op]) -> Result<()> {
        check_indices(ops, self.len())?;
        for op in ops {
            self.set_x(op.index as usize, op.value)?;
        }
        Ok(())
    }

    pub fn apply_y_ops(&mut self, ops: &[Op]) -> Result<()> {
        check_indices(ops, self.len())?;
        for op in ops {
            self.set_y(op.index as usize, op.value)?;
        }
        Ok(())
    }

    pub fn apply_x_delta(&mut self, delta_bytes: &[u8]) -> Result<()> {
        let ops = decode_delta(delta_bytes)?;
        self.apply_x_ops(&ops)
    }

    pub fn apply_y_delta(&mut self, delta_bytes: &[u8]) -> Result<()> {
        let ops = decode_delta(delta_bytes)?;
        self.apply_y_ops(&ops)
    }

    pub fn components(&self) -> PearsonComponents {
        self.sums.components(self.len())
    }

    /// Compares the maintained components with a full rescan.
    pub fn verify(&self) -> Result<()> {
        self.verify_against(&self.x, &self.y)
    }

    /// Compares the maintained components with a rescan of an external snapshot.
    pub fn verify_against(&self, x: &[u32], y: &[u32]) -> Result<()> {
        let expected = recompute(x, y)?;
        let maintained = self.components();
        if maintained != expected {
            warn!(?maintained, ?expected, "correlation components diverged");
            return Err(WirePackError::InvariantViolation {
                structure: "CorrelationAggregator",
                detail: format!("maintained {maintained:?} != recomputed {expected:?}"),
            });
        }
        Ok(())
    }
}
