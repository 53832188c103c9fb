// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Run receipts.

use crate::error::{Result, WirePackError};
use crate::harness::ScenarioReport;
use crate::hash::{hash_bytes, to_hex};
use serde::{Deserialize, Serialize};

/// A scenario report sealed with its drift hash.
///
/// `drift_hash` is BLAKE3 over the compact JSON of `report`. The report holds
/// no timings, so two runs with the same seed and parameters produce
/// byte-identical receipts, and any behavioural drift changes the hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunReceipt {
    pub report: ScenarioReport,
    pub drift_hash: String,
}

fn drift_of(report: &ScenarioReport) -> Result<String> {
    let body = serde_json::to_vec(report).map_err(|e| WirePackError::Serialization(e.to_string()))?;
    Ok(to_hex(&hash_bytes(&body)))
}

pub fn seal(report: ScenarioReport) -> Result<RunReceipt> {
    let drift_hash = drift_of(&report)?;
    Ok(RunReceipt { report, drift_hash })
}

impl RunReceipt {
    /// Recomputes the drift hash and compares.
    pub fn verify_drift(&self) -> Result<bool> {
        Ok(drift_of(&self.report)? == self.drift_hash)
    }

    pub fn ok(&self) -> bool {
        self.report.ok()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| WirePackError::Serialization(e.to_string()))
    }
}
