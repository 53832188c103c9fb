// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Deterministic scenario harness.
//!
//! Each scenario generates a seeded workload, canonicalizes every batch twice
//! (generation order and a shuffle that keeps each index's write order),
//! drives one consumer and checks it against a materialized mirror every
//! `stride` updates. The outcome is a [`ScenarioReport`] that
//! [`crate::proof::seal`] turns into a run receipt.

mod scenarios;

use crate::canonical::{canonical_delta, canonicalize};
use crate::codec::{encode_bytes, Op};
use crate::config::CODEC_ID;
use crate::error::{Result, WirePackError};
use crate::hash::{hash_bytes, to_hex};
use crate::workload::Workload;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Upper bound for generated values unless overridden.
pub const DEFAULT_VALUE_MAX: u32 = 200_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Fenwick,
    Merkle,
    Correlation,
    Merge,
    Receipts,
    Join,
    Replay,
}

impl Scenario {
    pub const ALL: [Scenario; 7] = [
        Scenario::Fenwick,
        Scenario::Merkle,
        Scenario::Correlation,
        Scenario::Merge,
        Scenario::Receipts,
        Scenario::Join,
        Scenario::Replay,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Fenwick => "fenwick",
            Scenario::Merkle => "merkle",
            Scenario::Correlation => "correlation",
            Scenario::Merge => "merge",
            Scenario::Receipts => "receipts",
            Scenario::Join => "join",
            Scenario::Replay => "replay",
        }
    }

    /// Locked parameters for this scenario.
    pub fn params(&self) -> ScenarioParams {
        let base = ScenarioParams::default();
        match self {
            Scenario::Fenwick => ScenarioParams { seed: 39039, checks: 512, ..base },
            Scenario::Correlation => ScenarioParams { seed: 40040, ..base },
            Scenario::Receipts => ScenarioParams { seed: 41041, ..base },
            Scenario::Merkle => ScenarioParams { seed: 42042, ..base },
            Scenario::Merge => ScenarioParams {
                seed: 43043,
                k_updates: 1024,
                writers: 8,
                ..base
            },
            Scenario::Join => ScenarioParams { seed: 44044, ..base },
            Scenario::Replay => ScenarioParams { seed: 46046, k_updates: 4096, ..base },
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|sc| sc.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown scenario '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioParams {
    pub seed: u64,
    /// Vector length (leaf count for the commitment tree).
    pub n: usize,
    /// Updates per writer.
    pub k_updates: usize,
    /// Point edits per update.
    pub m_edits: usize,
    /// Checkpoints against the mirror, and queries where the scenario has them.
    pub checks: usize,
    pub writers: usize,
    pub value_max: u32,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            seed: 0,
            n: 4096,
            k_updates: 2048,
            m_edits: 4,
            checks: 256,
            writers: 1,
            value_max: DEFAULT_VALUE_MAX,
        }
    }
}

impl ScenarioParams {
    /// Updates between two mirror checkpoints.
    pub fn stride(&self) -> usize {
        (self.k_updates / self.checks.max(1)).max(1)
    }

    pub fn is_checkpoint(&self, step: usize) -> bool {
        (step + 1) % self.stride() == 0 || step + 1 == self.k_updates
    }

    fn validate(&self) -> Result<()> {
        if self.n == 0 {
            return Err(WirePackError::InvalidLength { what: "scenario vector", len: self.n });
        }
        if self.writers == 0 {
            return Err(WirePackError::InvalidLength { what: "scenario writer count", len: self.writers });
        }
        Ok(())
    }
}

/// Canonicalization outcomes over every generated batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonCheck {
    pub idempotent: bool,
    pub stable: bool,
}

impl Default for CanonCheck {
    fn default() -> Self {
        Self { idempotent: true, stable: true }
    }
}

impl CanonCheck {
    /// Canonicalizes `ops` as generated and shuffled, records both checks, returns the canonical bytes.
    pub fn batch(&mut self, workload: &mut Workload, ops: &[Op]) -> Result<Vec<u8>> {
        let canon_a = canonical_delta(ops);
        let canon_b = canonical_delta(&workload.shuffled(ops));
        if canonicalize(&canon_a)? != canon_a {
            self.idempotent = false;
        }
        if canon_a != canon_b {
            self.stable = false;
        }
        Ok(canon_a)
    }

    pub fn ok(&self) -> bool {
        self.idempotent && self.stable
    }
}

/// Raw and container-packed sizes of the template and delta stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSizes {
    pub raw_template_bytes: usize,
    pub raw_delta_stream_bytes: usize,
    pub packed_template_bytes: usize,
    pub packed_delta_stream_bytes: usize,
}

impl WireSizes {
    pub fn measure(template: &[u8], delta_stream: &[u8]) -> Result<Self> {
        Ok(Self {
            raw_template_bytes: template.len(),
            raw_delta_stream_bytes: delta_stream.len(),
            packed_template_bytes: encode_bytes(template)?.len(),
            packed_delta_stream_bytes: encode_bytes(delta_stream)?.len(),
        })
    }
}

/// Outcome of one scenario run. Contains no timings, so equal inputs give equal reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub codec: String,
    pub scenario: Scenario,
    pub params: ScenarioParams,
    pub canon: CanonCheck,
    pub checks_run: usize,
    pub invariant_ok: bool,
    pub template_hash: String,
    pub deltas_hash: String,
    pub final_state_hash: String,
    pub sizes: WireSizes,
    pub details: BTreeMap<String, String>,
}

impl ScenarioReport {
    pub fn ok(&self) -> bool {
        self.canon.ok() && self.invariant_ok
    }
}

/// Shared bookkeeping while a scenario runs.
pub(crate) struct Run {
    pub(crate) scenario: Scenario,
    pub(crate) params: ScenarioParams,
    pub(crate) canon: CanonCheck,
    pub(crate) checks_run: usize,
    pub(crate) invariant_ok: bool,
    pub(crate) details: BTreeMap<String, String>,
}

impl Run {
    fn new(scenario: Scenario, params: ScenarioParams) -> Self {
        Self {
            scenario,
            params,
            canon: CanonCheck::default(),
            checks_run: 0,
            invariant_ok: true,
            details: BTreeMap::new(),
        }
    }

    /// Records a mirror comparison. Returns `Ok(false)` when the run should stop.
    pub(crate) fn checkpoint(&mut self, step: usize, outcome: Result<()>) -> Result<bool> {
        self.checks_run += 1;
        match outcome {
            Ok(()) => Ok(true),
            Err(err) if err.is_invariant_violation() => {
                warn!(scenario = %self.scenario, step, %err, "checkpoint failed");
                self.invariant_ok = false;
                self.details.insert("failed_step".into(), step.to_string());
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Records a boolean check that is not a mirror comparison.
    pub(crate) fn expect(&mut self, key: &str, passed: bool) {
        self.checks_run += 1;
        if !passed {
            warn!(scenario = %self.scenario, check = key, "check failed");
            self.invariant_ok = false;
        }
        self.details.insert(key.to_string(), passed.to_string());
    }

    pub(crate) fn detail(&mut self, key: &str, value: impl ToString) {
        self.details.insert(key.to_string(), value.to_string());
    }

    fn finish(self, template: &[u8], delta_stream: &[u8], final_state: [u8; 32]) -> Result<ScenarioReport> {
        Ok(ScenarioReport {
            codec: CODEC_ID.to_string(),
            scenario: self.scenario,
            params: self.params,
            canon: self.canon,
            checks_run: self.checks_run,
            invariant_ok: self.invariant_ok,
            template_hash: to_hex(&hash_bytes(template)),
            deltas_hash: to_hex(&hash_bytes(delta_stream)),
            final_state_hash: to_hex(&final_state),
            sizes: WireSizes::measure(template, delta_stream)?,
            details: self.details,
        })
    }
}

/// Wire artifacts a scenario hands back for hashing and sizing.
pub(crate) struct Outcome {
    pub(crate) template: Vec<u8>,
    pub(crate) delta_stream: Vec<u8>,
    pub(crate) final_state: [u8; 32],
}

/// Runs `scenario` with `params`.
///
/// Invariant and canonicalization failures are reported in the result, not
/// returned as errors. Errors mean the run itself could not proceed.
pub fn run(scenario: Scenario, params: ScenarioParams) -> Result<ScenarioReport> {
    params.validate()?;
    let mut run = Run::new(scenario, params);
    let outcome = match scenario {
        Scenario::Fenwick => scenarios::fenwick(&mut run)?,
        Scenario::Merkle => scenarios::merkle(&mut run)?,
        Scenario::Correlation => scenarios::correlation(&mut run)?,
        Scenario::Merge => scenarios::merge(&mut run)?,
        Scenario::Receipts => scenarios::receipts(&mut run)?,
        Scenario::Join => scenarios::join(&mut run)?,
        Scenario::Replay => scenarios::replay(&mut run)?,
    };
    let report = run.finish(&outcome.template, &outcome.delta_stream, outcome.final_state)?;
    info!(
        scenario = %scenario,
        ok = report.ok(),
        checks = report.checks_run,
        state = %report.final_state_hash,
        "scenario finished"
    );
    Ok(report)
}
