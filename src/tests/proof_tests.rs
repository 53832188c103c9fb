// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::harness::{run, Scenario, ScenarioParams};
use crate::proof::{seal, RunReceipt};

fn receipt() -> RunReceipt {
    let params = ScenarioParams {
        seed: 77,
        n: 32,
        k_updates: 12,
        m_edits: 3,
        checks: 4,
        writers: 2,
        value_max: 100,
    };
    seal(run(Scenario::Receipts, params).unwrap()).unwrap()
}

#[test]
fn test_drift_hash_verifies() {
    let r = receipt();
    assert!(r.ok());
    assert!(r.verify_drift().unwrap());
    assert_eq!(r.drift_hash.len(), 64);
}

#[test]
fn test_edited_report_breaks_drift_hash() {
    let mut r = receipt();
    r.report.invariant_ok = false;
    assert!(!r.verify_drift().unwrap());

    let mut r = receipt();
    r.report.details.insert("receipts".into(), "13".into());
    assert!(!r.verify_drift().unwrap());
}

#[test]
fn test_json_roundtrip_keeps_drift() {
    let r = receipt();
    let json = r.to_json_pretty().unwrap();
    let back: RunReceipt = serde_json::from_str(&json).unwrap();
    assert_eq!(back, r);
    assert!(back.verify_drift().unwrap());
    assert!(json.contains("\"scenario\": \"receipts\""));
}
