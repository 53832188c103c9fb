// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::error::WirePackError;
use crate::harness::{run, Scenario, ScenarioParams};

fn small(seed: u64) -> ScenarioParams {
    ScenarioParams {
        seed,
        n: 64,
        k_updates: 40,
        m_edits: 4,
        checks: 8,
        writers: 3,
        value_max: 1_000,
    }
}

#[test]
fn test_every_scenario_passes_on_small_params() {
    for scenario in Scenario::ALL {
        let report = run(scenario, small(5)).unwrap();
        assert!(report.canon.idempotent, "{scenario}: canon idempotent");
        assert!(report.canon.stable, "{scenario}: canon stable");
        assert!(report.invariant_ok, "{scenario}: invariants {:?}", report.details);
        assert!(report.checks_run > 0, "{scenario}: no checks ran");
        assert_eq!(report.codec, "wirepack_v1");
    }
}

#[test]
fn test_fenwick_checkpoint_count_follows_stride() {
    let p = small(6);
    let report = run(Scenario::Fenwick, p).unwrap();
    let checkpoints = (0..p.k_updates).filter(|&s| p.is_checkpoint(s)).count();
    // Two query checks follow the checkpoints.
    assert_eq!(report.checks_run, checkpoints + 2);
    assert_eq!(report.details["prefix_queries_ok"], "true");
    assert_eq!(report.details["range_queries_ok"], "true");
}

#[test]
fn test_merkle_incremental_work_is_logarithmic() {
    let report = run(Scenario::Merkle, small(7)).unwrap();
    let incremental: u64 = report.details["incremental_hash_ops"].parse().unwrap();
    // 40 updates x at most 4 edits x depth 6.
    assert!(incremental <= 40 * 4 * 6);
    assert_eq!(report.details["build_hash_ops"], "63");
    assert_eq!(report.final_state_hash, report.details["root"]);
}

#[test]
fn test_merkle_rejects_non_power_of_two() {
    let p = ScenarioParams { n: 48, ..small(8) };
    let err = run(Scenario::Merkle, p).unwrap_err();
    assert!(matches!(err, WirePackError::InvalidLength { len: 48, .. }));
}

#[test]
fn test_merge_reports_order_independence() {
    let report = run(Scenario::Merge, small(9)).unwrap();
    assert_eq!(report.details["merge_order_ok"], "true");
    assert_eq!(report.details["replica_join_ok"], "true");
    assert_eq!(report.details["shuffled_order"].split(',').count(), 3);
    assert_eq!(report.sizes.raw_template_bytes, 1 + 64 * 4);
}

#[test]
fn test_receipts_detect_every_tamper() {
    let report = run(Scenario::Receipts, small(10)).unwrap();
    for key in [
        "verify_ok",
        "tamper_delta_detected",
        "tamper_parent_detected",
        "tamper_reorder_detected",
        "tamper_splice_detected",
        "tamper_truncate_detected",
    ] {
        assert_eq!(report.details[key], "true", "{key}");
    }
    assert_eq!(report.details["receipts"], "40");
}

#[test]
fn test_zero_writers_rejected() {
    let p = ScenarioParams { writers: 0, ..small(11) };
    assert!(run(Scenario::Merge, p).is_err());
}

#[test]
fn test_join_scenario_tracks_both_streams() {
    let report = run(Scenario::Join, small(12)).unwrap();
    assert!(report.ok(), "{:?}", report.details);
    assert_eq!(report.details["groups"], "64");
    assert_eq!(report.details["a_above"], "500");
    assert_eq!(report.details["b_below"], "500");
    assert!(report.details["qualifying_rows"].parse::<usize>().unwrap() > 0);
    // Two templates of 64 values each.
    assert_eq!(report.sizes.raw_template_bytes, 2 * (1 + 64 * 4));
}

#[test]
fn test_replay_collapses_repeated_writes() {
    let p = ScenarioParams { k_updates: 200, checks: 20, ..small(13) };
    let report = run(Scenario::Replay, p).unwrap();
    assert!(report.ok(), "{:?}", report.details);
    assert_eq!(report.details["raw_ops"], "800");
    assert!(report.details["collapsed_writes"].parse::<usize>().unwrap() > 0);
    let hot: usize = report.details["hot_writes"].parse().unwrap();
    assert!(hot > 400, "{hot} of 800 writes hit the hot set");
}
