// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Per-consumer scenario drivers.

use super::{Outcome, Run};
use crate::codec::{decode_delta, encode_delta_stream, encode_template, Template};
use crate::commit::CommitmentTree;
use crate::error::{Result, WirePackError};
use crate::hash::{hash_bytes, hash_concat, state_hash, to_hex};
use crate::index::SumIndex;
use crate::merge::{merge_logs, MergeStore, Timestamp, WriterLog};
use crate::receipt::{verify_chain, GatedSum};
use crate::stats::{CorrelationAggregator, GroupedJoinSum, JoinQuery};
use crate::workload::{SkewProfile, Workload};
use tracing::debug;

/// Group count of the join scenario.
pub(super) const JOIN_GROUPS: usize = 64;

/// Two distinct-or-equal random indices as an ordered range.
fn random_range(w: &mut Workload) -> (usize, usize) {
    let (a, b) = (w.index(), w.index());
    (a.min(b), a.max(b))
}

fn mismatch(structure: &'static str, detail: String) -> WirePackError {
    WirePackError::InvariantViolation { structure, detail }
}

pub(super) fn fenwick(run: &mut Run) -> Result<Outcome> {
    let p = run.params;
    let mut w = Workload::new(p.seed, p.n, p.value_max);
    let base = w.values();
    let template = encode_template(&base);
    let mut index = SumIndex::from_values(&base)?;
    let mut mirror = Template::new(base);

    let mut deltas = Vec::with_capacity(p.k_updates);
    for step in 0..p.k_updates {
        let ops = w.next_ops(p.m_edits);
        let canon = run.canon.batch(&mut w, &ops)?;
        mirror.apply_delta(&canon)?;
        index.apply_delta(&canon)?;
        deltas.push(canon);
        if p.is_checkpoint(step) && !run.checkpoint(step, index.verify_against(mirror.values()))? {
            break;
        }
    }

    let (mut prefix_ok, mut range_ok) = (true, true);
    for _ in 0..p.checks {
        let r = w.index();
        prefix_ok &= index.prefix_sum(r) == mirror.range_sum(0, r);
        let (l, r) = random_range(&mut w);
        range_ok &= index.range_sum(l, r) == mirror.range_sum(l, r);
    }
    run.expect("prefix_queries_ok", prefix_ok);
    run.expect("range_queries_ok", range_ok);
    run.detail("queries", 2 * p.checks);
    run.detail("total", index.total());

    Ok(Outcome {
        template,
        delta_stream: encode_delta_stream(&deltas),
        final_state: state_hash(mirror.values()),
    })
}

pub(super) fn merkle(run: &mut Run) -> Result<Outcome> {
    let p = run.params;
    let mut w = Workload::new(p.seed, p.n, p.value_max);
    let base = w.values();
    let template = encode_template(&base);
    let mut tree = CommitmentTree::from_values(&base)?;
    let build_ops = tree.hash_ops();
    let mut mirror = Template::new(base);

    let mut deltas = Vec::with_capacity(p.k_updates);
    for step in 0..p.k_updates {
        let ops = w.next_ops(p.m_edits);
        let canon = run.canon.batch(&mut w, &ops)?;
        mirror.apply_delta(&canon)?;
        tree.apply_delta(&canon)?;
        deltas.push(canon);
        if p.is_checkpoint(step) && !run.checkpoint(step, tree.verify_against(mirror.values()))? {
            break;
        }
    }

    let incremental = tree.hash_ops() - build_ops;
    run.detail("root", tree.root_hex());
    run.detail("depth", tree.depth());
    run.detail("build_hash_ops", build_ops);
    run.detail("incremental_hash_ops", incremental);
    run.detail("rebuild_hash_ops_equivalent", build_ops * deltas.len() as u64);
    debug!(incremental, build_ops, "merkle hash work");

    Ok(Outcome {
        template,
        delta_stream: encode_delta_stream(&deltas),
        final_state: tree.root(),
    })
}

pub(super) fn correlation(run: &mut Run) -> Result<Outcome> {
    let p = run.params;
    let mut w = Workload::new(p.seed, p.n, p.value_max);
    let (base_x, base_y) = (w.values(), w.values());
    let mut template = encode_template(&base_x);
    template.extend_from_slice(&encode_template(&base_y));
    let mut agg = CorrelationAggregator::new(base_x.clone(), base_y.clone())?;
    let (mut mx, mut my) = (Template::new(base_x), Template::new(base_y));

    // Interleaved: x delta then y delta for every update.
    let mut deltas = Vec::with_capacity(2 * p.k_updates);
    for step in 0..p.k_updates {
        let ops_x = w.next_ops(p.m_edits);
        let canon_x = run.canon.batch(&mut w, &ops_x)?;
        let ops_y = w.next_ops(p.m_edits);
        let canon_y = run.canon.batch(&mut w, &ops_y)?;

        mx.apply_delta(&canon_x)?;
        my.apply_delta(&canon_y)?;
        agg.apply_x_delta(&canon_x)?;
        agg.apply_y_delta(&canon_y)?;
        deltas.push(canon_x);
        deltas.push(canon_y);

        if p.is_checkpoint(step) && !run.checkpoint(step, agg.verify_against(mx.values(), my.values()))? {
            break;
        }
    }

    let c = agg.components();
    run.detail("numerator", c.numerator);
    run.detail("var_x", c.var_x);
    run.detail("var_y", c.var_y);
    if let Some(r) = c.coefficient() {
        run.detail("coefficient", format!("{r:.12}"));
    }

    let final_state = hash_concat(&[&state_hash(mx.values()), &state_hash(my.values())]);
    Ok(Outcome {
        template,
        delta_stream: encode_delta_stream(&deltas),
        final_state,
    })
}

pub(super) fn join(run: &mut Run) -> Result<Outcome> {
    let p = run.params;
    let mut w = Workload::new(p.seed, p.n, p.value_max);
    let (base_a, base_b) = (w.values(), w.values());
    let mut template = encode_template(&base_a);
    template.extend_from_slice(&encode_template(&base_b));

    // Thresholds at mid-range: a in the upper half, b in the lower half.
    let mid = p.value_max / 2;
    let query = JoinQuery::new(JOIN_GROUPS, mid, mid)?;
    let mut agg = GroupedJoinSum::new(query, base_a.clone(), base_b.clone())?;
    let (mut ma, mut mb) = (Template::new(base_a), Template::new(base_b));

    let mut deltas = Vec::with_capacity(2 * p.k_updates);
    for step in 0..p.k_updates {
        let ops_a = w.next_ops(p.m_edits);
        let canon_a = run.canon.batch(&mut w, &ops_a)?;
        let ops_b = w.next_ops(p.m_edits);
        let canon_b = run.canon.batch(&mut w, &ops_b)?;

        ma.apply_delta(&canon_a)?;
        mb.apply_delta(&canon_b)?;
        agg.apply_a_delta(&canon_a)?;
        agg.apply_b_delta(&canon_b)?;
        deltas.push(canon_a);
        deltas.push(canon_b);

        if p.is_checkpoint(step) && !run.checkpoint(step, agg.verify_against(ma.values(), mb.values()))? {
            break;
        }
    }

    let sums = agg.group_sums();
    let result_bytes: Vec<u8> = sums.iter().flat_map(|s| s.to_le_bytes()).collect();
    let result_hash = hash_bytes(&result_bytes);
    run.detail("groups", query.groups);
    run.detail("a_above", query.a_above);
    run.detail("b_below", query.b_below);
    let qualifying = agg
        .a()
        .iter()
        .zip(agg.b())
        .filter(|&(&a, &b)| query.contribution(a, b) > 0)
        .count();
    run.detail("qualifying_rows", qualifying);
    run.detail("result", to_hex(&result_hash));

    let final_state = hash_concat(&[&state_hash(ma.values()), &state_hash(mb.values()), &result_hash]);
    Ok(Outcome {
        template,
        delta_stream: encode_delta_stream(&deltas),
        final_state,
    })
}

/// Replays a skewed, bursty stream whose batches write some indices twice.
///
/// The sum index follows canonical deltas while the mirror applies every raw
/// batch in submission order, so each checkpoint also checks that the
/// canonical form keeps the last write.
pub(super) fn replay(run: &mut Run) -> Result<Outcome> {
    let p = run.params;
    let profile = SkewProfile::TELEMETRY;
    let base = Workload::new(p.seed ^ 0xA5A5, p.n, p.value_max).values();
    let template = encode_template(&base);
    let mut w = Workload::new(p.seed, p.n, p.value_max);
    let mut index = SumIndex::from_values(&base)?;
    let mut mirror = Template::new(base);

    let hot = profile.hot_len(p.n) as u64;
    let (mut raw_ops, mut collapsed, mut hot_writes) = (0usize, 0usize, 0usize);
    let mut deltas = Vec::with_capacity(p.k_updates);
    for step in 0..p.k_updates {
        let ops = w.next_skewed_ops(p.m_edits, &profile);
        let canon = run.canon.batch(&mut w, &ops)?;
        mirror.apply_ops(&ops)?;
        index.apply_delta(&canon)?;
        raw_ops += ops.len();
        hot_writes += ops.iter().filter(|op| op.index < hot).count();
        collapsed += ops.len() - decode_delta(&canon)?.len();
        deltas.push(canon);
        if p.is_checkpoint(step) && !run.checkpoint(step, index.verify_against(mirror.values()))? {
            break;
        }
    }

    run.detail("hot_fraction", profile.hot_fraction);
    run.detail("hot_prob", profile.hot_prob);
    run.detail("burst_prob", profile.burst_prob);
    run.detail("raw_ops", raw_ops);
    run.detail("hot_writes", hot_writes);
    run.detail("collapsed_writes", collapsed);
    run.detail("total", index.total());

    Ok(Outcome {
        template,
        delta_stream: encode_delta_stream(&deltas),
        final_state: state_hash(mirror.values()),
    })
}

/// Last-writer-wins result computed by scanning every write.
fn merge_oracle(len: usize, logs: &[WriterLog]) -> Result<Vec<Option<(Timestamp, u32)>>> {
    let mut best: Vec<Option<(Timestamp, u32)>> = vec![None; len];
    for log in logs {
        for (ts, delta) in log.entries() {
            for op in decode_delta(delta)? {
                let slot = best
                    .get_mut(op.index as usize)
                    .ok_or(WirePackError::IndexOutOfRange { index: op.index, len })?;
                if slot.map_or(true, |cur| (ts, op.value) > cur) {
                    *slot = Some((ts, op.value));
                }
            }
        }
    }
    Ok(best)
}

pub(super) fn merge(run: &mut Run) -> Result<Outcome> {
    let p = run.params;
    let mut w = Workload::new(p.seed, p.n, p.value_max);
    let template = encode_template(&vec![0u32; p.n]);

    let mut logs = Vec::with_capacity(p.writers);
    for writer_id in 0..p.writers {
        let mut log = WriterLog::new(writer_id as u32);
        for _ in 0..p.k_updates {
            let ops = w.next_ops(p.m_edits);
            let canon = run.canon.batch(&mut w, &ops)?;
            log.push(canon);
        }
        logs.push(log);
    }

    let natural = merge_logs(p.n, &logs)?;

    let mut order: Vec<usize> = (0..p.writers).collect();
    Workload::new(p.seed.wrapping_add(99), p.n, p.value_max).shuffle(&mut order);
    let shuffled_logs: Vec<WriterLog> = order.iter().map(|&i| logs[i].clone()).collect();
    let shuffled = merge_logs(p.n, &shuffled_logs)?;
    run.expect("merge_order_ok", natural == shuffled);

    // State-based join of single-writer replicas, folded in reverse.
    let mut joined = MergeStore::new(p.n);
    for log in logs.iter().rev() {
        let mut replica = MergeStore::new(p.n);
        replica.apply_log(log)?;
        joined.merge(&replica)?;
    }
    run.expect("replica_join_ok", joined == natural);

    let oracle = merge_oracle(p.n, &logs)?;
    let first_diff = natural
        .entries()
        .into_iter()
        .map(|(i, cell)| (i, Some((cell.timestamp, cell.value))))
        .filter(|(i, got)| oracle[*i as usize] != *got)
        .map(|(i, _)| i)
        .next();
    let written = oracle.iter().filter(|c| c.is_some()).count();
    let check = match first_diff {
        Some(i) => Err(mismatch("MergeStore", format!("cell {i} disagrees with full scan"))),
        None if written != natural.len() => Err(mismatch(
            "MergeStore",
            format!("{} cells written, scan expects {written}", natural.len()),
        )),
        None => Ok(()),
    };
    run.checkpoint(p.k_updates.saturating_sub(1), check)?;

    run.detail("cells", natural.len());
    run.detail(
        "shuffled_order",
        order.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(","),
    );

    let mut delta_stream = Vec::new();
    for log in &logs {
        delta_stream.extend_from_slice(&encode_delta_stream(log.deltas()));
    }
    Ok(Outcome {
        template,
        delta_stream,
        final_state: natural.state_hash(),
    })
}

pub(super) fn receipts(run: &mut Run) -> Result<Outcome> {
    let p = run.params;
    let mut w = Workload::new(p.seed, p.n, p.value_max);
    let base = w.values();
    let template = encode_template(&base);
    let mut gated = GatedSum::from_values(&base)?;
    let mut mirror = Template::new(base);

    for step in 0..p.k_updates {
        let ops = w.next_ops(p.m_edits);
        let canon = run.canon.batch(&mut w, &ops)?;
        mirror.apply_delta(&canon)?;
        gated.commit(&canon)?;
        if p.is_checkpoint(step) {
            let (l, r) = random_range(&mut w);
            let expected = mirror.range_sum(l, r);
            let check = match gated.range_sum(l, r) {
                Ok(got) if got == expected => Ok(()),
                Ok(got) => Err(mismatch("GatedSum", format!("range [{l}, {r}] = {got}, mirror {expected}"))),
                Err(WirePackError::ChainBroken(fault)) => Err(mismatch("ReceiptChain", fault.to_string())),
                Err(err) => Err(err),
            };
            if !run.checkpoint(step, check)? {
                break;
            }
        }
    }

    let chain = gated.chain();
    run.expect("verify_ok", chain.verify().is_ok());

    let receipts = chain.receipts();
    if receipts.len() >= 3 {
        let mid = receipts.len() / 2;

        let mut t = receipts.to_vec();
        t[mid].delta[0] ^= 0x01;
        run.expect("tamper_delta_detected", !verify_chain(&t));

        let mut t = receipts.to_vec();
        t[receipts.len() / 3].parent_hash = [0x11; 32];
        run.expect("tamper_parent_detected", !verify_chain(&t));

        let mut t = receipts.to_vec();
        t.swap(mid, mid + 1);
        run.expect("tamper_reorder_detected", !verify_chain(&t));

        let mut t = receipts.to_vec();
        t.remove(mid);
        run.expect("tamper_splice_detected", !verify_chain(&t));

        let t = &receipts[..receipts.len() - 1];
        run.expect(
            "tamper_truncate_detected",
            chain.verify_anchored(t, &chain.head(), receipts.len()).is_err(),
        );
    } else {
        run.detail("tamper_skipped", receipts.len());
    }

    run.detail("receipts", receipts.len());
    run.detail("head", to_hex(&chain.head()));

    let deltas: Vec<&[u8]> = receipts.iter().map(|r| r.delta.as_slice()).collect();
    Ok(Outcome {
        template,
        delta_stream: encode_delta_stream(&deltas),
        final_state: state_hash(mirror.values()),
    })
}
