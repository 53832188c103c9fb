// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod correlation;
pub mod join;

pub use correlation::{recompute, CorrelationAggregator, PearsonComponents};
pub use join::{snapshot_group_sums, GroupedJoinSum, JoinQuery};
