// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod merkle;

pub use merkle::{merkle_rebuild, CommitmentTree};
