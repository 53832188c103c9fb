// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! wirepack: a deterministic template/delta wire format plus the structures
//! that follow a delta stream without re-materializing the full vector.

pub mod config;
pub mod error;
pub mod hash;
pub mod codec;
pub mod canonical;
pub mod index;
pub mod commit;
pub mod stats;
pub mod merge;
pub mod receipt;
pub mod workload;
pub mod harness;
pub mod proof;

pub use canonical::canonicalize;
pub use codec::{Delta, Op, Template};
pub use error::{CodecError, Result, WirePackError};

#[cfg(test)]
pub mod tests;
