// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Durable, checksummed storage for receipt chains.

pub mod error;
pub mod journal;

pub use error::{JournalError, Result};
pub use journal::{load_chain, read_all, JournalHeader, ReceiptJournal};
