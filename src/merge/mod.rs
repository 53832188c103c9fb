// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod lww;

pub use lww::{merge_logs, Cell, MergeStore, Timestamp, WriterLog};
