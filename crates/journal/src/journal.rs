// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Append-only receipt journal.
//!
//! ```text
//! header := "WPRJ" || version u32 || reserved u64
//! entry  := seq u64 || payload_len u32 || crc64 u64 || payload
//! ```
//! All integers are little-endian. `payload` is the bincode (standard config)
//! encoding of one [`Receipt`]; the checksum covers `seq || payload_len || payload`.
//! Entries are numbered from zero with no gaps.

use crate::error::{JournalError, Result};
use crc64fast::Digest;
use memmap2::Mmap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use wirepack::hash::Hash32;
use wirepack::receipt::{Receipt, ReceiptChain};

pub const MAGIC: [u8; 4] = *b"WPRJ";
pub const VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalHeader {
    pub version: u32,
    pub reserved: u64,
}

impl JournalHeader {
    pub const SIZE: usize = 4 + 4 + 8;

    pub fn current() -> Self {
        Self { version: VERSION, reserved: 0 }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..16].copy_from_slice(&self.reserved.to_le_bytes());
        buf
    }

    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(JournalError::Truncated { offset: buf.len() });
        }
        if buf[0..4] != MAGIC {
            return Err(JournalError::InvalidMagic);
        }
        let version = le_u32(buf, 4);
        if version != VERSION {
            return Err(JournalError::UnsupportedVersion(version));
        }
        Ok(Self { version, reserved: le_u64(buf, 8) })
    }
}

/// Fixed part of every entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EntryHeader {
    seq: u64,
    payload_len: u32,
    checksum: u64,
}

impl EntryHeader {
    const SIZE: usize = 8 + 4 + 8;

    fn to_bytes(self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..8].copy_from_slice(&self.seq.to_le_bytes());
        buf[8..12].copy_from_slice(&self.payload_len.to_le_bytes());
        buf[12..20].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    fn parse(buf: &[u8], at: usize) -> Self {
        Self {
            seq: le_u64(buf, at),
            payload_len: le_u32(buf, at + 8),
            checksum: le_u64(buf, at + 12),
        }
    }
}

// Callers check bounds first.
fn le_u32(buf: &[u8], at: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(b)
}

fn le_u64(buf: &[u8], at: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(b)
}

fn checksum(seq: u64, payload: &[u8]) -> u64 {
    let mut digest = Digest::new();
    digest.write(&seq.to_le_bytes());
    digest.write(&(payload.len() as u32).to_le_bytes());
    digest.write(payload);
    digest.sum64()
}

fn encode_receipt(receipt: &Receipt) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(receipt, bincode::config::standard())
        .map_err(|e| JournalError::Serialization(e.to_string()))
}

fn decode_receipt(payload: &[u8]) -> Result<Receipt> {
    let (receipt, used) = bincode::serde::decode_from_slice(payload, bincode::config::standard())
        .map_err(|e| JournalError::Serialization(e.to_string()))?;
    if used != payload.len() {
        return Err(JournalError::Serialization(format!(
            "receipt payload has {} trailing bytes",
            payload.len() - used
        )));
    }
    Ok(receipt)
}

/// Parses every entry of a mapped journal.
fn scan(buf: &[u8]) -> Result<Vec<Receipt>> {
    JournalHeader::parse(buf)?;
    let mut offset = JournalHeader::SIZE;
    let mut receipts = Vec::new();

    while offset < buf.len() {
        if buf.len() - offset < EntryHeader::SIZE {
            return Err(JournalError::Truncated { offset });
        }
        let header = EntryHeader::parse(buf, offset);
        let expected_seq = receipts.len() as u64;
        if header.seq != expected_seq {
            return Err(JournalError::SequenceGap { expected: expected_seq, found: header.seq });
        }

        let start = offset + EntryHeader::SIZE;
        let len = header.payload_len as usize;
        if buf.len() - start < len {
            return Err(JournalError::Truncated { offset });
        }
        let payload = &buf[start..start + len];

        let found = checksum(header.seq, payload);
        if found != header.checksum {
            return Err(JournalError::ChecksumMismatch {
                seq: header.seq,
                expected: header.checksum,
                found,
            });
        }

        receipts.push(decode_receipt(payload)?);
        offset = start + len;
    }
    Ok(receipts)
}

/// Reads every receipt in the journal at `path`, checking each entry's checksum.
pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<Receipt>> {
    let file = File::open(path.as_ref())?;
    if file.metadata()?.len() == 0 {
        return Err(JournalError::Truncated { offset: 0 });
    }
    // SAFETY: the map is read-only and dropped before return. A concurrent
    // writer can only append, and bytes past the mapped length are not read.
    let mmap = unsafe { Mmap::map(&file)? };
    let receipts = scan(&mmap)?;
    debug!(path = %path.as_ref().display(), receipts = receipts.len(), "journal scanned");
    Ok(receipts)
}

/// Reads the journal and verifies the receipts as one chain.
pub fn load_chain(path: impl AsRef<Path>) -> Result<ReceiptChain> {
    let receipts = read_all(path)?;
    Ok(ReceiptChain::from_receipts(receipts)?)
}

/// Writer side of a journal file.
#[derive(Debug)]
pub struct ReceiptJournal {
    file: File,
    path: PathBuf,
    next_seq: u64,
    /// `receipt_hash` of the last entry, `None` while empty.
    last_hash: Option<Hash32>,
}

impl ReceiptJournal {
    /// Opens `path`, creating it with a fresh header when missing or empty.
    ///
    /// An existing journal is scanned in full so appends continue its sequence.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let (next_seq, last_hash) = if file.metadata()?.len() == 0 {
            file.write_all(&JournalHeader::current().to_bytes())?;
            file.sync_data()?;
            (0, None)
        } else {
            let mut head = [0u8; JournalHeader::SIZE];
            file.read_exact(&mut head)
                .map_err(|_| JournalError::Truncated { offset: 0 })?;
            JournalHeader::parse(&head)?;
            let existing = read_all(&path)?;
            (existing.len() as u64, existing.last().map(|r| r.receipt_hash))
        };

        info!(path = %path.display(), entries = next_seq, "receipt journal opened");
        Ok(Self { file, path, next_seq, last_hash })
    }

    /// Appends one receipt and syncs it. Returns its sequence number.
    pub fn append(&mut self, receipt: &Receipt) -> Result<u64> {
        let payload = encode_receipt(receipt)?;
        let payload_len = u32::try_from(payload.len())
            .map_err(|_| JournalError::Serialization(format!("receipt payload of {} bytes", payload.len())))?;

        let seq = self.next_seq;
        let header = EntryHeader {
            seq,
            payload_len,
            checksum: checksum(seq, &payload),
        };
        self.file.write_all(&header.to_bytes())?;
        self.file.write_all(&payload)?;
        self.file.sync_data()?;

        self.next_seq += 1;
        self.last_hash = Some(receipt.receipt_hash);
        Ok(seq)
    }

    /// Appends every receipt of `chain` not yet in the journal.
    ///
    /// The journal must hold a prefix of `chain`: its last entry has to be the
    /// chain receipt at the same position. Otherwise nothing is written.
    pub fn sync_chain(&mut self, chain: &ReceiptChain) -> Result<usize> {
        let start = self.next_seq as usize;
        if let Some(last) = self.last_hash {
            let seq = self.next_seq - 1;
            match chain.receipts().get(start - 1) {
                Some(r) if r.receipt_hash == last => {}
                _ => {
                    warn!(path = %self.path.display(), seq, chain_len = chain.len(), "journal diverges from chain");
                    return Err(JournalError::ChainDiverged { seq });
                }
            }
        }
        let pending = chain.receipts().get(start..).unwrap_or_default();
        for receipt in pending {
            self.append(receipt)?;
        }
        Ok(pending.len())
    }

    pub fn len(&self) -> u64 {
        self.next_seq
    }

    pub fn is_empty(&self) -> bool {
        self.next_seq == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
