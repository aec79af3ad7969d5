//! Sparse index: every Nth key of a table with its byte offset in the data file.
//!
//! Only a sample of keys is kept, so a lookup lands on the closest sampled key
//! at or before the target and scans forward from its offset. Because the data
//! file is sorted, the target (if present) starts somewhere between that offset
//! and the next sampled one.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use crate::error::{Result, SSTableError};

/// One sampled key and where its record starts in the data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseIndexEntry {
    pub key: Vec<u8>,
    pub offset: u32,
}

impl SparseIndexEntry {
    #[must_use]
    pub fn key_size(&self) -> u32 {
        self.key.len() as u32
    }
}

/// Ordered sparse index, held fully in memory for the life of a table.
///
/// Invariants: entries are strictly ascending by key, the first entry has
/// offset 0, offsets are strictly increasing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseIndex {
    entries: Vec<SparseIndexEntry>,
}

impl SparseIndex {
    /// Builds an index from entries, checking the ordering invariants.
    pub fn from_entries(entries: Vec<SparseIndexEntry>) -> Result<Self> {
        if let Some(first) = entries.first() {
            if first.offset != 0 {
                return Err(SSTableError::CorruptIndex(format!(
                    "first entry starts at offset {}, expected 0",
                    first.offset
                )));
            }
        }
        for (i, pair) in entries.windows(2).enumerate() {
            if pair[0].key >= pair[1].key || pair[0].offset >= pair[1].offset {
                return Err(SSTableError::CorruptIndex(format!(
                    "entries {} and {} are out of order",
                    i,
                    i + 1
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Appends an entry during a build. The caller feeds keys in sorted order.
    pub(crate) fn push(&mut self, key: Vec<u8>, offset: u32) {
        debug_assert!(self.entries.last().map_or(true, |e| e.key < key));
        self.entries.push(SparseIndexEntry { key, offset });
    }

    /// Index of the entry whose region may hold `target`.
    ///
    /// An exact match returns that entry; otherwise the predecessor, the
    /// largest key below `target`. `None` when `target` sorts before every
    /// sampled key, i.e. it cannot be in the table at all.
    #[must_use]
    pub fn candidate(&self, target: &[u8]) -> Option<usize> {
        match self
            .entries
            .binary_search_by(|e| e.key.as_slice().cmp(target))
        {
            Ok(i) => Some(i),
            Err(0) => None,
            Err(i) => Some(i - 1),
        }
    }

    /// Byte offset where a scan for `target` should begin.
    #[must_use]
    pub fn candidate_offset(&self, target: &[u8]) -> Option<u32> {
        self.candidate(target).map(|i| self.entries[i].offset)
    }

    #[must_use]
    pub fn get(&self, i: usize) -> Option<&SparseIndexEntry> {
        self.entries.get(i)
    }

    #[must_use]
    pub fn entries(&self) -> &[SparseIndexEntry] {
        &self.entries
    }

    #[must_use]
    pub fn first(&self) -> Option<&SparseIndexEntry> {
        self.entries.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&SparseIndexEntry> {
        self.entries.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size of the persisted form in bytes.
    #[must_use]
    pub fn serialized_size(&self) -> usize {
        self.entries.iter().map(|e| 4 + e.key.len() + 4).sum()
    }

    /// Writes `(key_size: u32, key, offset: u32)` for every entry, in order.
    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        for e in &self.entries {
            w.write_u32::<LittleEndian>(e.key_size())?;
            w.write_all(&e.key)?;
            w.write_u32::<LittleEndian>(e.offset)?;
        }
        Ok(())
    }

    /// Reads every entry until end of input and validates the result.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mut raw = Vec::new();
        r.read_to_end(&mut raw)?;

        let mut rest = raw.as_slice();
        let mut entries = Vec::new();
        while !rest.is_empty() {
            let truncated = || SSTableError::CorruptIndex(format!("truncated entry {}", entries.len()));

            let key_size = rest
                .read_u32::<LittleEndian>()
                .map_err(|_| truncated())? as usize;
            if rest.len() < key_size {
                return Err(truncated());
            }
            let (key, tail) = rest.split_at(key_size);
            rest = tail;
            let offset = rest.read_u32::<LittleEndian>().map_err(|_| truncated())?;

            entries.push(SparseIndexEntry {
                key: key.to_vec(),
                offset,
            });
        }

        Self::from_entries(entries)
    }
}
