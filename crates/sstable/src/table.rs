use bloom::BloomFilter;
use record::Record;
use std::fs::File;
use std::io::BufReader;
use std::sync::Mutex;

use crate::files::TableFiles;
use crate::format::TablePaths;
use crate::index::SparseIndex;
use crate::scan::Scanner;
use crate::stats::{ReadStats, ReadStatsSnapshot};

/// Result of a point lookup that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The key is stored here. The record may be a tombstone.
    Found(Record),
    /// The key is within `[min_key, max_key]` and passed the bloom filter,
    /// but the scanned region does not hold it.
    NotFound,
    /// The key is outside `[min_key, max_key]` or the bloom filter rejected
    /// it. No data was read.
    OutOfRange,
}

impl Lookup {
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    /// The record, if found.
    pub fn into_record(self) -> Option<Record> {
        match self {
            Lookup::Found(r) => Some(r),
            _ => None,
        }
    }

    /// The stored value of a live record. Tombstones and misses give `None`.
    #[must_use]
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            Lookup::Found(r) if !r.is_tombstone() => Some(r.value()),
            _ => None,
        }
    }
}

/// An immutable table of sorted records backed by three files.
///
/// Created once by [`SSTable::build`] or reopened with [`SSTable::open`],
/// then queried through [`SSTable::get`] from any number of threads. Lookups
/// share one data-file cursor behind a mutex; [`SSTable::iter`] opens its own.
pub struct SSTable {
    pub(crate) id: u32,
    pub(crate) files: TableFiles,
    pub(crate) scanner: Mutex<Scanner<BufReader<File>>>,
    pub(crate) min_key: Vec<u8>,
    pub(crate) max_key: Vec<u8>,
    /// Length of the data file in bytes.
    pub(crate) size_bytes: u64,
    pub(crate) record_count: usize,
    pub(crate) index: SparseIndex,
    pub(crate) bloom: BloomFilter,
    pub(crate) stats: ReadStats,
}

impl SSTable {
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[must_use]
    pub fn paths(&self) -> &TablePaths {
        self.files.paths()
    }

    #[must_use]
    pub fn min_key(&self) -> &[u8] {
        &self.min_key
    }

    #[must_use]
    pub fn max_key(&self) -> &[u8] {
        &self.max_key
    }

    /// Total encoded size of all records, i.e. the data file length.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Number of records in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.record_count
    }

    /// Always `false`: empty tables cannot be built or opened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    #[must_use]
    pub fn sparse_index(&self) -> &SparseIndex {
        &self.index
    }

    #[must_use]
    pub fn bloom(&self) -> &BloomFilter {
        &self.bloom
    }

    #[must_use]
    pub fn stats(&self) -> ReadStatsSnapshot {
        self.stats.snapshot()
    }

    /// `true` when `key` lies within `[min_key, max_key]`.
    #[must_use]
    pub fn covers(&self, key: &[u8]) -> bool {
        key >= self.min_key.as_slice() && key <= self.max_key.as_slice()
    }
}

impl std::fmt::Debug for SSTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SSTable")
            .field("id", &self.id)
            .field("data", &self.files.paths().data)
            .field("records", &self.record_count)
            .field("size_bytes", &self.size_bytes)
            .field("min_key", &String::from_utf8_lossy(&self.min_key))
            .field("max_key", &String::from_utf8_lossy(&self.max_key))
            .field("sparse_entries", &self.index.len())
            .field("bloom", &self.bloom)
            .finish()
    }
}
