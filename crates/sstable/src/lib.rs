//! # SSTable - Sorted String Table
//!
//! Immutable, on-disk tables of sorted key/value records.
//!
//! A table is built once from a batch the caller has already sorted and is
//! never modified afterwards. It lives in three sibling files named after a
//! table id handed out by a [`TableIdAllocator`]:
//!
//! ```text
//! ┌──────────────┬──────────────────────────────────────────────────────┐
//! │ sst_N.data   │ every record, ascending key order                     │
//! │              │ checksum u32 | tombstone u8 | timestamp u32           │
//! │              │ key_size u32 | value_size u32 | key | value           │
//! ├──────────────┼──────────────────────────────────────────────────────┤
//! │ sst_N.index  │ every 1000th record (configurable)                    │
//! │              │ key_size u32 | key | byte_offset u32                  │
//! ├──────────────┼──────────────────────────────────────────────────────┤
//! │ sst_N.bloom  │ num_bits u64 | num_hashes u32 | bits_len u32 | bits   │
//! └──────────────┴──────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian.
//!
//! ## Read path
//!
//! ```text
//! key ─▶ min/max check ─▶ bloom filter ─▶ sparse index ─▶ seek ─▶ scan ─▶ Found / NotFound
//!             │                 │
//!             └── OutOfRange ◀──┘   (no I/O)
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use config::TableConfig;
//! use record::Record;
//! use sstable::{Lookup, SSTable, TableIdAllocator};
//!
//! let ids = TableIdAllocator::new();
//! let records = vec![Record::new("a", "1"), Record::new("b", "2")];
//! let table = SSTable::build("data/sst", &ids, &records, &TableConfig::default()).unwrap();
//!
//! assert_eq!(table.get(b"b").unwrap().value(), Some(b"2".as_slice()));
//! assert_eq!(table.get(b"z").unwrap(), Lookup::OutOfRange);
//! ```

mod error;
mod files;
mod format;
mod id;
mod index;
mod reader;
mod scan;
mod stats;
mod table;
mod writer;

pub use error::{Result, SSTableError};
pub use format::{
    base_name, parse_table_id, TablePaths, BLOOM_EXTENSION, DATA_EXTENSION, FILE_PREFIX,
    INDEX_EXTENSION,
};
pub use id::TableIdAllocator;
pub use index::{SparseIndex, SparseIndexEntry};
pub use reader::TableIter;
pub use stats::ReadStatsSnapshot;
pub use table::{Lookup, SSTable};

#[cfg(test)]
mod tests;
