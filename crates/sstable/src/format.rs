//! File naming for the three files of a table.
//!
//! A table with id `N` lives in three siblings sharing the base name `sst_N`:
//!
//! ```text
//! sst_N.data   concatenated encoded records, ascending key order
//! sst_N.index  (key_size: u32 LE, key, byte_offset: u32 LE)*, ascending
//! sst_N.bloom  num_bits: u64 LE | num_hashes: u32 LE | bits_len: u32 LE | packed bits
//! ```

use std::path::{Path, PathBuf};

pub const FILE_PREFIX: &str = "sst_";
pub const DATA_EXTENSION: &str = "data";
pub const INDEX_EXTENSION: &str = "index";
pub const BLOOM_EXTENSION: &str = "bloom";

/// Base name shared by the three files of table `id`.
#[must_use]
pub fn base_name(id: u32) -> String {
    format!("{}{}", FILE_PREFIX, id)
}

/// Extracts the table id from a file name such as `sst_12.index`.
///
/// Only the three known extensions are accepted.
#[must_use]
pub fn parse_table_id(file_name: &str) -> Option<u32> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if ![DATA_EXTENSION, INDEX_EXTENSION, BLOOM_EXTENSION].contains(&ext) {
        return None;
    }
    stem.strip_prefix(FILE_PREFIX)?.parse().ok()
}

/// Paths of the data, index and bloom files of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePaths {
    pub data: PathBuf,
    pub index: PathBuf,
    pub bloom: PathBuf,
}

impl TablePaths {
    pub fn new<P: AsRef<Path>>(dir: P, id: u32) -> Self {
        let base = dir.as_ref().join(base_name(id));
        Self {
            data: base.with_extension(DATA_EXTENSION),
            index: base.with_extension(INDEX_EXTENSION),
            bloom: base.with_extension(BLOOM_EXTENSION),
        }
    }

    /// The three paths in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        [&self.data, &self.index, &self.bloom]
            .into_iter()
            .map(PathBuf::as_path)
    }
}
