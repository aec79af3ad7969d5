use bloom::BloomFilter;
use record::Record;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

use crate::error::{Result, SSTableError};
use crate::files::TableFiles;
use crate::index::SparseIndex;
use crate::scan::Scanner;
use crate::stats::ReadStats;
use crate::table::{Lookup, SSTable};

impl SSTable {
    /// Reopens table `id` from its three files in `dir`.
    ///
    /// The sparse index and bloom filter are loaded into memory. The data file
    /// is walked once to count records and find the largest key.
    ///
    /// # Errors
    ///
    /// [`SSTableError::Io`] if a file is missing, [`SSTableError::CorruptIndex`]
    /// if the index is empty, out of order, or disagrees with the data file,
    /// and [`SSTableError::Malformed`] if the data file ends mid-record.
    pub fn open<P: AsRef<Path>>(dir: P, id: u32) -> Result<Self> {
        let files = TableFiles::open(dir.as_ref(), id)?;

        let index = SparseIndex::read_from(&mut BufReader::new(&files.index))?;
        let bloom = BloomFilter::read_from(&mut BufReader::new(&files.bloom))?;
        let size_bytes = files.data.metadata()?.len();
        if size_bytes > u64::from(u32::MAX) {
            return Err(SSTableError::TableTooLarge(size_bytes));
        }

        let min_key = match index.first() {
            Some(first) => first.key.clone(),
            None => return Err(SSTableError::CorruptIndex("index has no entries".to_string())),
        };

        let mut iter = TableIter::new(BufReader::new(files.data.try_clone()?), size_bytes);
        let mut samples = index.entries().iter().peekable();
        let mut record_count = 0usize;
        let mut max_key: Option<Vec<u8>> = None;
        loop {
            let offset = iter.position();
            let Some(rec) = iter.next() else { break };
            let rec = rec?;
            if let Some(sample) = samples.next_if(|s| u64::from(s.offset) == offset) {
                if sample.key != rec.key() {
                    return Err(SSTableError::CorruptIndex(format!(
                        "entry at offset {} does not match the data file",
                        offset
                    )));
                }
            }
            record_count += 1;
            max_key = Some(rec.key().to_vec());
        }
        if samples.next().is_some() {
            return Err(SSTableError::CorruptIndex(
                "entry points outside the record boundaries".to_string(),
            ));
        }
        let max_key = max_key
            .ok_or_else(|| SSTableError::CorruptIndex("index present but data file is empty".to_string()))?;
        let scanner = iter.into_scanner();

        debug!(id, records = record_count, size_bytes, sparse_entries = index.len(), "opened sstable");

        Ok(Self {
            id,
            files,
            scanner: Mutex::new(scanner),
            min_key,
            max_key,
            size_bytes,
            record_count,
            index,
            bloom,
            stats: ReadStats::default(),
        })
    }

    /// Point lookup.
    ///
    /// 1. Keys outside `[min_key, max_key]` return [`Lookup::OutOfRange`].
    /// 2. Keys the bloom filter rejects return [`Lookup::OutOfRange`].
    /// 3. Otherwise the sparse index picks a starting offset and the data file
    ///    is scanned forward until the key is found, a larger key is seen, or
    ///    the data ends.
    ///
    /// Steps 1 and 2 perform no I/O. Checksums are not verified; call
    /// [`Record::checksum_matches`] on the result if needed.
    ///
    /// # Errors
    ///
    /// I/O failures and truncated records abort the lookup. Nothing is retried.
    pub fn get(&self, key: &[u8]) -> Result<Lookup> {
        self.stats.lookup();

        if !self.covers(key) {
            self.stats.range_rejection();
            return Ok(Lookup::OutOfRange);
        }
        if !self.bloom.might_contain(key) {
            debug!(id = self.id, "bloom filter rejected key");
            self.stats.bloom_rejection();
            return Ok(Lookup::OutOfRange);
        }

        // Unreachable after the range check (entry 0 is min_key), kept so a
        // key below every sample never indexes out of bounds.
        let Some(start) = self.index.candidate_offset(key) else {
            return Ok(Lookup::OutOfRange);
        };

        let mut scanner = self.scanner.lock().map_err(|_| SSTableError::LockPoisoned)?;
        match scanner.find(u64::from(start), key, &self.stats)? {
            Some(record) => Ok(Lookup::Found(record)),
            None => Ok(Lookup::NotFound),
        }
    }

    /// Iterates every record in key order through a fresh file handle.
    pub fn iter(&self) -> Result<TableIter<BufReader<File>>> {
        let file = File::open(&self.files.paths().data)?;
        Ok(TableIter::new(BufReader::new(file), self.size_bytes))
    }
}

/// Sequential reader over the records of a data file.
///
/// Yields `Err` at most once; iteration stops after the first error.
pub struct TableIter<R> {
    scanner: Scanner<R>,
    offset: u64,
    done: bool,
}

impl<R: std::io::Read + std::io::Seek> TableIter<R> {
    pub(crate) fn new(reader: R, len: u64) -> Self {
        Self {
            scanner: Scanner::new(reader, len),
            offset: 0,
            done: false,
        }
    }

    /// Byte offset of the next record to be yielded.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.offset
    }

    fn into_scanner(self) -> Scanner<R> {
        self.scanner
    }
}

impl<R: std::io::Read + std::io::Seek> Iterator for TableIter<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.scanner.read_at(self.offset) {
            Ok(Some(rec)) => {
                self.offset += rec.record_size() as u64;
                Some(Ok(rec))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
