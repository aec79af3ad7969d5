use bloom::{BloomFilter, MAX_BLOOM_BYTES};
use config::TableConfig;
use record::Record;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{Result, SSTableError};
use crate::files::TableFiles;
use crate::id::TableIdAllocator;
use crate::index::SparseIndex;
use crate::scan::Scanner;
use crate::stats::ReadStats;
use crate::table::SSTable;

/// Everything a single pass over the batch produces.
pub(crate) struct Encoded {
    data: Vec<u8>,
    index: SparseIndex,
    bloom: BloomFilter,
}

impl SSTable {
    /// Persists a sorted batch as a new table in `dir`.
    ///
    /// One id is taken from `ids`; the table's files are `sst_<id>.data`,
    /// `sst_<id>.index` and `sst_<id>.bloom`. `dir` is created if missing.
    ///
    /// # Layout
    ///
    /// ```text
    /// data   record*                                  (see the `record` crate)
    /// index  (key_size: u32, key, byte_offset: u32)*  every Nth record, N = sparse_index_interval
    /// bloom  num_bits: u64 | num_hashes: u32 | bits_len: u32 | bits
    /// ```
    ///
    /// # Errors
    ///
    /// Rejected before an id is taken or any file is touched:
    ///
    /// - [`SSTableError::EmptyBatch`] / [`SSTableError::Unsorted`] when the
    ///   batch is empty or not strictly ascending.
    /// - [`SSTableError::TableTooLarge`] when the data would pass `u32::MAX` bytes.
    /// - [`SSTableError::BloomTooLarge`] when the bloom filter would pass
    ///   [`bloom::MAX_BLOOM_BYTES`] and could never be reopened.
    /// - [`SSTableError::Io`] with `InvalidInput` when a record's header
    ///   disagrees with its key or value length.
    ///
    /// After that, [`SSTableError::IdsExhausted`] if no id is left and
    /// [`SSTableError::Io`] on any file failure.
    ///
    /// On every failure after the files are created, all three are closed and
    /// removed before the error is returned. There is no retry.
    pub fn build<P: AsRef<Path>>(
        dir: P,
        ids: &TableIdAllocator,
        records: &[Record],
        config: &TableConfig,
    ) -> Result<Self> {
        config.validate()?;
        check_batch(records, config)?;
        let encoded = encode(records, config)?;

        let dir = dir.as_ref();
        let id = ids.next_id()?;
        fs::create_dir_all(dir)?;

        let files = write_or_discard(TableFiles::create(dir, id)?, &encoded, config)?;
        Self::assemble(id, files, records, encoded)
    }

    fn assemble(id: u32, files: TableFiles, records: &[Record], encoded: Encoded) -> Result<Self> {
        let Encoded { data, index, bloom } = encoded;

        let reader = match files.data.try_clone() {
            Ok(handle) => handle,
            Err(e) => {
                files.discard();
                return Err(e.into());
            }
        };

        // check_batch guarantees at least one record.
        let min_key = records[0].key().to_vec();
        let max_key = records[records.len() - 1].key().to_vec();
        let size_bytes = data.len() as u64;

        debug!(
            id,
            records = records.len(),
            size_bytes,
            sparse_entries = index.len(),
            bloom_bits = bloom.num_bits(),
            "built sstable"
        );

        Ok(Self {
            id,
            files,
            scanner: Mutex::new(Scanner::new(BufReader::new(reader), size_bytes)),
            min_key,
            max_key,
            size_bytes,
            record_count: records.len(),
            index,
            bloom,
            stats: ReadStats::default(),
        })
    }
}

/// Everything that can be known about a batch before touching the disk.
fn check_batch(records: &[Record], config: &TableConfig) -> Result<()> {
    if records.is_empty() {
        return Err(SSTableError::EmptyBatch);
    }
    if let Some(i) = records.windows(2).position(|w| w[0].key() >= w[1].key()) {
        return Err(SSTableError::Unsorted { position: i + 1 });
    }
    let data_bytes = records.iter().map(|r| r.record_size() as u64).sum();
    check_sizes(records.len(), data_bytes, config)
}

/// Both limits come from the read side: u32 index offsets and the largest
/// bloom filter [`BloomFilter::read_from`] accepts.
pub(crate) fn check_sizes(record_count: usize, data_bytes: u64, config: &TableConfig) -> Result<()> {
    if data_bytes > u64::from(u32::MAX) {
        return Err(SSTableError::TableTooLarge(data_bytes));
    }
    let bloom_bytes = BloomFilter::serialized_size_for(record_count, config.bloom_false_positive_rate);
    if bloom_bytes > MAX_BLOOM_BYTES {
        return Err(SSTableError::BloomTooLarge {
            bytes: bloom_bytes,
            limit: MAX_BLOOM_BYTES,
        });
    }
    Ok(())
}

/// Writes the encoded batch, removing all three files if any write fails.
pub(crate) fn write_or_discard(
    mut files: TableFiles,
    encoded: &Encoded,
    config: &TableConfig,
) -> Result<TableFiles> {
    match write_files(&mut files, encoded, config) {
        Ok(()) => Ok(files),
        Err(e) => {
            warn!(data = %files.paths().data.display(), error = %e, "sstable write failed, discarding files");
            files.discard();
            Err(e)
        }
    }
}

fn write_files(files: &mut TableFiles, encoded: &Encoded, config: &TableConfig) -> Result<()> {
    files.data.write_all(&encoded.data)?;

    let mut index_out = BufWriter::new(&files.index);
    encoded.index.write_to(&mut index_out)?;
    index_out.flush()?;
    drop(index_out);

    let mut bloom_out = BufWriter::new(&files.bloom);
    encoded.bloom.write_to(&mut bloom_out)?;
    bloom_out.flush()?;
    drop(bloom_out);

    if config.sync_on_build {
        files.sync_all()?;
    }
    Ok(())
}

/// Encodes the batch in one pass. Sizes were checked by `check_batch`, so
/// offsets fit in u32.
pub(crate) fn encode(records: &[Record], config: &TableConfig) -> Result<Encoded> {
    let total: usize = records.iter().map(Record::record_size).sum();
    let mut data = Vec::with_capacity(total);
    let mut index = SparseIndex::default();
    let mut bloom = BloomFilter::new(records.len(), config.bloom_false_positive_rate);

    for (i, rec) in records.iter().enumerate() {
        if i % config.sparse_index_interval == 0 {
            index.push(rec.key().to_vec(), data.len() as u32);
        }
        bloom.add(rec.key());
        rec.write_to(&mut data)?;
    }

    Ok(Encoded { data, index, bloom })
}
