//! Forward scan over the data file.
//!
//! A lookup walks records from a candidate offset as a small state machine:
//!
//! ```text
//!            read ok                 key < target
//! Seeking ───────────▶ Comparing ───────────────────▶ Seeking(offset + size)
//!    │                    │ key == target ──▶ Found
//!    │ end of data        │ key >  target ──▶ NotFound
//!    ▼
//! NotFound
//! ```
//!
//! Any read or decode failure aborts the scan with an error. Offsets strictly
//! increase and are bounded by the data length, so the loop always ends.

use record::{Header, Record, RecordError, HEADER_SIZE};
use std::cmp::Ordering;
use std::io::{self, Read, Seek, SeekFrom};
use tracing::trace;

use crate::error::Result;
use crate::stats::ReadStats;

enum ScanState {
    Seeking(u64),
    Comparing { record: Record, offset: u64 },
    Found(Record),
    NotFound,
}

/// Positioned reader over `len` bytes of encoded records.
///
/// Remembers where the last read ended so consecutive records are read
/// without re-seeking (which would discard a `BufReader`'s buffer).
pub(crate) struct Scanner<R> {
    reader: R,
    len: u64,
    pos: Option<u64>,
    buf: Vec<u8>,
}

impl<R: Read + Seek> Scanner<R> {
    pub(crate) fn new(reader: R, len: u64) -> Self {
        Self {
            reader,
            len,
            pos: None,
            buf: Vec::with_capacity(256),
        }
    }

    /// Scans forward from `start` for `key`.
    pub(crate) fn find(
        &mut self,
        start: u64,
        key: &[u8],
        stats: &ReadStats,
    ) -> Result<Option<Record>> {
        let mut state = ScanState::Seeking(start);
        loop {
            state = match state {
                ScanState::Seeking(offset) => match self.read_at(offset)? {
                    Some(record) => {
                        stats.record_decoded(record.record_size());
                        ScanState::Comparing { record, offset }
                    }
                    None => ScanState::NotFound,
                },
                ScanState::Comparing { record, offset } => match record.key().cmp(key) {
                    Ordering::Equal => ScanState::Found(record),
                    Ordering::Greater => {
                        trace!(offset, "scan passed target");
                        ScanState::NotFound
                    }
                    Ordering::Less => ScanState::Seeking(offset + record.record_size() as u64),
                },
                ScanState::Found(record) => return Ok(Some(record)),
                ScanState::NotFound => return Ok(None),
            };
        }
    }

    /// Reads the record starting at `offset`; `None` at the end of the data.
    ///
    /// # Errors
    ///
    /// [`RecordError::Malformed`] if fewer bytes remain than the header (or
    /// the header plus its declared key and value) needs.
    pub(crate) fn read_at(&mut self, offset: u64) -> Result<Option<Record>> {
        if offset >= self.len {
            return Ok(None);
        }
        let available = (self.len - offset) as usize;
        if available < HEADER_SIZE {
            return Err(malformed(HEADER_SIZE, available));
        }

        if self.pos != Some(offset) {
            self.reader.seek(SeekFrom::Start(offset))?;
        }
        self.pos = None;

        self.buf.clear();
        self.buf.resize(HEADER_SIZE, 0);
        read_full(&mut self.reader, &mut self.buf, HEADER_SIZE, available)?;

        let header = Header::decode(&self.buf)?;
        let size = header.record_size();
        if size > available {
            return Err(malformed(size, available));
        }

        self.buf.resize(size, 0);
        read_full(&mut self.reader, &mut self.buf[HEADER_SIZE..], size, available)?;

        let record = Record::decode(&self.buf)?;
        trace!(offset, size, "decoded record");
        self.pos = Some(offset + size as u64);
        Ok(Some(record))
    }
}

/// `read_exact` that reports a short read as a malformed record.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8], needed: usize, available: usize) -> Result<()> {
    match r.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(malformed(needed, available)),
        Err(e) => Err(e.into()),
    }
}

fn malformed(needed: usize, available: usize) -> crate::SSTableError {
    RecordError::Malformed { needed, available }.into()
}
