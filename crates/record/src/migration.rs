//! Message types exchanged when one store node migrates keys to another.
//!
//! Only the payload codec lives here. Transport, retries and partial-failure
//! aggregation belong to the migration service.
//!
//! ```text
//! request:  count(u32) | record*count
//! response: success(u8) | count(u32) | { key_len(u32) key success(u8) msg_len(u32) msg }*count
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Write};

use crate::{Record, RecordError};

/// A batch of records to copy to the receiving node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MigrationRequest {
    pub records: Vec<Record>,
}

/// Outcome for a single migrated key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyResult {
    pub key: Vec<u8>,
    pub success: bool,
    /// Human-readable detail, empty on success.
    pub message: String,
}

/// Per-key results plus the overall verdict.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MigrationResponse {
    pub results: Vec<KeyResult>,
    pub success: bool,
}

impl MigrationRequest {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn encode(&self) -> io::Result<Vec<u8>> {
        let body: usize = self.records.iter().map(Record::record_size).sum();
        let mut buf = Vec::with_capacity(4 + body);
        buf.write_u32::<LittleEndian>(len_field(self.records.len())?)?;
        for rec in &self.records {
            rec.write_to(&mut buf)?;
        }
        Ok(buf)
    }

    pub fn decode(buf: &[u8]) -> Result<Self, RecordError> {
        let mut cur = Cursor::new(buf);
        let count = cur.u32()?;
        let mut records = Vec::new();
        for _ in 0..count {
            let (rec, used) = Record::decode_prefix(cur.rest())?;
            cur.advance(used);
            records.push(rec);
        }
        Ok(Self { records })
    }
}

impl MigrationResponse {
    /// Builds a response whose overall verdict is the conjunction of every key.
    pub fn from_results(results: Vec<KeyResult>) -> Self {
        let success = results.iter().all(|r| r.success);
        Self { results, success }
    }

    /// Keys whose migration failed.
    pub fn failed_keys(&self) -> impl Iterator<Item = &[u8]> {
        self.results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.key.as_slice())
    }

    pub fn encode(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.write_u8(u8::from(self.success))?;
        buf.write_u32::<LittleEndian>(len_field(self.results.len())?)?;
        for r in &self.results {
            buf.write_u32::<LittleEndian>(len_field(r.key.len())?)?;
            buf.write_all(&r.key)?;
            buf.write_u8(u8::from(r.success))?;
            buf.write_u32::<LittleEndian>(len_field(r.message.len())?)?;
            buf.write_all(r.message.as_bytes())?;
        }
        Ok(buf)
    }

    pub fn decode(buf: &[u8]) -> Result<Self, RecordError> {
        let mut cur = Cursor::new(buf);
        let success = cur.u8()? != 0;
        let count = cur.u32()?;
        let mut results = Vec::new();
        for _ in 0..count {
            let key_len = cur.u32()? as usize;
            let key = cur.bytes(key_len)?.to_vec();
            let ok = cur.u8()? != 0;
            let msg_len = cur.u32()? as usize;
            let message = std::str::from_utf8(cur.bytes(msg_len)?)
                .map_err(|_| RecordError::InvalidUtf8)?
                .to_string();
            results.push(KeyResult {
                key,
                success: ok,
                message,
            });
        }
        Ok(Self { results, success })
    }
}

/// Bounds-checked reader over a byte slice; shortfalls become `Malformed`.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8], RecordError> {
        let available = self.buf.len() - self.pos;
        if available < n {
            return Err(truncated(n, available));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, RecordError> {
        let mut b = self.bytes(1)?;
        b.read_u8().map_err(|_| truncated(1, 0))
    }

    fn u32(&mut self) -> Result<u32, RecordError> {
        let mut b = self.bytes(4)?;
        b.read_u32::<LittleEndian>().map_err(|_| truncated(4, 0))
    }
}

/// A count or length as its u32 wire field.
fn len_field(len: usize) -> io::Result<u32> {
    u32::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} does not fit a u32 length field", len),
        )
    })
}

fn truncated(needed: usize, available: usize) -> RecordError {
    RecordError::Malformed { needed, available }
}
