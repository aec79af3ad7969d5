//! # Record - key/value record codec
//!
//! The unit of storage shared by every SSTable file and by the migration
//! boundary between store nodes. A record is a fixed 17-byte header followed
//! by the raw key and value bytes.
//!
//! ## Binary layout
//!
//! ```text
//! ┌──────────────┬───────────────┬───────────────┬──────────────┬────────────────┬─────┬───────┐
//! │ checksum u32 │ tombstone u8  │ timestamp u32 │ key_size u32 │ value_size u32 │ key │ value │
//! └──────────────┴───────────────┴───────────────┴──────────────┴────────────────┴─────┴───────┘
//! ```
//!
//! All integers are little-endian. `tombstone` is `0` for a live record and
//! `1` for a deleted key. The checksum is a CRC32 over `key ‖ value`; it is
//! computed on construction but **not** verified by [`Record::decode`]. Callers
//! that want integrity checks call [`Record::checksum_matches`] explicitly.
//!
//! ## Example
//!
//! ```rust
//! use record::Record;
//!
//! let rec = Record::new(b"hello".to_vec(), b"world".to_vec());
//! let bytes = rec.encode().unwrap();
//! assert_eq!(bytes.len(), rec.record_size());
//! assert_eq!(Record::decode(&bytes).unwrap(), rec);
//! ```

pub mod migration;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher as Crc32;
use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Size of the encoded [`Header`] in bytes: 4 + 1 + 4 + 4 + 4.
pub const HEADER_SIZE: usize = 17;

/// Errors produced while decoding records or migration messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The buffer holds fewer bytes than the header declares.
    #[error("malformed record: needed {needed} bytes, only {available} available")]
    Malformed { needed: usize, available: usize },

    /// The tombstone byte was neither 0 nor 1.
    #[error("invalid tombstone flag {0:#04x}")]
    InvalidTombstone(u8),

    /// A migration status message was not valid UTF-8.
    #[error("invalid utf-8 in message")]
    InvalidUtf8,
}

/// Fixed-width record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// CRC32 over `key ‖ value`.
    pub checksum: u32,
    /// `true` when the record marks a deleted key.
    pub tombstone: bool,
    /// Creation time in seconds since the Unix epoch.
    pub timestamp: u32,
    pub key_size: u32,
    pub value_size: u32,
}

impl Header {
    /// Number of bytes that follow the header on disk.
    #[must_use]
    pub fn body_len(&self) -> usize {
        self.key_size as usize + self.value_size as usize
    }

    /// Total encoded size of the record this header describes.
    #[must_use]
    pub fn record_size(&self) -> usize {
        HEADER_SIZE + self.body_len()
    }

    /// Writes the 17 header bytes.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.checksum)?;
        w.write_u8(u8::from(self.tombstone))?;
        w.write_u32::<LittleEndian>(self.timestamp)?;
        w.write_u32::<LittleEndian>(self.key_size)?;
        w.write_u32::<LittleEndian>(self.value_size)?;
        Ok(())
    }

    /// Decodes a header from the first [`HEADER_SIZE`] bytes of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self, RecordError> {
        if buf.len() < HEADER_SIZE {
            return Err(RecordError::Malformed {
                needed: HEADER_SIZE,
                available: buf.len(),
            });
        }
        let mut r = &buf[..HEADER_SIZE];
        let short = |_: io::Error| RecordError::Malformed {
            needed: HEADER_SIZE,
            available: buf.len(),
        };

        let checksum = r.read_u32::<LittleEndian>().map_err(short)?;
        let tombstone = match r.read_u8().map_err(short)? {
            0 => false,
            1 => true,
            other => return Err(RecordError::InvalidTombstone(other)),
        };
        let timestamp = r.read_u32::<LittleEndian>().map_err(short)?;
        let key_size = r.read_u32::<LittleEndian>().map_err(short)?;
        let value_size = r.read_u32::<LittleEndian>().map_err(short)?;

        Ok(Self {
            checksum,
            tombstone,
            timestamp,
            key_size,
            value_size,
        })
    }
}

/// A single key/value record. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    header: Header,
    key: Vec<u8>,
    value: Vec<u8>,
}

impl Record {
    /// Creates a live record stamped with the current time.
    ///
    /// Keys and values longer than `u32::MAX` bytes cannot be represented in
    /// the header; such a record fails to encode.
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self::build(key.into(), value.into(), false, now_secs())
    }

    /// Creates a tombstone for `key` with an empty value.
    pub fn tombstone(key: impl Into<Vec<u8>>) -> Self {
        Self::build(key.into(), Vec::new(), true, now_secs())
    }

    /// Returns a copy of this record with its timestamp replaced.
    ///
    /// Useful when replaying data whose creation time is already known.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: u32) -> Self {
        self.header.timestamp = timestamp;
        self
    }

    /// Assembles a record from an already-decoded header and body.
    ///
    /// The header's size fields are trusted as-is; [`Record::decode`] is the
    /// path that enforces them.
    pub fn from_parts(header: Header, key: Vec<u8>, value: Vec<u8>) -> Self {
        Self { header, key, value }
    }

    fn build(key: Vec<u8>, value: Vec<u8>, tombstone: bool, timestamp: u32) -> Self {
        let header = Header {
            checksum: checksum(&key, &value),
            tombstone,
            timestamp,
            key_size: size_field(key.len()),
            value_size: size_field(value.len()),
        };
        Self { header, key, value }
    }

    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    #[must_use]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Consumes the record, returning its value bytes.
    pub fn into_value(self) -> Vec<u8> {
        self.value
    }

    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.header.tombstone
    }

    #[must_use]
    pub fn timestamp(&self) -> u32 {
        self.header.timestamp
    }

    /// Encoded size: `HEADER_SIZE + key_size + value_size`.
    #[must_use]
    pub fn record_size(&self) -> usize {
        self.header.record_size()
    }

    /// Recomputes the CRC32 over `key ‖ value` and compares it with the header.
    #[must_use]
    pub fn checksum_matches(&self) -> bool {
        checksum(&self.key, &self.value) == self.header.checksum
    }

    /// Writes the header, key and value.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the header's sizes disagree with the key or value
    /// actually held, e.g. a body longer than `u32::MAX` bytes or a
    /// mismatched [`Record::from_parts`]. Nothing is written in that case.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        if self.header.key_size as usize != self.key.len()
            || self.header.value_size as usize != self.value.len()
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "header declares key {} / value {} bytes, record holds {} / {}",
                    self.header.key_size,
                    self.header.value_size,
                    self.key.len(),
                    self.value.len()
                ),
            ));
        }
        self.header.write_to(w)?;
        w.write_all(&self.key)?;
        w.write_all(&self.value)?;
        Ok(())
    }

    /// Encodes the record into a fresh buffer.
    pub fn encode(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.record_size());
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Decodes one record from the start of `buf`. Trailing bytes are ignored.
    ///
    /// # Errors
    ///
    /// [`RecordError::Malformed`] if `buf` is shorter than the header, or than
    /// the header plus the key and value sizes it declares.
    pub fn decode(buf: &[u8]) -> Result<Self, RecordError> {
        Self::decode_prefix(buf).map(|(rec, _)| rec)
    }

    /// Like [`Record::decode`] but also returns how many bytes were consumed.
    pub fn decode_prefix(buf: &[u8]) -> Result<(Self, usize), RecordError> {
        let header = Header::decode(buf)?;
        let size = header.record_size();
        if buf.len() < size {
            return Err(RecordError::Malformed {
                needed: size,
                available: buf.len(),
            });
        }

        let key_end = HEADER_SIZE + header.key_size as usize;
        let key = buf[HEADER_SIZE..key_end].to_vec();
        let value = buf[key_end..size].to_vec();

        Ok((Self { header, key, value }, size))
    }
}

/// CRC32 over the key followed by the value.
fn checksum(key: &[u8], value: &[u8]) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(key);
    hasher.update(value);
    hasher.finalize()
}

/// Header size field for a key or value of `len` bytes. Lengths past
/// `u32::MAX` saturate, which [`Record::write_to`] then refuses to encode.
fn size_field(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

fn now_secs() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}
