use config::ConfigError;
use record::RecordError;
use std::io;
use thiserror::Error;

/// Errors surfaced by building, opening or reading an SSTable.
///
/// A key that is simply absent is not an error; see [`crate::Lookup`].
#[derive(Debug, Error)]
pub enum SSTableError {
    /// Creating, writing, seeking or reading one of the table files failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A record in the data file is shorter than its header declares.
    #[error(transparent)]
    Malformed(#[from] RecordError),

    #[error("refusing to build an empty SSTable")]
    EmptyBatch,

    /// `position` is the first record whose key is not greater than its predecessor.
    #[error("records are not strictly ascending at position {position}")]
    Unsorted { position: usize },

    /// Encoded data does not fit the u32 offsets of the index format.
    #[error("encoded data reached {0} bytes, beyond the u32 offset range")]
    TableTooLarge(u64),

    /// The bloom filter for this batch would be too large to read back.
    #[error("bloom filter would need {bytes} bytes, limit is {limit}")]
    BloomTooLarge { bytes: usize, limit: usize },

    /// Every table id up to `u32::MAX` has been handed out.
    #[error("table ids exhausted")]
    IdsExhausted,

    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("data file lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, SSTableError>;
