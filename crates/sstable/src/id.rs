use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{Result, SSTableError};
use crate::format::parse_table_id;

/// Hands out unique, monotonically increasing table ids.
///
/// Owned by the store and passed to [`crate::SSTable::build`], so concurrent
/// builds never collide on file names. The first id handed out is `last + 1`.
#[derive(Debug, Default)]
pub struct TableIdAllocator {
    last: AtomicU32,
}

impl TableIdAllocator {
    /// Starts from zero; the first id is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resumes after `last`, e.g. the highest id already on disk.
    pub fn starting_after(last: u32) -> Self {
        Self {
            last: AtomicU32::new(last),
        }
    }

    /// Resumes after the highest `sst_<id>.*` file found in `dir`.
    ///
    /// A missing directory counts as empty.
    pub fn recover<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(e),
        };

        let mut last = 0;
        for entry in entries {
            let name = entry?.file_name();
            if let Some(id) = name.to_str().and_then(parse_table_id) {
                last = last.max(id);
            }
        }
        Ok(Self::starting_after(last))
    }

    /// Allocates the next id. Each call returns a distinct, larger value.
    ///
    /// # Errors
    ///
    /// [`SSTableError::IdsExhausted`] once `u32::MAX` has been handed out.
    /// The counter stays at `u32::MAX`.
    pub fn next_id(&self) -> Result<u32> {
        self.last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| last.checked_add(1))
            .map(|prev| prev + 1)
            .map_err(|_| SSTableError::IdsExhausted)
    }

    /// The most recently allocated id, or the starting point if none yet.
    #[must_use]
    pub fn last_allocated(&self) -> u32 {
        self.last.load(Ordering::Acquire)
    }
}
