use std::sync::atomic::{AtomicU64, Ordering};

/// Per-table read counters, updated by every lookup.
#[derive(Debug, Default)]
pub struct ReadStats {
    lookups: AtomicU64,
    range_rejections: AtomicU64,
    bloom_rejections: AtomicU64,
    records_decoded: AtomicU64,
    bytes_read: AtomicU64,
}

/// Point-in-time copy of [`ReadStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStatsSnapshot {
    pub lookups: u64,
    /// Lookups answered by the min/max check alone.
    pub range_rejections: u64,
    /// Lookups answered by the bloom filter alone.
    pub bloom_rejections: u64,
    /// Records read from the data file and decoded.
    pub records_decoded: u64,
    pub bytes_read: u64,
}

impl ReadStats {
    pub(crate) fn lookup(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn range_rejection(&self) {
        self.range_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn bloom_rejection(&self) {
        self.bloom_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decoded(&self, bytes: usize) {
        self.records_decoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ReadStatsSnapshot {
        ReadStatsSnapshot {
            lookups: self.lookups.load(Ordering::Relaxed),
            range_rejections: self.range_rejections.load(Ordering::Relaxed),
            bloom_rejections: self.bloom_rejections.load(Ordering::Relaxed),
            records_decoded: self.records_decoded.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
        }
    }
}
