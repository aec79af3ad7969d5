//! # Config - SSTable tuning knobs
//!
//! Settings that shape how tables are written. Every field has a default, and
//! each can be overridden through the environment:
//!
//! ```text
//! SSTABLE_INDEX_INTERVAL  records between sparse index entries (default: 1000)
//! SSTABLE_BLOOM_FPR       bloom filter false-positive target   (default: 0.01)
//! SSTABLE_SYNC            fsync the three files after a build  (default: "true")
//! SSTABLE_DIR             directory holding table files        (default: "data/sst")
//! ```

use std::path::PathBuf;
use thiserror::Error;

pub const ENV_INDEX_INTERVAL: &str = "SSTABLE_INDEX_INTERVAL";
pub const ENV_BLOOM_FPR: &str = "SSTABLE_BLOOM_FPR";
pub const ENV_SYNC: &str = "SSTABLE_SYNC";
pub const ENV_DIR: &str = "SSTABLE_DIR";

/// Default number of records between two sparse index entries.
pub const DEFAULT_INDEX_INTERVAL: usize = 1000;
/// Default bloom filter false-positive target (1%).
pub const DEFAULT_BLOOM_FPR: f64 = 0.01;
pub const DEFAULT_DIR: &str = "data/sst";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// How a table is laid out on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct TableConfig {
    /// Every `sparse_index_interval`-th record gets a sparse index entry.
    pub sparse_index_interval: usize,
    /// Target false-positive rate of the per-table bloom filter.
    pub bloom_false_positive_rate: f64,
    /// Whether `build` calls `sync_all` on the data, index and bloom files.
    pub sync_on_build: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            sparse_index_interval: DEFAULT_INDEX_INTERVAL,
            bloom_false_positive_rate: DEFAULT_BLOOM_FPR,
            sync_on_build: true,
        }
    }
}

impl TableConfig {
    /// Reads overrides from the process environment on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`TableConfig::from_env`] but with a caller-supplied lookup, so
    /// tests never touch the real environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(raw) = lookup(ENV_INDEX_INTERVAL) {
            cfg.sparse_index_interval = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                key: ENV_INDEX_INTERVAL,
                reason: format!("{:?}: {}", raw, e),
            })?;
        }
        if let Some(raw) = lookup(ENV_BLOOM_FPR) {
            cfg.bloom_false_positive_rate =
                raw.trim().parse().map_err(|e| ConfigError::Invalid {
                    key: ENV_BLOOM_FPR,
                    reason: format!("{:?}: {}", raw, e),
                })?;
        }
        if let Some(raw) = lookup(ENV_SYNC) {
            cfg.sync_on_build = parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                key: ENV_SYNC,
                reason: format!("{:?} is not a boolean", raw),
            })?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn with_sparse_index_interval(mut self, interval: usize) -> Self {
        self.sparse_index_interval = interval;
        self
    }

    pub fn with_bloom_false_positive_rate(mut self, fpr: f64) -> Self {
        self.bloom_false_positive_rate = fpr;
        self
    }

    pub fn with_sync_on_build(mut self, sync: bool) -> Self {
        self.sync_on_build = sync;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sparse_index_interval == 0 {
            return Err(ConfigError::Invalid {
                key: ENV_INDEX_INTERVAL,
                reason: "must be greater than 0".to_string(),
            });
        }
        let fpr = self.bloom_false_positive_rate;
        if !(fpr > 0.0 && fpr < 1.0) {
            return Err(ConfigError::Invalid {
                key: ENV_BLOOM_FPR,
                reason: format!("{} is outside (0, 1)", fpr),
            });
        }
        Ok(())
    }
}

/// Directory the CLI reads and writes tables in.
pub fn table_dir_from_env() -> PathBuf {
    std::env::var(ENV_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DIR))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
