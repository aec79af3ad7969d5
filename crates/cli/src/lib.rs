//! Operator shell for SSTable directories; see `sstable-cli`.

pub mod shell;

pub use shell::{parse_tsv, Command, Shell, HELP};
