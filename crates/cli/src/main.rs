//! # sstable-cli - SSTable Interactive Shell
//!
//! Builds tables from TSV files and inspects existing ones. Reads commands
//! from stdin, so it works interactively or with piped scripts.
//!
//! ## Commands
//!
//! ```text
//! BUILD file.tsv   Build a new table from `key<TAB>value` lines (no tab = tombstone)
//! GET id key       Point lookup in table `id`
//! DUMP id          Print every record of table `id` in key order
//! STAT id          Print table shape and read counters
//! TABLES           List tables opened in this session
//! HELP             Show the command list
//! EXIT / QUIT      Leave the shell
//! ```
//!
//! ## Configuration
//!
//! ```text
//! SSTABLE_DIR             table directory                    (default: "data/sst")
//! SSTABLE_INDEX_INTERVAL  records per sparse index entry     (default: 1000)
//! SSTABLE_BLOOM_FPR       bloom filter false-positive target (default: 0.01)
//! SSTABLE_SYNC            fsync files after a build          (default: "true")
//! RUST_LOG                log filter                         (default: "warn")
//! ```
//!
//! ## Example
//!
//! ```text
//! $ printf 'a\t1\nb\t2\n' > batch.tsv
//! $ cargo run -p cli
//! > BUILD batch.tsv
//! OK table 1
//! > GET 1 b
//! 2
//! > GET 1 z
//! (out of range)
//! > EXIT
//! bye
//! ```

use anyhow::{Context, Result};
use cli::{Command, Shell, HELP};
use config::TableConfig;
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let config = TableConfig::from_env().context("reading table configuration")?;
    let dir = config::table_dir_from_env();
    let mut shell = Shell::new(&dir, config.clone())?;

    println!(
        "sstable-cli started (dir={}, index_interval={}, bloom_fpr={}, sync={})",
        shell.dir().display(),
        config.sparse_index_interval,
        config.bloom_false_positive_rate,
        config.sync_on_build
    );
    println!("{}", HELP);
    prompt();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        match Command::parse(&line) {
            Ok(Some(Command::Exit)) => {
                println!("bye");
                break;
            }
            Ok(Some(cmd)) => match shell.run(cmd) {
                Ok(out) => println!("{}", out),
                Err(e) => println!("ERR {:#}", e),
            },
            Ok(None) => {}
            Err(e) => println!("ERR {}", e),
        }
        prompt();
    }

    Ok(())
}

fn prompt() {
    print!("> ");
    io::stdout().flush().ok();
}
