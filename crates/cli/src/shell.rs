use anyhow::{bail, Context, Result};
use config::TableConfig;
use record::Record;
use sstable::{Lookup, SSTable, TableIdAllocator};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::info;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Build(PathBuf),
    Get { id: u32, key: String },
    Dump(u32),
    Stat(u32),
    Tables,
    Help,
    Exit,
}

pub const HELP: &str = "Commands: BUILD file.tsv | GET id key | DUMP id | STAT id | TABLES | HELP | EXIT";

impl Command {
    /// Parses a line. Blank lines give `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut parts = line.split_whitespace();
        let Some(cmd) = parts.next() else {
            return Ok(None);
        };

        let cmd = match cmd.to_uppercase().as_str() {
            "BUILD" => match parts.next() {
                Some(path) => Command::Build(PathBuf::from(path)),
                None => bail!("usage: BUILD file.tsv"),
            },
            "GET" => match (parts.next(), parts.next()) {
                (Some(id), Some(key)) => Command::Get {
                    id: parse_id(id)?,
                    key: key.to_string(),
                },
                _ => bail!("usage: GET id key"),
            },
            "DUMP" => Command::Dump(parse_id(parts.next().context("usage: DUMP id")?)?),
            "STAT" => Command::Stat(parse_id(parts.next().context("usage: STAT id")?)?),
            "TABLES" => Command::Tables,
            "HELP" => Command::Help,
            "EXIT" | "QUIT" => Command::Exit,
            other => bail!("unknown command: {}", other),
        };
        Ok(Some(cmd))
    }
}

fn parse_id(raw: &str) -> Result<u32> {
    raw.parse()
        .with_context(|| format!("table id must be a number, got {:?}", raw))
}

/// Reads `key<TAB>value` lines into a sorted, de-duplicated batch.
///
/// A line without a tab is a tombstone for that key. When a key repeats, the
/// last line wins. Blank lines are skipped.
pub fn parse_tsv<R: BufRead>(input: R) -> Result<Vec<Record>> {
    let mut latest: BTreeMap<Vec<u8>, Record> = BTreeMap::new();
    for (n, line) in input.lines().enumerate() {
        let line = line.with_context(|| format!("reading line {}", n + 1))?;
        if line.is_empty() {
            continue;
        }
        let rec = match line.split_once('\t') {
            Some((key, value)) => Record::new(key, value),
            None => Record::tombstone(line.as_str()),
        };
        latest.insert(rec.key().to_vec(), rec);
    }
    Ok(latest.into_values().collect())
}

/// Interactive session over the tables in one directory.
pub struct Shell {
    dir: PathBuf,
    config: TableConfig,
    ids: TableIdAllocator,
    tables: BTreeMap<u32, SSTable>,
}

impl Shell {
    /// Opens a session on `dir`, resuming id allocation after any tables
    /// already there.
    pub fn new<P: AsRef<Path>>(dir: P, config: TableConfig) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let ids = TableIdAllocator::recover(&dir)
            .with_context(|| format!("scanning {}", dir.display()))?;
        Ok(Self {
            dir,
            config,
            ids,
            tables: BTreeMap::new(),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Runs a command and returns its printable output. `Exit` returns "bye".
    pub fn run(&mut self, cmd: Command) -> Result<String> {
        match cmd {
            Command::Build(path) => {
                let file = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
                let id = self.build_from(BufReader::new(file))?;
                Ok(format!("OK table {}", id))
            }
            Command::Get { id, key } => {
                let out = match self.table(id)?.get(key.as_bytes())? {
                    Lookup::Found(rec) if rec.is_tombstone() => "(deleted)".to_string(),
                    Lookup::Found(rec) => String::from_utf8_lossy(rec.value()).into_owned(),
                    Lookup::NotFound => "(nil)".to_string(),
                    Lookup::OutOfRange => "(out of range)".to_string(),
                };
                Ok(out)
            }
            Command::Dump(id) => {
                let table = self.table(id)?;
                let mut out = String::new();
                for rec in table.iter()? {
                    let rec = rec?;
                    let key = String::from_utf8_lossy(rec.key());
                    if rec.is_tombstone() {
                        writeln!(out, "{} (deleted)", key)?;
                    } else {
                        writeln!(out, "{} -> {}", key, String::from_utf8_lossy(rec.value()))?;
                    }
                }
                write!(out, "({} entries)", table.len())?;
                Ok(out)
            }
            Command::Stat(id) => {
                let table = self.table(id)?;
                let stats = table.stats();
                Ok(format!(
                    "{:?}\nlookups={} range_rejections={} bloom_rejections={} records_decoded={}",
                    table,
                    stats.lookups,
                    stats.range_rejections,
                    stats.bloom_rejections,
                    stats.records_decoded
                ))
            }
            Command::Tables => {
                let open: Vec<String> = self.tables.keys().map(u32::to_string).collect();
                Ok(format!(
                    "open: [{}] last id: {}",
                    open.join(", "),
                    self.ids.last_allocated()
                ))
            }
            Command::Help => Ok(HELP.to_string()),
            Command::Exit => Ok("bye".to_string()),
        }
    }

    /// Builds a table from TSV input and keeps it open. Returns its id.
    pub fn build_from<R: BufRead>(&mut self, input: R) -> Result<u32> {
        let records = parse_tsv(input)?;
        let table = SSTable::build(&self.dir, &self.ids, &records, &self.config)
            .context("building table")?;
        let id = table.id();
        info!(id, records = table.len(), "table built");
        self.tables.insert(id, table);
        Ok(id)
    }

    /// Returns table `id`, opening it from disk on first use.
    fn table(&mut self, id: u32) -> Result<&SSTable> {
        if !self.tables.contains_key(&id) {
            let table = SSTable::open(&self.dir, id).with_context(|| format!("opening table {}", id))?;
            self.tables.insert(id, table);
        }
        self.tables
            .get(&id)
            .with_context(|| format!("table {} not loaded", id))
    }
}
