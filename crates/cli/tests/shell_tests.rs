use anyhow::Result;
use cli::{parse_tsv, Command, Shell};
use config::TableConfig;
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use tempfile::tempdir;

fn config() -> TableConfig {
    TableConfig::default().with_sync_on_build(false)
}

// -------------------- Parsing --------------------

#[test]
fn parse_commands() -> Result<()> {
    assert_eq!(Command::parse("")?, None);
    assert_eq!(Command::parse("   ")?, None);
    assert_eq!(
        Command::parse("build batch.tsv")?,
        Some(Command::Build(PathBuf::from("batch.tsv")))
    );
    assert_eq!(
        Command::parse("GET 3 key")?,
        Some(Command::Get {
            id: 3,
            key: "key".to_string()
        })
    );
    assert_eq!(Command::parse("dump 1")?, Some(Command::Dump(1)));
    assert_eq!(Command::parse("STAT 2")?, Some(Command::Stat(2)));
    assert_eq!(Command::parse("quit")?, Some(Command::Exit));
    Ok(())
}

#[test]
fn parse_rejects_bad_input() {
    assert!(Command::parse("GET 1").is_err());
    assert!(Command::parse("GET x key").is_err());
    assert!(Command::parse("DUMP").is_err());
    assert!(Command::parse("FROB").is_err());
}

#[test]
fn tsv_is_sorted_and_last_write_wins() -> Result<()> {
    let input = "c\t3\na\t1\n\nb\told\nb\tnew\nd\n";
    let recs = parse_tsv(Cursor::new(input))?;

    let keys: Vec<&[u8]> = recs.iter().map(|r| r.key()).collect();
    assert_eq!(keys, vec![b"a".as_slice(), b"b", b"c", b"d"]);
    assert_eq!(recs[1].value(), b"new");
    assert!(recs[3].is_tombstone());
    Ok(())
}

#[test]
fn tsv_value_may_contain_tabs() -> Result<()> {
    let recs = parse_tsv(Cursor::new("k\tv1\tv2\n"))?;
    assert_eq!(recs[0].value(), b"v1\tv2");
    Ok(())
}

// -------------------- Session --------------------

#[test]
fn build_then_query() -> Result<()> {
    let dir = tempdir()?;
    let mut shell = Shell::new(dir.path(), config())?;

    let id = shell.build_from(Cursor::new("apple\tred\nbanana\tyellow\ncherry\n"))?;
    assert_eq!(id, 1);

    let get = |shell: &mut Shell, key: &str| {
        shell.run(Command::Get {
            id,
            key: key.to_string(),
        })
    };
    assert_eq!(get(&mut shell, "banana")?, "yellow");
    assert_eq!(get(&mut shell, "cherry")?, "(deleted)");
    assert_eq!(get(&mut shell, "zebra")?, "(out of range)");
    assert!(["(nil)", "(out of range)"].contains(&get(&mut shell, "avocado")?.as_str()));
    Ok(())
}

#[test]
fn build_command_reads_file() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("batch.tsv");
    fs::write(&input, "x\t1\ny\t2\n")?;

    let mut shell = Shell::new(dir.path().join("sst"), config())?;
    let out = shell.run(Command::Build(input))?;
    assert_eq!(out, "OK table 1");

    let dump = shell.run(Command::Dump(1))?;
    assert_eq!(dump, "x -> 1\ny -> 2\n(2 entries)");
    Ok(())
}

#[test]
fn new_session_opens_existing_tables_and_continues_ids() -> Result<()> {
    let dir = tempdir()?;
    {
        let mut shell = Shell::new(dir.path(), config())?;
        shell.build_from(Cursor::new("a\t1\n"))?;
        shell.build_from(Cursor::new("b\t2\n"))?;
    }

    let mut shell = Shell::new(dir.path(), config())?;
    assert_eq!(
        shell.run(Command::Get {
            id: 2,
            key: "b".to_string()
        })?,
        "2"
    );
    assert_eq!(shell.build_from(Cursor::new("c\t3\n"))?, 3);

    let stat = shell.run(Command::Stat(2))?;
    assert!(stat.contains("lookups=1"));
    Ok(())
}

#[test]
fn empty_batch_is_an_error() -> Result<()> {
    let dir = tempdir()?;
    let mut shell = Shell::new(dir.path(), config())?;
    assert!(shell.build_from(Cursor::new("\n\n")).is_err());
    Ok(())
}

#[test]
fn missing_table_is_an_error() -> Result<()> {
    let dir = tempdir()?;
    let mut shell = Shell::new(dir.path(), config())?;
    assert!(shell.run(Command::Dump(9)).is_err());
    Ok(())
}
