use crate::*;
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

// -------------------- Allocation --------------------

#[test]
fn ids_start_at_one_and_increase() {
    let ids = TableIdAllocator::new();
    assert_eq!(ids.last_allocated(), 0);
    assert_eq!(ids.next_id().unwrap(), 1);
    assert_eq!(ids.next_id().unwrap(), 2);
    assert_eq!(ids.last_allocated(), 2);
}

#[test]
fn starting_after_resumes() {
    let ids = TableIdAllocator::starting_after(41);
    assert_eq!(ids.next_id().unwrap(), 42);
}

#[test]
fn concurrent_allocation_never_collides() {
    let ids = Arc::new(TableIdAllocator::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ids = Arc::clone(&ids);
            thread::spawn(move || (0..500).map(|_| ids.next_id().unwrap()).collect::<Vec<_>>())
        })
        .collect();

    let mut seen = HashSet::new();
    for h in handles {
        for id in h.join().unwrap() {
            assert!(seen.insert(id), "id {} handed out twice", id);
        }
    }
    assert_eq!(seen.len(), 4000);
    assert_eq!(ids.last_allocated(), 4000);
}

#[test]
fn exhausted_ids_are_an_error_not_a_wrap() {
    let ids = TableIdAllocator::starting_after(u32::MAX - 1);
    assert_eq!(ids.next_id().unwrap(), u32::MAX);

    for _ in 0..2 {
        assert!(matches!(ids.next_id(), Err(SSTableError::IdsExhausted)));
    }
    assert_eq!(ids.last_allocated(), u32::MAX);
}

#[test]
fn build_after_exhaustion_creates_nothing() {
    let dir = tempdir().unwrap();
    let ids = TableIdAllocator::starting_after(u32::MAX);
    let recs = vec![record::Record::new("a", "1")];
    let cfg = config::TableConfig::default().with_sync_on_build(false);

    let err = SSTable::build(dir.path(), &ids, &recs, &cfg).unwrap_err();
    assert!(matches!(err, SSTableError::IdsExhausted));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

// -------------------- Recovery --------------------

#[test]
fn recover_resumes_after_highest_table() {
    let dir = tempdir().unwrap();
    for name in ["sst_3.data", "sst_12.index", "sst_7.bloom", "sst_99.tmp", "notes.txt"] {
        fs::write(dir.path().join(name), b"").unwrap();
    }
    let ids = TableIdAllocator::recover(dir.path()).unwrap();
    assert_eq!(ids.next_id().unwrap(), 13);
}

#[test]
fn recover_after_highest_possible_id_cannot_allocate() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(format!("sst_{}.data", u32::MAX)), b"").unwrap();
    let ids = TableIdAllocator::recover(dir.path()).unwrap();
    assert_eq!(ids.last_allocated(), u32::MAX);
    assert!(matches!(ids.next_id(), Err(SSTableError::IdsExhausted)));
}

#[test]
fn recover_missing_dir_starts_fresh() {
    let dir = tempdir().unwrap();
    let ids = TableIdAllocator::recover(dir.path().join("nope")).unwrap();
    assert_eq!(ids.next_id().unwrap(), 1);
}

// -------------------- File names --------------------

#[test]
fn paths_share_base_name() {
    let paths = TablePaths::new("/tmp/t", 5);
    assert!(paths.data.ends_with("sst_5.data"));
    assert!(paths.index.ends_with("sst_5.index"));
    assert!(paths.bloom.ends_with("sst_5.bloom"));
    assert_eq!(paths.iter().count(), 3);
}

#[test]
fn parse_table_id_accepts_only_table_files() {
    assert_eq!(parse_table_id("sst_1.data"), Some(1));
    assert_eq!(parse_table_id("sst_250.index"), Some(250));
    assert_eq!(parse_table_id("sst_9.bloom"), Some(9));
    assert_eq!(parse_table_id("sst_9.sst"), None);
    assert_eq!(parse_table_id("sst_x.data"), None);
    assert_eq!(parse_table_id("table_1.data"), None);
    assert_eq!(parse_table_id("sst_1"), None);
}
