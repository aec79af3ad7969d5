use config::TableConfig;
use record::Record;

/// Live records with value `v-<key>` and a fixed timestamp.
pub fn records(keys: &[&str]) -> Vec<Record> {
    keys.iter()
        .map(|k| Record::new(k.as_bytes(), format!("v-{}", k).into_bytes()).with_timestamp(7))
        .collect()
}

/// `n` records keyed `k0000`, `k0001`, ... with values `v0000`, `v0001`, ...
pub fn numbered(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| Record::new(format!("k{:04}", i), format!("v{:04}", i)).with_timestamp(7))
        .collect()
}

/// Default layout without fsync, to keep tests fast.
pub fn test_config() -> TableConfig {
    TableConfig::default().with_sync_on_build(false)
}
