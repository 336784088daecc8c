use chrono::{TimeZone, Utc};
use favscan::cache::{CacheEntry, FileRecord, MemoryCache, MetadataCache};
use favscan::report::{
    ReportError, ReportGenerator, ReportOrder, MOD_TIME_REPORT_NAME, SIZE_REPORT_NAME,
};
use favscan::scanner::hash_path;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn store(cache: &MemoryCache, path: &str, size: u64, mtime: i64) {
    let record = FileRecord::new(size, Utc.timestamp_opt(mtime, 0).unwrap());
    let entry = CacheEntry::new(hash_path(path), path.to_string(), record);
    cache.set_many(&entry.to_writes().unwrap()).unwrap();
}

fn generator(cache: &Arc<MemoryCache>) -> ReportGenerator {
    ReportGenerator::new(Arc::clone(cache) as Arc<dyn MetadataCache>)
}

fn sort_keys(report: &str) -> Vec<i64> {
    report
        .lines()
        .map(|line| line.split_once(',').unwrap().0.parse().unwrap())
        .collect()
}

#[test]
fn test_reports_include_entries_from_other_roots() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("scan_root");
    fs::create_dir(&root).unwrap();

    let cache = Arc::new(MemoryCache::new());
    store(&cache, &root.join("mine.iso").to_string_lossy(), 500, 10);
    store(&cache, &dir.path().join("elsewhere").join("theirs.iso").to_string_lossy(), 900, 20);

    let path = generator(&cache)
        .generate(&root, SIZE_REPORT_NAME, ReportOrder::BySize)
        .unwrap();

    assert_eq!(
        fs::read_to_string(path).unwrap(),
        "900,\"./../elsewhere/theirs.iso\"\n500,\"./mine.iso\"\n"
    );
}

#[test]
fn test_partial_writes_are_not_reported() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let cache = Arc::new(MemoryCache::new());
    store(&cache, &root.join("good.bin").to_string_lossy(), 100, 1);

    // Only the first half of a batch landed
    let half = hash_path(&root.join("half.bin").to_string_lossy());
    let record = FileRecord::new(999, Utc.timestamp_opt(2, 0).unwrap());
    cache.set(half.as_str(), &record.encode().unwrap()).unwrap();

    let snapshot = generator(&cache).snapshot().unwrap();
    assert_eq!(snapshot.len(), 1);

    generator(&cache)
        .generate(root, SIZE_REPORT_NAME, ReportOrder::BySize)
        .unwrap();
    assert_eq!(
        fs::read_to_string(root.join(SIZE_REPORT_NAME)).unwrap(),
        "100,\"./good.bin\"\n"
    );
}

#[test]
fn test_foreign_keys_are_ignored() {
    let dir = tempdir().unwrap();
    let cache = Arc::new(MemoryCache::new());
    store(&cache, &dir.path().join("a.bin").to_string_lossy(), 7, 7);
    cache.set("session:42", b"{\"user\":1}").unwrap();
    cache.set("path:not-a-hash", b"/dangling").unwrap();

    let snapshot = generator(&cache).snapshot().unwrap();
    assert_eq!(snapshot.len(), 1);
}

#[test]
fn test_report_monotonicity() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let cache = Arc::new(MemoryCache::new());
    for (i, size) in [5u64, 500, 50, 5000, 50, 0].into_iter().enumerate() {
        let mtime = [300i64, 100, 600, 200, 100, 50][i];
        store(&cache, &root.join(format!("f{i}")).to_string_lossy(), size, mtime);
    }

    let gen = generator(&cache);
    gen.generate(root, SIZE_REPORT_NAME, ReportOrder::BySize).unwrap();
    gen.generate(root, MOD_TIME_REPORT_NAME, ReportOrder::ByModTime)
        .unwrap();

    for name in [SIZE_REPORT_NAME, MOD_TIME_REPORT_NAME] {
        let keys = sort_keys(&fs::read_to_string(root.join(name)).unwrap());
        assert_eq!(keys.len(), 6);
        assert!(keys.windows(2).all(|w| w[0] >= w[1]), "{name}: {keys:?}");
    }
}

#[test]
fn test_equal_keys_are_ordered_by_path() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let cache = Arc::new(MemoryCache::new());
    for name in ["c.bin", "a.bin", "b.bin"] {
        store(&cache, &root.join(name).to_string_lossy(), 10, 10);
    }

    let gen = generator(&cache);
    let first = gen.generate(root, SIZE_REPORT_NAME, ReportOrder::BySize).unwrap();
    let contents = fs::read_to_string(&first).unwrap();
    assert_eq!(
        contents,
        "10,\"./a.bin\"\n10,\"./b.bin\"\n10,\"./c.bin\"\n"
    );

    // Same cache, same output
    gen.generate(root, SIZE_REPORT_NAME, ReportOrder::BySize).unwrap();
    assert_eq!(fs::read_to_string(&first).unwrap(), contents);
}

#[test]
fn test_mod_time_report_uses_utc_epoch_seconds() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let cache = Arc::new(MemoryCache::new());
    let when = Utc.with_ymd_and_hms(2023, 6, 15, 12, 0, 0).unwrap();
    let entry = CacheEntry::new(
        hash_path(&root.join("x.iso").to_string_lossy()),
        root.join("x.iso").to_string_lossy().into_owned(),
        FileRecord::new(1, when),
    );
    cache.set_many(&entry.to_writes().unwrap()).unwrap();

    generator(&cache)
        .generate(root, MOD_TIME_REPORT_NAME, ReportOrder::ByModTime)
        .unwrap();

    assert_eq!(
        fs::read_to_string(root.join(MOD_TIME_REPORT_NAME)).unwrap(),
        format!("{},\"./x.iso\"\n", when.timestamp())
    );
}

#[test]
fn test_report_into_read_only_location_fails() {
    let cache = Arc::new(MemoryCache::new());
    let result = generator(&cache).generate(
        Path::new("/nonexistent/favscan/root"),
        SIZE_REPORT_NAME,
        ReportOrder::BySize,
    );
    match result {
        Err(ReportError::Io { path, .. }) => {
            assert_eq!(path, Path::new("/nonexistent/favscan/root/fav.log"));
        }
        other => panic!("expected an I/O error, got {other:?}"),
    }
}
