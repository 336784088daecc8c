use favscan::cache::{CacheError, CacheResult, KeyScan, MemoryCache, MetadataCache};
use favscan::pipeline::{run_scan, ScanOptions, ScanSummary};
use favscan::progress::RecordingProgress;
use favscan::report::SIZE_REPORT_NAME;
use favscan::scanner::WalkerConfig;
use std::fs::{self, File};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

/// Wraps a [`MemoryCache`] and fails every batch for a path containing
/// `needle`, without writing any of it.
struct FlakyCache {
    inner: MemoryCache,
    needle: String,
    failures: AtomicU64,
}

impl FlakyCache {
    fn new(needle: &str) -> Self {
        Self {
            inner: MemoryCache::new(),
            needle: needle.to_string(),
            failures: AtomicU64::new(0),
        }
    }
}

impl MetadataCache for FlakyCache {
    fn set(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        self.inner.set(key, value)
    }

    fn set_many(&self, entries: &[(String, Vec<u8>)]) -> CacheResult<()> {
        let poisoned = entries
            .iter()
            .any(|(_, value)| String::from_utf8_lossy(value).contains(&self.needle));
        if poisoned {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(CacheError::Operation("connection reset by peer".to_string()));
        }
        self.inner.set_many(entries)
    }

    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn scan_keys(&self) -> CacheResult<KeyScan<'_>> {
        self.inner.scan_keys()
    }
}

/// Cache that only ever stores the first key of a batch.
struct HalfWriteCache {
    inner: MemoryCache,
}

impl MetadataCache for HalfWriteCache {
    fn set(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        self.inner.set(key, value)
    }

    fn set_many(&self, entries: &[(String, Vec<u8>)]) -> CacheResult<()> {
        if let Some((key, value)) = entries.first() {
            self.inner.set(key, value)?;
        }
        Err(CacheError::Operation("pipeline interrupted".to_string()))
    }

    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn scan_keys(&self) -> CacheResult<KeyScan<'_>> {
        self.inner.scan_keys()
    }
}

fn write_file(path: &Path, size: u64) {
    File::create(path).unwrap().set_len(size).unwrap();
}

fn options() -> ScanOptions {
    ScanOptions {
        walker: WalkerConfig {
            min_size: 1024,
            ..Default::default()
        },
        workers: 3,
        progress_interval: Duration::from_secs(3600),
    }
}

fn scan(root: &Path, cache: Arc<dyn MetadataCache>) -> ScanSummary {
    run_scan(root, cache, &options(), Arc::new(RecordingProgress::new())).unwrap()
}

#[test]
fn test_failing_write_scenario() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write_file(&root.join("ok1.bin"), 4096);
    write_file(&root.join("fail.bin"), 8192);
    write_file(&root.join("ok2.bin"), 2048);

    let cache = Arc::new(FlakyCache::new("fail.bin"));
    let summary = scan(root, Arc::clone(&cache) as Arc<dyn MetadataCache>);

    assert_eq!(summary.processed, 2);
    assert_eq!(cache.failures.load(Ordering::SeqCst), 1);
    assert!(summary.reports_ok());
    assert_eq!(
        fs::read_to_string(root.join(SIZE_REPORT_NAME)).unwrap(),
        "4096,\"./ok1.bin\"\n2048,\"./ok2.bin\"\n"
    );
}

#[test]
fn test_half_written_batches_never_reach_reports() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write_file(&root.join("a.bin"), 4096);
    write_file(&root.join("b.bin"), 4096);

    let cache = Arc::new(HalfWriteCache {
        inner: MemoryCache::new(),
    });
    let summary = scan(root, Arc::clone(&cache) as Arc<dyn MetadataCache>);

    assert_eq!(summary.processed, 0);
    assert_eq!(cache.inner.len(), 2);
    assert_eq!(fs::read_to_string(root.join(SIZE_REPORT_NAME)).unwrap(), "");
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_does_not_stop_scan() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let root = dir.path();
    write_file(&root.join("visible.bin"), 4096);
    let locked = root.join("locked");
    fs::create_dir(&locked).unwrap();
    write_file(&locked.join("hidden.bin"), 4096);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    let cache = Arc::new(MemoryCache::new());
    let summary = run_scan(
        root,
        Arc::clone(&cache) as Arc<dyn MetadataCache>,
        &options(),
        Arc::new(RecordingProgress::new()),
    );

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    let summary = summary.unwrap();
    assert!(summary.reports_ok());
    let report = fs::read_to_string(root.join(SIZE_REPORT_NAME)).unwrap();
    assert!(report.contains("\"./visible.bin\""));
}

#[test]
fn test_report_failure_is_returned_not_raised() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write_file(&root.join("a.bin"), 4096);
    // A directory where the size report should go
    fs::create_dir(root.join(SIZE_REPORT_NAME)).unwrap();

    let summary = scan(root, Arc::new(MemoryCache::new()));

    assert_eq!(summary.processed, 1);
    assert!(!summary.size_report.is_ok());
    assert!(summary.mod_time_report.is_ok());
    assert!(!summary.reports_ok());
}
