//! Sorted report files built from a full cache scan.
//!
//! Reports never look at walk state. Each one scans every key in the cache,
//! keeps the records whose reverse-path entry resolves, and writes one line
//! per file:
//!
//! ```text
//! 314572800,"./media/big.iso"
//! 262144000,"./backup.tar"
//! ```
//!
//! The first column is the size in bytes for [`ReportOrder::BySize`] or the
//! modification time as Unix seconds for [`ReportOrder::ByModTime`]. Rows are
//! sorted on that column, largest first, with ties ordered by path.
//!
//! # Example
//!
//! ```
//! use favscan::cache::{MemoryCache, MetadataCache};
//! use favscan::report::{ReportGenerator, ReportOrder};
//! use std::sync::Arc;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let cache: Arc<dyn MetadataCache> = Arc::new(MemoryCache::new());
//! let generator = ReportGenerator::new(cache);
//!
//! let path = generator
//!     .generate(dir.path(), "fav.log", ReportOrder::BySize)
//!     .unwrap();
//! assert_eq!(std::fs::read_to_string(path).unwrap(), "");
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::{CacheError, FileRecord, MetadataCache};
use crate::scanner::hasher::{is_reverse_key, reverse_key_for};
use crate::scanner::path_utils::report_display;

/// Report sorted by size.
pub const SIZE_REPORT_NAME: &str = "fav.log";

/// Report sorted by modification time.
pub const MOD_TIME_REPORT_NAME: &str = "fav.log.sort";

/// Errors while building or writing a report.
#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    /// The cache scan could not be started or broke off.
    #[error("Cache scan failed: {0}")]
    Scan(#[source] CacheError),

    /// The report file could not be created or written.
    #[error("Failed to write report {path}: {source}")]
    Io {
        /// Report file path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Sort column of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOrder {
    /// Size in bytes, largest first
    BySize,
    /// Modification time, newest first
    ByModTime,
}

impl ReportOrder {
    /// The sort key of `record` under this order.
    #[must_use]
    pub fn sort_key(self, record: &FileRecord) -> i64 {
        match self {
            // Sizes beyond i64::MAX do not exist on any real filesystem
            Self::BySize => i64::try_from(record.size).unwrap_or(i64::MAX),
            Self::ByModTime => record.mod_time_epoch(),
        }
    }
}

/// One report line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    /// Path rendered as `./<relative path>`
    pub path: String,
    /// Size or epoch seconds
    pub sort_key: i64,
}

impl ReportRow {
    /// Write this row as `<sort_key>,"<path>"`.
    ///
    /// # Errors
    ///
    /// Returns any error from the writer.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writeln!(writer, "{},\"{}\"", self.sort_key, self.path)
    }
}

/// Builds reports from the metadata cache.
pub struct ReportGenerator {
    cache: Arc<dyn MetadataCache>,
}

impl ReportGenerator {
    /// Create a generator reading from `cache`.
    #[must_use]
    pub fn new(cache: Arc<dyn MetadataCache>) -> Self {
        Self { cache }
    }

    /// Read every reportable record, keyed by original absolute path.
    ///
    /// Reverse-path keys are skipped. A key whose reverse entry is missing,
    /// or whose value is missing or not a record, is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Scan`] if the scan cannot start or fails part
    /// way, since a truncated snapshot would silently lose rows.
    pub fn snapshot(&self) -> Result<BTreeMap<String, FileRecord>, ReportError> {
        let mut data = BTreeMap::new();
        let mut skipped = 0u64;

        for key in self.cache.scan_keys().map_err(ReportError::Scan)? {
            let key = key.map_err(ReportError::Scan)?;
            if is_reverse_key(&key) {
                continue;
            }

            match self.resolve(&key) {
                Some((path, record)) => {
                    data.insert(path, record);
                }
                None => skipped += 1,
            }
        }

        log::debug!(
            "Cache snapshot: {} reportable records, {} keys skipped",
            data.len(),
            skipped
        );
        Ok(data)
    }

    /// Look up the original path and decoded record for a primary key.
    fn resolve(&self, key: &str) -> Option<(String, FileRecord)> {
        let path = match self.cache.get(&reverse_key_for(key)) {
            Ok(Some(bytes)) => String::from_utf8(bytes).ok()?,
            Ok(None) => {
                log::trace!("No reverse path for key {}", key);
                return None;
            }
            Err(e) => {
                log::trace!("Reverse lookup failed for key {}: {}", key, e);
                return None;
            }
        };

        let bytes = match self.cache.get(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                log::trace!("Lookup failed for key {}: {}", key, e);
                return None;
            }
        };

        match FileRecord::decode(&bytes) {
            Ok(record) => Some((path, record)),
            Err(e) => {
                log::trace!("Undecodable record for {}: {}", path, e);
                None
            }
        }
    }

    /// Turn a snapshot into sorted rows relative to `root`.
    #[must_use]
    pub fn rows(
        root: &Path,
        snapshot: &BTreeMap<String, FileRecord>,
        order: ReportOrder,
    ) -> Vec<ReportRow> {
        let mut rows: Vec<ReportRow> = snapshot
            .iter()
            .map(|(path, record)| ReportRow {
                path: report_display(Path::new(path), root),
                sort_key: order.sort_key(record),
            })
            .collect();

        rows.sort_by(|a, b| b.sort_key.cmp(&a.sort_key).then_with(|| a.path.cmp(&b.path)));
        rows
    }

    /// Write `rows` to `writer`, one line each.
    ///
    /// # Errors
    ///
    /// Returns any error from the writer.
    pub fn write_rows<W: Write>(rows: &[ReportRow], mut writer: W) -> io::Result<()> {
        for row in rows {
            row.write_to(&mut writer)?;
        }
        writer.flush()
    }

    /// Scan the cache and write `root/output_name`, replacing any old file.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if the scan or the file write fails.
    pub fn generate(
        &self,
        root: &Path,
        output_name: &str,
        order: ReportOrder,
    ) -> Result<PathBuf, ReportError> {
        let snapshot = self.snapshot()?;
        let rows = Self::rows(root, &snapshot, order);

        let output_path = root.join(output_name);
        let io_err = |source| ReportError::Io {
            path: output_path.clone(),
            source,
        };

        let file = File::create(&output_path).map_err(io_err)?;
        Self::write_rows(&rows, BufWriter::new(file)).map_err(io_err)?;

        log::info!(
            "Wrote {} rows to {}",
            rows.len(),
            output_path.display()
        );
        Ok(output_path)
    }
}
