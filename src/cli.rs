//! Command-line interface definitions for favscan.
//!
//! All options are optional so that values from the config file and the
//! environment are only overridden when a flag is actually given.
//!
//! # Example
//!
//! ```bash
//! # Scan with the default 200 MiB threshold against a local Redis
//! favscan /data
//!
//! # Lower threshold, fewer workers, explicit cache
//! favscan /data --min-size 1GiB -w 8 --cache-url redis://cache:6379/2
//!
//! # Do not descend into excluded directories
//! favscan /data --prune-excluded --exclude-file ~/favscan-excludes.txt
//! ```

use clap::Parser;
use std::path::PathBuf;

/// Find large files, record their size and modification time in a cache,
/// and write size- and time-sorted reports.
///
/// Reports are written to `fav.log` and `fav.log.sort` inside DIRECTORY.
#[derive(Debug, Parser)]
#[command(name = "favscan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to scan
    #[arg(value_name = "DIRECTORY")]
    pub directory: PathBuf,

    /// Minimum file size to record (default: 200MiB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Number of worker threads (default: 20)
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,

    /// Cache URL, e.g. redis://127.0.0.1:6379 or memory://
    #[arg(long, value_name = "URL", env = "FAVSCAN_CACHE_URL")]
    pub cache_url: Option<String>,

    /// Exclusion pattern file (default: DIRECTORY/exclude_patterns.txt)
    #[arg(long, value_name = "PATH")]
    pub exclude_file: Option<PathBuf>,

    /// Do not descend into directories matched by an exclusion pattern
    #[arg(long)]
    pub prune_excluded: bool,

    /// Configuration file (TOML)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress the periodic progress lines
    #[arg(long)]
    pub no_progress: bool,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all log output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use favscan::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("200MiB").unwrap(), 200 * 1024 * 1024);
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, an unknown size suffix, or a size beyond `u64`.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    if s.starts_with('-') {
        return Err("Size cannot be negative".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    let bytes = num * multiplier as f64;
    if !bytes.is_finite() || bytes >= u64::MAX as f64 {
        return Err(format!("Size too large: '{s}'"));
    }
    Ok(bytes as u64)
}
