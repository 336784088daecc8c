//! Application configuration management.
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML file: `--config PATH`, else `<platform config dir>/config.toml`
//! 3. Environment variables prefixed `FAVSCAN_` (e.g. `FAVSCAN_WORKERS=8`)
//! 4. Command-line flags
//!
//! ```toml
//! min_size = 524288000
//! workers = 32
//! cache_url = "redis://cache.internal:6379/1"
//! exclude_policy = "prune"
//! progress_interval_ms = 5000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cache::CacheOptions;
use crate::cli::Cli;
use crate::scanner::ExcludePolicy;

/// Default size threshold: 200 MiB.
pub const DEFAULT_MIN_SIZE: u64 = 200 * 1024 * 1024;

/// Default number of worker threads.
pub const DEFAULT_WORKERS: usize = 20;

/// Default cache location.
pub const DEFAULT_CACHE_URL: &str = "redis://127.0.0.1:6379";

/// File name looked up in the scanned root when no exclude file is given.
pub const DEFAULT_EXCLUDE_FILE_NAME: &str = "exclude_patterns.txt";

/// Prefix of environment variables read into the configuration.
pub const ENV_PREFIX: &str = "FAVSCAN_";

/// Errors while loading or validating configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// An explicitly named config file does not exist.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// A layer could not be parsed or has the wrong types.
    #[error("Invalid configuration: {0}")]
    Parse(#[from] Box<figment::Error>),

    /// A value is out of range.
    #[error("Invalid value for '{field}': {reason}")]
    Invalid {
        /// Field name
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minimum size in bytes for a file to be recorded
    pub min_size: u64,
    /// Number of worker threads
    pub workers: usize,
    /// Cache URL (`redis://...` or `memory://`)
    pub cache_url: String,
    /// Exclusion pattern file; `None` means `<root>/exclude_patterns.txt`
    pub exclude_file: Option<PathBuf>,
    /// Treatment of excluded directories
    pub exclude_policy: ExcludePolicy,
    /// Milliseconds between progress lines
    pub progress_interval_ms: u64,
    /// Whether periodic progress lines are printed
    pub show_progress: bool,
    /// Cache connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Cache read/write timeout in seconds
    pub io_timeout_secs: u64,
    /// Keys requested per cache scan round trip
    pub scan_batch: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_SIZE,
            workers: DEFAULT_WORKERS,
            cache_url: DEFAULT_CACHE_URL.to_string(),
            exclude_file: None,
            exclude_policy: ExcludePolicy::Descend,
            progress_interval_ms: 1000,
            show_progress: true,
            connect_timeout_secs: 5,
            io_timeout_secs: 30,
            scan_batch: 1000,
        }
    }
}

impl Config {
    /// Build the layered configuration for a CLI invocation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a layer fails to parse or the result does
    /// not validate.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) if !path.is_file() => return Err(ConfigError::NotFound(path.clone())),
            Some(path) => Some(path.clone()),
            None => Self::default_path().filter(|p| p.is_file()),
        };

        let mut config = Self::figment(file.as_deref()).extract::<Self>().map_err(Box::new)?;
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the optional TOML file, then `FAVSCAN_*` variables.
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            log::debug!("Loading configuration from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Overlay the flags that were given on the command line.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(min_size) = cli.min_size {
            self.min_size = min_size;
        }
        if let Some(workers) = cli.workers {
            self.workers = workers;
        }
        if let Some(url) = &cli.cache_url {
            self.cache_url.clone_from(url);
        }
        if let Some(path) = &cli.exclude_file {
            self.exclude_file = Some(path.clone());
        }
        if cli.prune_excluded {
            self.exclude_policy = ExcludePolicy::Prune;
        }
        if cli.no_progress {
            self.show_progress = false;
        }
    }

    /// Reject values the scan cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zero = |field: &'static str| ConfigError::Invalid {
            field,
            reason: "must be greater than zero".to_string(),
        };

        if self.workers == 0 {
            return Err(zero("workers"));
        }
        if self.progress_interval_ms == 0 {
            return Err(zero("progress_interval_ms"));
        }
        if self.scan_batch == 0 {
            return Err(zero("scan_batch"));
        }
        if self.cache_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "cache_url",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Platform config file location, e.g. `~/.config/favscan/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "favscan").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Exclusion file to use when scanning `root`.
    #[must_use]
    pub fn exclude_file_for(&self, root: &Path) -> PathBuf {
        self.exclude_file
            .clone()
            .unwrap_or_else(|| root.join(DEFAULT_EXCLUDE_FILE_NAME))
    }

    /// Interval between progress lines.
    #[must_use]
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    /// Connection settings for the cache backend.
    #[must_use]
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            io_timeout: Duration::from_secs(self.io_timeout_secs),
            scan_batch: self.scan_batch,
            max_idle: self.workers,
        }
    }
}
