use clap::Parser;
use favscan::cli::Cli;
use favscan::config::{Config, ConfigError, DEFAULT_MIN_SIZE};
use favscan::scanner::ExcludePolicy;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .extract()
        .unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.min_size, DEFAULT_MIN_SIZE);
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
min_size = 1048576
workers = 8
cache_url = "redis://cache.internal:6380/2"
exclude_file = "/etc/favscan/excludes.txt"
exclude_policy = "prune"
progress_interval_ms = 250
"#,
    )
    .unwrap();

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .extract()
        .unwrap();

    assert_eq!(config.min_size, 1_048_576);
    assert_eq!(config.workers, 8);
    assert_eq!(config.cache_url, "redis://cache.internal:6380/2");
    assert_eq!(
        config.exclude_file,
        Some(PathBuf::from("/etc/favscan/excludes.txt"))
    );
    assert_eq!(config.exclude_policy, ExcludePolicy::Prune);
    assert_eq!(config.progress_interval_ms, 250);
    // Untouched fields keep their defaults
    assert_eq!(config.scan_batch, Config::default().scan_batch);
}

#[test]
fn test_config_load_from_env() {
    std::env::set_var("FAVSCANTEST_WORKERS", "16");
    std::env::set_var("FAVSCANTEST_EXCLUDE_POLICY", "prune");

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed("FAVSCANTEST_"))
        .extract()
        .unwrap();

    assert_eq!(config.workers, 16);
    assert_eq!(config.exclude_policy, ExcludePolicy::Prune);

    std::env::remove_var("FAVSCANTEST_WORKERS");
    std::env::remove_var("FAVSCANTEST_EXCLUDE_POLICY");
}

#[test]
fn test_config_invalid_toml_is_error() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "workers = \"many\"").unwrap();

    let result: Result<Config, _> = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .extract();
    assert!(result.is_err());
}

#[test]
fn test_cli_flags_override_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("favscan.toml");
    fs::write(&config_path, "workers = 8\nmin_size = 1000\n").unwrap();

    let cli = Cli::try_parse_from([
        "favscan",
        "/data",
        "--config",
        config_path.to_str().unwrap(),
        "-w",
        "2",
    ])
    .unwrap();
    let config = Config::load(&cli).unwrap();

    assert_eq!(config.workers, 2);
    assert_eq!(config.min_size, 1000);
}

#[test]
fn test_zero_workers_in_file_is_rejected() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("favscan.toml");
    fs::write(&config_path, "workers = 0\n").unwrap();

    let cli = Cli::try_parse_from([
        "favscan",
        "/data",
        "--config",
        config_path.to_str().unwrap(),
    ])
    .unwrap();

    assert!(matches!(
        Config::load(&cli),
        Err(ConfigError::Invalid {
            field: "workers",
            ..
        })
    ));
}
