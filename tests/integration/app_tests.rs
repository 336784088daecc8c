use clap::Parser;
use favscan::cli::Cli;
use favscan::error::ExitCode;
use favscan::run_app;
use std::fs::{self, File};
use tempfile::tempdir;

fn cli(args: &[&str]) -> Cli {
    let mut argv = vec!["favscan"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

#[test]
fn test_run_app_against_memory_cache() {
    let dir = tempfile::Builder::new().prefix("favscan").tempdir().unwrap();
    let root = dir.path();
    File::create(root.join("big.iso"))
        .unwrap()
        .set_len(3 * 1024 * 1024)
        .unwrap();
    File::create(root.join("skip.tmp"))
        .unwrap()
        .set_len(3 * 1024 * 1024)
        .unwrap();
    fs::write(root.join("exclude_patterns.txt"), "*.tmp\n").unwrap();

    let code = run_app(cli(&[
        root.to_str().unwrap(),
        "--cache-url",
        "memory://",
        "--min-size",
        "1MiB",
        "--no-progress",
        "-q",
    ]))
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    assert_eq!(
        fs::read_to_string(root.join("fav.log")).unwrap(),
        "3145728,\"./big.iso\"\n"
    );
    assert_eq!(
        fs::read_to_string(root.join("fav.log.sort"))
            .unwrap()
            .lines()
            .count(),
        1
    );
}

#[test]
fn test_run_app_missing_root_is_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing");

    let result = run_app(cli(&[
        missing.to_str().unwrap(),
        "--cache-url",
        "memory://",
        "-q",
    ]));

    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("Path not found"));
}

#[test]
fn test_run_app_unreadable_exclude_file_is_error() {
    let dir = tempdir().unwrap();
    // A directory cannot be read as a pattern file
    let not_a_file = dir.path().join("patterns");
    fs::create_dir(&not_a_file).unwrap();

    let result = run_app(cli(&[
        dir.path().to_str().unwrap(),
        "--cache-url",
        "memory://",
        "--exclude-file",
        not_a_file.to_str().unwrap(),
        "-q",
    ]));

    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("Failed to load exclude patterns"));
}

#[test]
fn test_run_app_unreachable_cache_is_error() {
    let dir = tempdir().unwrap();

    let result = run_app(cli(&[
        dir.path().to_str().unwrap(),
        "--cache-url",
        "redis://127.0.0.1:1/",
        "-q",
    ]));

    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("Error connecting to cache"));
}

#[test]
fn test_run_app_report_failure_exit_code() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("fav.log")).unwrap();

    let code = run_app(cli(&[
        dir.path().to_str().unwrap(),
        "--cache-url",
        "memory://",
        "--no-progress",
        "-q",
    ]))
    .unwrap();

    assert_eq!(code, ExitCode::GeneralError);
}
