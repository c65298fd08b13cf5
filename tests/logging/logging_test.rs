//! Tests for `src/logging.rs`.

use sift::config::{LogFormat, LoggingConfig};
use sift::logging::{filter_directives, LoggingGuard, LOG_FILE_PREFIX};

#[test]
fn logging_guard_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<LoggingGuard>();
}

#[test]
fn bare_level_quiets_dependencies() {
    assert_eq!(
        filter_directives("debug"),
        "debug,sqlx=warn,hyper=warn,reqwest=warn"
    );
    assert_eq!(
        filter_directives("  "),
        "info,sqlx=warn,hyper=warn,reqwest=warn"
    );
}

#[test]
fn targeted_directives_pass_through() {
    assert_eq!(filter_directives("sift=trace,sqlx=info"), "sift=trace,sqlx=info");
}

#[test]
fn init_installs_file_layer_once() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let logs_dir = tmp.path().join("nested").join("logs");
    assert!(!logs_dir.exists());

    let config = LoggingConfig {
        level: "info".to_owned(),
        dir: Some(logs_dir.clone()),
        console: LogFormat::Json,
    };

    // Only one test may install the global subscriber.
    let guard = sift::logging::init(&config).expect("first init succeeds");
    assert!(guard.is_some(), "file layer returns a guard");
    assert!(logs_dir.exists(), "logs directory should be created");

    tracing::info!(component = "logging_test", "hello");
    drop(guard);
    let written = std::fs::read_dir(&logs_dir)
        .expect("read logs dir")
        .filter_map(Result::ok)
        .any(|entry| entry.file_name().to_string_lossy().starts_with(LOG_FILE_PREFIX));
    assert!(written, "rotated log file should exist");

    assert!(sift::logging::init(&config).is_err(), "second init is refused");
    sift::logging::init_cli("info");
}
