// Configuration file loading tests
// Author: kelexine (https://github.com/kelexine)

use docsearch_cache::config::AppConfig;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;
use tokio_test::{assert_err, assert_ok};

// Every test here reads the process environment through `load_from`.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn env_lock() -> MutexGuard<'static, ()> {
    ENV_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct EnvVarGuard {
    key: &'static str,
    previous: Option<String>,
}

impl EnvVarGuard {
    fn set(key: &'static str, value: &str) -> Self {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value);
        Self { key, previous }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        match self.previous.as_deref() {
            Some(value) => std::env::set_var(self.key, value),
            None => std::env::remove_var(self.key),
        }
    }
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let _lock = env_lock();
    let file = write_config(
        r#"
[server]
port = 9090

[search]
api_url = "https://search.example.com/v1/query"
api_key = "file-key"
max_page_size = 10

[cache]
ttl_seconds = 60
fuzzy_threshold = 80.0
max_entries = 1000

[model_retry]
max_retries = 4
retryable_finish_reasons = ["MALFORMED_FUNCTION_CALL", "BAD_JSON"]
"#,
    );

    let config = assert_ok!(AppConfig::load_from(Some(file.path())));

    assert_eq!(config.server.port, 9090);
    assert_eq!(config.search.api_url, "https://search.example.com/v1/query");
    assert_eq!(config.search.max_page_size, 10);
    assert_eq!(config.search.default_page_size, 5);
    assert_eq!(config.cache.ttl_seconds, 60);
    assert_eq!(config.cache.fuzzy_threshold, 80.0);
    assert_eq!(config.cache.max_entries, 1000);
    assert_eq!(config.cache.fuzzy_scan_limit, 500);
    assert_eq!(config.model_retry.max_retries, 4);
    assert_eq!(config.model_retry.retryable_finish_reasons.len(), 2);
}

#[test]
fn test_invalid_file_values_rejected() {
    let _lock = env_lock();
    let file = write_config(
        r#"
[cache]
fuzzy_threshold = 150.0
"#,
    );

    assert_err!(AppConfig::load_from(Some(file.path())));
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let _lock = env_lock();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    assert_err!(AppConfig::load_from(Some(&path)));
}

#[test]
fn test_env_overrides_file() {
    let _lock = env_lock();
    let file = write_config(
        r#"
[cache]
ttl_seconds = 10
fuzzy_threshold = 60.0
max_entries = 100
"#,
    );

    let _ttl = EnvVarGuard::set("CACHE_TTL_SECONDS", "42");
    let _threshold = EnvVarGuard::set("FUZZY_THRESHOLD", "80");
    let _entries = EnvVarGuard::set("DOCSEARCH__CACHE__MAX_ENTRIES", "7");
    let _scan = EnvVarGuard::set("DOCSEARCH__CACHE__FUZZY_SCAN_LIMIT", "50");

    let config = assert_ok!(AppConfig::load_from(Some(file.path())));

    assert_eq!(config.cache.ttl_seconds, 42);
    assert_eq!(config.cache.fuzzy_threshold, 80.0);
    assert_eq!(config.cache.max_entries, 7);
    assert_eq!(config.cache.fuzzy_scan_limit, 50);
}

#[test]
fn test_flat_env_beats_prefixed_env() {
    let _lock = env_lock();
    let file = write_config("");

    let _prefixed = EnvVarGuard::set("DOCSEARCH__CACHE__TTL_SECONDS", "5");
    let _flat = EnvVarGuard::set("CACHE_TTL_SECONDS", "9");

    let config = assert_ok!(AppConfig::load_from(Some(file.path())));
    assert_eq!(config.cache.ttl_seconds, 9);
}

#[test]
fn test_retry_env_overrides() {
    let _lock = env_lock();
    let file = write_config("");

    let _fetch = EnvVarGuard::set("MAX_RETRIES", "5");
    let _model = EnvVarGuard::set("MODEL_MAX_RETRIES", "4");
    let _delay = EnvVarGuard::set("MODEL_INITIAL_DELAY_MS", "250");
    let _factor = EnvVarGuard::set("MODEL_BACKOFF_FACTOR", "3.0");

    let config = assert_ok!(AppConfig::load_from(Some(file.path())));

    assert_eq!(config.retry.max_retries, 5);
    assert_eq!(config.model_retry.max_retries, 4);
    assert_eq!(config.model_retry.initial_delay_ms, 250);
    assert_eq!(config.model_retry.backoff_factor, 3.0);
}

#[test]
fn test_invalid_env_value_rejected() {
    let _lock = env_lock();
    let file = write_config("");

    let _threshold = EnvVarGuard::set("FUZZY_THRESHOLD", "250");

    assert_err!(AppConfig::load_from(Some(file.path())));
}
