//! Integration tests for configuration loading and validation
//!
//! Tests that touch `FHIRBRIDGE_*` variables hold `ENV_MUTEX`.

use fhirbridge::config::{load_config, AuthType, ConversionFailurePolicy, Environment};
use fhirbridge::domain::BridgeError;
use secrecy::ExposeSecret;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn cleanup_env_vars() {
    for name in [
        "FHIRBRIDGE_APPLICATION_LOG_LEVEL",
        "FHIRBRIDGE_APPLICATION_DRY_RUN",
        "FHIRBRIDGE_FHIR_BASE_URL",
        "FHIRBRIDGE_FHIR_PAGE_SIZE",
        "FHIRBRIDGE_SYNC_CONVERSION_FAILURE_POLICY",
        "TEST_FHIR_PASSWORD",
    ] {
        std::env::remove_var(name);
    }
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_complete_config() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config(
        r#"
environment = "staging"

[application]
log_level = "debug"
dry_run = true

[fhir]
base_url = "https://fhir.example.com/fhir/"
auth_type = "basic"
username = "bridge"
password = "secret"
tls_verify = true
timeout_seconds = 45
identifier_system = "https://hospital.example.org/patients"
page_size = 50

[fhir.retry]
max_retries = 5
initial_delay_ms = 200
max_delay_ms = 4000
backoff_multiplier = 1.5

[sync]
conversion_failure_policy = "skip_and_report"

[logging]
local_enabled = false
local_path = "/tmp/fhirbridge"
local_rotation = "hourly"
"#,
    );

    let config = load_config(file.path()).unwrap();

    assert_eq!(config.environment, Environment::Staging);
    assert_eq!(config.application.log_level, "debug");
    assert!(config.application.dry_run);
    assert_eq!(config.fhir.auth_type, AuthType::Basic);
    assert_eq!(config.fhir.username.as_deref(), Some("bridge"));
    assert_eq!(
        config.fhir.password.as_ref().unwrap().expose_secret().as_str(),
        "secret"
    );
    assert_eq!(config.fhir.timeout_seconds, 45);
    assert_eq!(config.fhir.page_size, 50);
    assert_eq!(config.fhir.retry.max_retries, 5);
    assert_eq!(
        config.sync.conversion_failure_policy,
        ConversionFailurePolicy::SkipAndReport
    );
    assert_eq!(config.logging.local_rotation, "hourly");
}

#[test]
fn test_minimal_config_uses_defaults() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config("[fhir]\nbase_url = \"http://localhost:8080/fhir\"\n");
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.environment, Environment::Development);
    assert_eq!(config.fhir.auth_type, AuthType::None);
    assert!(config.fhir.tls_verify);
    assert_eq!(config.fhir.page_size, 10);
    assert_eq!(
        config.sync.conversion_failure_policy,
        ConversionFailurePolicy::FailBatch
    );
    assert!(config.reference.citizenship_csv.is_none());
    assert!(!config.logging.local_enabled);
}

#[test]
fn test_env_substitution_and_overrides() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("TEST_FHIR_PASSWORD", "from-env");
    std::env::set_var("FHIRBRIDGE_FHIR_PAGE_SIZE", "25");
    std::env::set_var("FHIRBRIDGE_SYNC_CONVERSION_FAILURE_POLICY", "skip-and-report");

    let file = write_config(
        r#"
[fhir]
base_url = "https://fhir.example.com/fhir"
auth_type = "basic"
username = "bridge"
password = "${TEST_FHIR_PASSWORD}"
"#,
    );
    let result = load_config(file.path());
    cleanup_env_vars();

    let config = result.unwrap();
    assert_eq!(
        config.fhir.password.as_ref().unwrap().expose_secret().as_str(),
        "from-env"
    );
    assert_eq!(config.fhir.page_size, 25);
    assert_eq!(
        config.sync.conversion_failure_policy,
        ConversionFailurePolicy::SkipAndReport
    );
}

#[test]
fn test_missing_substitution_variable() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config(
        "[fhir]\nbase_url = \"https://fhir.example.com/fhir\"\nauth_type = \"basic\"\nusername = \"u\"\npassword = \"${TEST_FHIR_PASSWORD}\"\n",
    );

    match load_config(file.path()) {
        Err(BridgeError::Configuration(message)) => {
            assert!(message.contains("TEST_FHIR_PASSWORD"), "{message}")
        }
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn test_production_requires_tls_verification() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config(
        "environment = \"production\"\n[fhir]\nbase_url = \"https://fhir.example.com/fhir\"\ntls_verify = false\n",
    );
    assert!(matches!(
        load_config(file.path()),
        Err(BridgeError::Configuration(_))
    ));
}

#[test]
fn test_basic_auth_requires_credentials() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config(
        "[fhir]\nbase_url = \"https://fhir.example.com/fhir\"\nauth_type = \"basic\"\n",
    );
    assert!(load_config(file.path()).is_err());
}

#[test]
fn test_missing_file() {
    assert!(matches!(
        load_config("/nonexistent/fhirbridge.toml"),
        Err(BridgeError::Configuration(_))
    ));
}
