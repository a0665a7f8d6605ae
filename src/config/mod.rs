//! Configuration management for FhirBridge.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! FhirBridge uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `FHIRBRIDGE_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fhirbridge::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("fhirbridge.toml")?;
//!
//! println!("FHIR server: {}", config.fhir.base_url);
//! println!("Conversion failures: {}", config.sync.conversion_failure_policy);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and dry-run default
//! - [`FhirConfig`] - FHIR server connection, authentication and retries
//! - [`SyncConfig`] - Batch behaviour when a record fails conversion
//! - [`ReferenceConfig`] - Reference data overrides
//! - [`LoggingConfig`] - Local JSON log files
//!
//! # Example Configuration
//!
//! ```toml
//! environment = "production"
//!
//! [application]
//! log_level = "info"
//!
//! [fhir]
//! base_url = "https://fhir.example.com/fhir"
//! auth_type = "bearer"
//! token = "${FHIR_TOKEN}"
//! identifier_system = "urn:oid:2.16.840.1.113883.2.9.4.3.2"
//!
//! [sync]
//! conversion_failure_policy = "fail_batch"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, AuthType, BridgeConfig, ConversionFailurePolicy, Environment, FhirConfig,
    LoggingConfig, ReferenceConfig, RetryConfig, SyncConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
