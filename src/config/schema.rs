//! Configuration schema types
//!
//! This module defines the configuration structure that maps to `fhirbridge.toml`.

use crate::config::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Runtime environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment
    #[default]
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    Production,
}

/// Main FhirBridge configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: Environment,

    /// FHIR server configuration
    pub fhir: FhirConfig,

    /// Sync pipeline settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Reference data sources
    #[serde(default)]
    pub reference: ReferenceConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.fhir.validate(&self.environment)?;
        self.reference.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (reconcile and convert, but don't write to the FHIR server)
    #[serde(default)]
    pub dry_run: bool,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_retries > 10 {
            return Err("fhir.retry.max_retries must be <= 10".to_string());
        }
        if self.backoff_multiplier < 1.0 {
            return Err("fhir.retry.backoff_multiplier must be >= 1.0".to_string());
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err("fhir.retry.initial_delay_ms must be <= max_delay_ms".to_string());
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// How the client authenticates against the FHIR server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    /// Anonymous access
    #[default]
    None,
    /// HTTP Basic with `username` and `password`
    Basic,
    /// Static bearer `token`
    Bearer,
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthType::None => write!(f, "none"),
            AuthType::Basic => write!(f, "basic"),
            AuthType::Bearer => write!(f, "bearer"),
        }
    }
}

impl FromStr for AuthType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(AuthType::None),
            "basic" => Ok(AuthType::Basic),
            "bearer" => Ok(AuthType::Bearer),
            other => Err(format!(
                "Invalid auth_type '{other}'. Must be one of: none, basic, bearer"
            )),
        }
    }
}

/// FHIR server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FhirConfig {
    /// Base URL of the FHIR R4 endpoint, e.g. `https://fhir.example.com/fhir`
    pub base_url: String,

    /// Authentication type
    #[serde(default)]
    pub auth_type: AuthType,

    /// Username for basic authentication
    #[serde(default)]
    pub username: Option<String>,

    /// Password for basic authentication
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub password: Option<SecretString>,

    /// Token for bearer authentication
    #[serde(default)]
    pub token: Option<SecretString>,

    /// TLS certificate verification enabled
    ///
    /// **SECURITY WARNING**: Disabling TLS verification exposes the application to
    /// man-in-the-middle attacks. It is rejected in production environments.
    #[serde(default = "default_true")]
    pub tls_verify: bool,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// System URI of the business identifier written to and searched on Patients
    #[serde(default = "default_identifier_system")]
    pub identifier_system: String,

    /// System URI of the business identifier on Organizations
    #[serde(default = "default_organization_identifier_system")]
    pub organization_identifier_system: String,

    /// Default page size for patient listings
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,
}

impl FhirConfig {
    fn validate(&self, environment: &Environment) -> Result<(), String> {
        use secrecy::ExposeSecret;

        if self.base_url.is_empty() {
            return Err("fhir.base_url cannot be empty".to_string());
        }

        match url::Url::parse(&self.base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(_) => {
                return Err("fhir.base_url must start with http:// or https://".to_string());
            }
            Err(e) => return Err(format!("fhir.base_url is not a valid URL: {e}")),
        }

        let blank = |s: &Option<SecretString>| {
            s.as_ref()
                .map(|s| s.expose_secret().is_empty())
                .unwrap_or(true)
        };

        match self.auth_type {
            AuthType::None => {}
            AuthType::Basic => {
                if self.username.as_ref().map(|s| s.is_empty()).unwrap_or(true) {
                    return Err(
                        "fhir.username cannot be empty when auth_type is 'basic'".to_string()
                    );
                }
                if blank(&self.password) {
                    return Err(
                        "fhir.password cannot be empty when auth_type is 'basic'".to_string()
                    );
                }
            }
            AuthType::Bearer => {
                if blank(&self.token) {
                    return Err("fhir.token cannot be empty when auth_type is 'bearer'".to_string());
                }
            }
        }

        if self.timeout_seconds == 0 {
            return Err("fhir.timeout_seconds must be > 0".to_string());
        }

        if self.identifier_system.trim().is_empty() {
            return Err("fhir.identifier_system cannot be empty".to_string());
        }

        if self.organization_identifier_system.trim().is_empty() {
            return Err("fhir.organization_identifier_system cannot be empty".to_string());
        }

        if self.page_size == 0 || self.page_size > 1000 {
            return Err("fhir.page_size must be between 1 and 1000".to_string());
        }

        if *environment == Environment::Production && !self.tls_verify {
            return Err(
                "TLS certificate verification cannot be disabled in production environments. \
                Set 'tls_verify = true', or use 'environment = \"development\"' or \
                'environment = \"staging\"' for test servers."
                    .to_string(),
            );
        }

        self.retry.validate()?;
        Ok(())
    }
}

impl Default for FhirConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/fhir".to_string(),
            auth_type: AuthType::None,
            username: None,
            password: None,
            token: None,
            tls_verify: true,
            timeout_seconds: default_timeout_seconds(),
            identifier_system: default_identifier_system(),
            organization_identifier_system: default_organization_identifier_system(),
            page_size: default_page_size(),
            retry: RetryConfig::default(),
        }
    }
}

/// Sync pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// What to do when a record fails to convert: `fail_batch` or `skip_and_report`
    #[serde(default)]
    pub conversion_failure_policy: ConversionFailurePolicy,
}

/// Batch fate when a single record fails conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversionFailurePolicy {
    /// Abort the whole batch before any write
    #[default]
    FailBatch,
    /// Report the failing records and write the rest
    SkipAndReport,
}

impl fmt::Display for ConversionFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionFailurePolicy::FailBatch => write!(f, "fail_batch"),
            ConversionFailurePolicy::SkipAndReport => write!(f, "skip_and_report"),
        }
    }
}

impl FromStr for ConversionFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "fail_batch" => Ok(ConversionFailurePolicy::FailBatch),
            "skip_and_report" => Ok(ConversionFailurePolicy::SkipAndReport),
            other => Err(format!(
                "Invalid conversion_failure_policy '{other}'. Must be one of: fail_batch, skip_and_report"
            )),
        }
    }
}

/// Reference data configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// Optional CSV replacing the bundled citizenship table
    #[serde(default)]
    pub citizenship_csv: Option<String>,
}

impl ReferenceConfig {
    fn validate(&self) -> Result<(), String> {
        if let Some(path) = &self.citizenship_csv {
            if path.trim().is_empty() {
                return Err("reference.citizenship_csv cannot be empty when set".to_string());
            }
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local JSON file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_identifier_system() -> String {
    crate::core::transform::DEFAULT_IDENTIFIER_SYSTEM.to_string()
}

fn default_organization_identifier_system() -> String {
    crate::core::transform::DEFAULT_ORGANIZATION_IDENTIFIER_SYSTEM.to_string()
}

fn default_page_size() -> usize {
    10
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    10000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_retries() -> usize {
    3
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret::secret_string;

    fn basic_fhir() -> FhirConfig {
        FhirConfig {
            base_url: "https://fhir.example.com/fhir".to_string(),
            auth_type: AuthType::Basic,
            username: Some("user".to_string()),
            password: Some(secret_string("pass".to_string())),
            ..Default::default()
        }
    }

    #[test]
    fn test_application_config_validation() {
        let mut config = ApplicationConfig::default();
        assert!(config.validate().is_ok());

        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fhir_config_validation() {
        let config = basic_fhir();
        assert!(config.validate(&Environment::Development).is_ok());
        assert!(config.validate(&Environment::Production).is_ok());
    }

    #[test]
    fn test_fhir_rejects_non_http_base_url() {
        let config = FhirConfig {
            base_url: "ftp://fhir.example.com".to_string(),
            ..Default::default()
        };
        let err = config.validate(&Environment::Development).unwrap_err();
        assert!(err.contains("http:// or https://"));

        let config = FhirConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.validate(&Environment::Development).is_err());
    }

    #[test]
    fn test_basic_auth_requires_credentials() {
        let mut config = basic_fhir();
        config.password = None;
        let err = config.validate(&Environment::Development).unwrap_err();
        assert!(err.contains("fhir.password"));

        config.password = Some(secret_string(String::new()));
        assert!(config.validate(&Environment::Development).is_err());

        config.password = Some(secret_string("pass".to_string()));
        config.username = None;
        let err = config.validate(&Environment::Development).unwrap_err();
        assert!(err.contains("fhir.username"));
    }

    #[test]
    fn test_bearer_auth_requires_token() {
        let mut config = FhirConfig {
            auth_type: AuthType::Bearer,
            ..Default::default()
        };
        assert!(config.validate(&Environment::Development).is_err());

        config.token = Some(secret_string("abc".to_string()));
        assert!(config.validate(&Environment::Development).is_ok());
    }

    #[test]
    fn test_tls_verification_in_production() {
        let config = FhirConfig {
            tls_verify: false,
            ..basic_fhir()
        };

        let result = config.validate(&Environment::Production);
        assert!(result
            .unwrap_err()
            .contains("TLS certificate verification cannot be disabled in production"));

        assert!(config.validate(&Environment::Development).is_ok());
        assert!(config.validate(&Environment::Staging).is_ok());
    }

    #[test]
    fn test_page_size_bounds() {
        let mut config = FhirConfig::default();
        config.page_size = 0;
        assert!(config.validate(&Environment::Development).is_err());
        config.page_size = 1001;
        assert!(config.validate(&Environment::Development).is_err());
        config.page_size = 50;
        assert!(config.validate(&Environment::Development).is_ok());
    }

    #[test]
    fn test_retry_validation() {
        let mut retry = RetryConfig::default();
        assert!(retry.validate().is_ok());

        retry.max_retries = 11;
        assert!(retry.validate().is_err());

        retry.max_retries = 3;
        retry.backoff_multiplier = 0.5;
        assert!(retry.validate().is_err());

        retry.backoff_multiplier = 2.0;
        retry.initial_delay_ms = 20000;
        assert!(retry.validate().is_err());
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "fail_batch".parse::<ConversionFailurePolicy>().unwrap(),
            ConversionFailurePolicy::FailBatch
        );
        assert_eq!(
            "skip-and-report".parse::<ConversionFailurePolicy>().unwrap(),
            ConversionFailurePolicy::SkipAndReport
        );
        assert!("ignore".parse::<ConversionFailurePolicy>().is_err());
        assert_eq!(ConversionFailurePolicy::default(), ConversionFailurePolicy::FailBatch);
    }

    #[test]
    fn test_auth_type_from_str() {
        assert_eq!("BASIC".parse::<AuthType>().unwrap(), AuthType::Basic);
        assert_eq!(AuthType::Bearer.to_string(), "bearer");
        assert!("openid".parse::<AuthType>().is_err());
    }

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert!(!config.local_enabled);
        assert_eq!(config.local_path, "./logs");
        assert_eq!(config.local_rotation, "daily");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_logging_rejects_unknown_rotation() {
        let config = LoggingConfig {
            local_rotation: "size".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_log_level(), "info");
        assert_eq!(default_page_size(), 10);
        assert_eq!(default_max_retries(), 3);
        assert_eq!(
            default_identifier_system(),
            "urn:fhirbridge:patient-identifier"
        );
        assert_eq!(
            default_organization_identifier_system(),
            "urn:fhirbridge:organization-identifier"
        );
    }

    #[test]
    fn test_blank_organization_identifier_system_rejected() {
        let config = FhirConfig {
            organization_identifier_system: " ".to_string(),
            ..Default::default()
        };
        assert!(config.validate(&Environment::Development).is_err());
    }
}
