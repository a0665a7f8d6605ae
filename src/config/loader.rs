//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{AuthType, BridgeConfig, ConversionFailurePolicy};
use super::secret::secret_string;
use crate::domain::errors::BridgeError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`BridgeConfig`]
/// 4. Applies environment variable overrides (`FHIRBRIDGE_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`BridgeError::Configuration`] if the file cannot be read, a
/// referenced variable is unset, parsing fails or validation fails.
///
/// # Examples
///
/// ```no_run
/// use fhirbridge::config::loader::load_config;
///
/// let config = load_config("fhirbridge.toml")?;
/// println!("FHIR server: {}", config.fhir.base_url);
/// # Ok::<(), fhirbridge::domain::BridgeError>(())
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<BridgeConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(BridgeError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        BridgeError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text, applying substitution, overrides and validation
///
/// [`load_config`] minus the file handling.
pub fn parse_config(contents: &str) -> Result<BridgeConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: BridgeConfig = toml::from_str(&contents)
        .map_err(|e| BridgeError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        BridgeError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are copied untouched. Every unset variable is collected
/// and reported in one error.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| BridgeError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(BridgeError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Reads `FHIRBRIDGE_<NAME>` and parses it, failing on a malformed value
fn env_override<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    let key = format!("FHIRBRIDGE_{name}");
    match std::env::var(&key) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| BridgeError::Configuration(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Applies environment variable overrides using the `FHIRBRIDGE_*` prefix
///
/// Variables follow the pattern `FHIRBRIDGE_<SECTION>_<KEY>`, for example
/// `FHIRBRIDGE_FHIR_BASE_URL` or `FHIRBRIDGE_SYNC_CONVERSION_FAILURE_POLICY`.
fn apply_env_overrides(config: &mut BridgeConfig) -> Result<()> {
    // Application
    if let Some(val) = env_override::<String>("APPLICATION_LOG_LEVEL")? {
        config.application.log_level = val;
    }
    if let Some(val) = env_override::<bool>("APPLICATION_DRY_RUN")? {
        config.application.dry_run = val;
    }

    // FHIR server
    if let Some(val) = env_override::<String>("FHIR_BASE_URL")? {
        config.fhir.base_url = val;
    }
    if let Some(val) = env_override::<AuthType>("FHIR_AUTH_TYPE")? {
        config.fhir.auth_type = val;
    }
    if let Some(val) = env_override::<String>("FHIR_USERNAME")? {
        config.fhir.username = Some(val);
    }
    if let Some(val) = env_override::<String>("FHIR_PASSWORD")? {
        config.fhir.password = Some(secret_string(val));
    }
    if let Some(val) = env_override::<String>("FHIR_TOKEN")? {
        config.fhir.token = Some(secret_string(val));
    }
    if let Some(val) = env_override::<bool>("FHIR_TLS_VERIFY")? {
        config.fhir.tls_verify = val;
    }
    if let Some(val) = env_override::<u64>("FHIR_TIMEOUT_SECONDS")? {
        config.fhir.timeout_seconds = val;
    }
    if let Some(val) = env_override::<String>("FHIR_IDENTIFIER_SYSTEM")? {
        config.fhir.identifier_system = val;
    }
    if let Some(val) = env_override::<String>("FHIR_ORGANIZATION_IDENTIFIER_SYSTEM")? {
        config.fhir.organization_identifier_system = val;
    }
    if let Some(val) = env_override::<usize>("FHIR_PAGE_SIZE")? {
        config.fhir.page_size = val;
    }
    if let Some(val) = env_override::<usize>("FHIR_RETRY_MAX_RETRIES")? {
        config.fhir.retry.max_retries = val;
    }

    // Sync
    if let Some(val) = env_override::<ConversionFailurePolicy>("SYNC_CONVERSION_FAILURE_POLICY")? {
        config.sync.conversion_failure_policy = val;
    }

    // Reference data
    if let Some(val) = env_override::<String>("REFERENCE_CITIZENSHIP_CSV")? {
        config.reference.citizenship_csv = Some(val);
    }

    // Logging
    if let Some(val) = env_override::<bool>("LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = val;
    }
    if let Some(val) = env_override::<String>("LOGGING_LOCAL_PATH")? {
        config.logging.local_path = val;
    }
    if let Some(val) = env_override::<String>("LOGGING_LOCAL_ROTATION")? {
        config.logging.local_rotation = val;
    }

    Ok(())
}

/// Serializes unit tests that read or mutate `FHIRBRIDGE_*` variables
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
