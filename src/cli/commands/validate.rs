//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the FhirBridge configuration file.

use super::exit_code;
use crate::config::{load_config, AuthType};
use crate::core::reference::CitizenshipTable;
use clap::Args;
use std::path::Path;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    ///
    /// Loading already validates, so a loaded file is a valid one.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration is valid");
                c
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(exit_code::CONFIGURATION);
            }
        };

        let citizenship_source = config
            .reference
            .citizenship_csv
            .as_deref()
            .unwrap_or("bundled");
        let citizenships =
            match CitizenshipTable::load(config.reference.citizenship_csv.as_deref().map(Path::new))
            {
                Ok(t) => t,
                Err(e) => {
                    println!("❌ Citizenship table could not be loaded");
                    println!("   Error: {e}");
                    return Ok(exit_code::CONFIGURATION);
                }
            };

        println!();
        println!("Configuration Summary:");
        println!("  Environment: {:?}", config.environment);
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!("  FHIR Server: {}", config.fhir.base_url);
        println!("  Auth Type: {}", config.fhir.auth_type);
        if config.fhir.auth_type == AuthType::Basic {
            println!(
                "  Username: {}",
                config.fhir.username.as_deref().unwrap_or("<unset>")
            );
        }
        println!("  TLS Verify: {}", config.fhir.tls_verify);
        println!("  Timeout: {}s", config.fhir.timeout_seconds);
        println!("  Identifier System: {}", config.fhir.identifier_system);
        println!("  Page Size: {}", config.fhir.page_size);
        println!("  Max Retries: {}", config.fhir.retry.max_retries);
        println!(
            "  Conversion Failures: {}",
            config.sync.conversion_failure_policy
        );
        println!(
            "  Citizenship Table: {} ({} codes)",
            citizenship_source,
            citizenships.len()
        );
        println!(
            "  File Logging: {}",
            if config.logging.local_enabled {
                format!("{} ({})", config.logging.local_path, config.logging.local_rotation)
            } else {
                "disabled".to_string()
            }
        );
        println!();
        Ok(exit_code::SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::ENV_LOCK;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_valid_file() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[fhir]\nbase_url = \"http://localhost:8080/fhir\"").unwrap();

        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, exit_code::SUCCESS);
    }

    #[tokio::test]
    async fn test_invalid_file() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[fhir]\nbase_url = \"ftp://localhost/fhir\"").unwrap();

        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, exit_code::CONFIGURATION);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let code = ValidateArgs {}
            .execute("/nonexistent/fhirbridge.toml")
            .await
            .unwrap();
        assert_eq!(code, exit_code::CONFIGURATION);
    }
}
