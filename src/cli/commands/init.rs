//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use super::exit_code;
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "fhirbridge.toml")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing FhirBridge configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(exit_code::CONFIGURATION);
        }

        match fs::write(&self.output, Self::sample_config()) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your FHIR server URL", self.output);
                println!("  2. Create a .env file with your credentials:");
                println!("     - Set FHIRBRIDGE_FHIR_USERNAME and FHIRBRIDGE_FHIR_PASSWORD");
                println!("     - or FHIRBRIDGE_FHIR_TOKEN for bearer authentication");
                println!("  3. Validate configuration: fhirbridge validate-config");
                println!("  4. Check a batch: fhirbridge check patients.csv");
                println!("  5. Sync it: fhirbridge sync patients.csv");
                println!();
                Ok(exit_code::SUCCESS)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(exit_code::FATAL)
            }
        }
    }

    fn sample_config() -> &'static str {
        r#"# FhirBridge Configuration File
#
# Values of the form ${VAR} are read from the environment (or .env).
# Any key can also be overridden with FHIRBRIDGE_<SECTION>_<KEY>,
# e.g. FHIRBRIDGE_FHIR_BASE_URL.

# development | staging | production
environment = "development"

[application]
# trace, debug, info, warn, error
log_level = "info"

# Run every sync stage except the writes
dry_run = false

[fhir]
base_url = "http://localhost:8080/fhir"

# none | basic | bearer
auth_type = "none"
# username = "${FHIRBRIDGE_FHIR_USERNAME}"
# password = "${FHIRBRIDGE_FHIR_PASSWORD}"
# token = "${FHIRBRIDGE_FHIR_TOKEN}"

# Must stay true in production
tls_verify = true
timeout_seconds = 30

# System of the business identifier on Patient resources
identifier_system = "urn:fhirbridge:patient-identifier"

# System of the business identifier on Organization resources
organization_identifier_system = "urn:fhirbridge:organization-identifier"

# Default page size for `fhirbridge patient list` (1-1000)
page_size = 10

[fhir.retry]
# Only transient failures (429, 5xx, timeouts) are retried. Creates are
# resent only on 429 or when no connection could be opened.
max_retries = 3
initial_delay_ms = 500
max_delay_ms = 10000
backoff_multiplier = 2.0

[sync]
# fail_batch: abort before any write if a record fails conversion
# skip_and_report: write the rest and report the failures
conversion_failure_policy = "fail_batch"

[reference]
# CSV with Code,Explanation,From,Through columns replacing the bundled table
# citizenship_csv = "./citizenship.csv"

[logging]
local_enabled = false
local_path = "./logs"
# daily | hourly | never
local_rotation = "daily"
"#
    }
}
