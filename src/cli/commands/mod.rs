//! CLI command implementations

pub mod check;
pub mod init;
pub mod medications;
pub mod observations;
pub mod organization;
pub mod patient;
pub mod sync;
pub mod validate;

use crate::adapters::fhir::FhirClient;
use crate::config::{load_config, BridgeConfig};
use crate::core::reference::CitizenshipTable;
use std::path::Path;
use std::sync::Arc;

/// Process exit codes
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    /// Finished, but with errors (or the requested resource was not found)
    pub const COMPLETED_WITH_ERRORS: i32 = 1;
    pub const CONFIGURATION: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
    pub const CONNECTION: i32 = 4;
    pub const FATAL: i32 = 5;
}

/// Load configuration, printing the failure and mapping it to an exit code
pub(crate) fn load_or_report(config_path: &str) -> Result<BridgeConfig, i32> {
    load_config(config_path).map_err(|e| {
        crate::log_error_with_context!(&e, "Failed to load configuration");
        println!("❌ Failed to load configuration: {e}");
        exit_code::CONFIGURATION
    })
}

/// Build the FHIR client and check that the server answers
pub(crate) async fn connect_or_report(config: &BridgeConfig) -> Result<Arc<FhirClient>, i32> {
    let client = FhirClient::new(config.fhir.clone()).map_err(|e| {
        crate::log_error_with_context!(&e, "Failed to create FHIR client");
        println!("❌ Failed to create FHIR client: {e}");
        exit_code::CONFIGURATION
    })?;

    if let Err(e) = client.check_connection().await {
        crate::log_error_with_context!(&e, "FHIR server is not reachable");
        println!("❌ Cannot reach FHIR server at {}: {e}", client.base_url());
        return Err(exit_code::CONNECTION);
    }

    Ok(Arc::new(client))
}

/// Load the citizenship table named in configuration, or the bundled one
pub(crate) fn citizenships_or_report(config: &BridgeConfig) -> Result<Arc<CitizenshipTable>, i32> {
    let path = config.reference.citizenship_csv.as_deref().map(Path::new);
    CitizenshipTable::load(path).map(Arc::new).map_err(|e| {
        crate::log_error_with_context!(&e, "Failed to load citizenship table");
        println!("❌ Failed to load citizenship table: {e}");
        exit_code::CONFIGURATION
    })
}

/// Print a value as pretty JSON
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
