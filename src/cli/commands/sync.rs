//! Sync command implementation
//!
//! Reads a CSV batch and pushes it through the sync pipeline against the
//! configured FHIR server.

use super::{connect_or_report, exit_code, load_or_report};
use crate::adapters::fhir::FhirStore;
use crate::config::ConversionFailurePolicy;
use crate::core::sync::{SyncCoordinator, SyncErrorKind, SyncOptions, SyncReport};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// Errors printed before the list is cut short
const MAX_PRINTED_ERRORS: usize = 20;

/// Arguments for the sync command
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// CSV file with one patient per row
    pub file: PathBuf,

    /// Run every stage except the writes
    #[arg(long)]
    pub dry_run: bool,

    /// Leave out records that fail conversion instead of failing the batch
    #[arg(long)]
    pub skip_invalid_conversions: bool,
}

impl SyncArgs {
    /// Execute the sync command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let mut config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }
        if self.skip_invalid_conversions {
            tracing::info!("Skipping records that fail conversion");
            config.sync.conversion_failure_policy = ConversionFailurePolicy::SkipAndReport;
        }

        let bytes = match tokio::fs::read(&self.file).await {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(file = %self.file.display(), error = %e, "Cannot read input");
                println!("❌ Cannot read {}: {e}", self.file.display());
                return Ok(exit_code::INVALID_INPUT);
            }
        };

        let client = match connect_or_report(&config).await {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };
        let store: Arc<dyn FhirStore> = client;

        if config.application.dry_run {
            println!("🔍 DRY RUN MODE - No data will be written to the FHIR server");
            println!();
        }
        println!("🚀 Syncing {}...", self.file.display());

        let coordinator =
            SyncCoordinator::new(store, SyncOptions::from_config(&config), shutdown_signal);
        let report = coordinator.sync_bytes(&bytes).await;

        print_report(&report);
        Ok(exit_code_for(&report))
    }
}

fn print_report(report: &SyncReport) {
    println!();
    println!("📊 Sync Summary:");
    println!("  Run: {}", report.run_id);
    println!("  Stage Reached: {}", report.stage);
    println!("  Total Records: {}", report.total_records);
    println!("  Created: {}", report.created_count);
    println!("  Updated: {}", report.updated_count);
    println!("  Skipped: {}", report.skipped_count);
    println!("  Duration: {:.2}s", report.duration.as_secs_f64());
    println!("  Success Rate: {:.2}%", report.success_rate());
    println!();

    if !report.errors.is_empty() {
        println!("⚠️  Errors encountered:");
        for error in report.errors.iter().take(MAX_PRINTED_ERRORS) {
            println!("  - {:?}: {}", error.kind, error);
            if let Some(identifier) = &error.identifier {
                println!("    Identifier: {identifier}");
            }
        }
        if report.errors.len() > MAX_PRINTED_ERRORS {
            println!(
                "  ... and {} more errors",
                report.errors.len() - MAX_PRINTED_ERRORS
            );
        }
        println!();
    }

    if report.is_successful() {
        if report.dry_run {
            println!("✅ Dry run completed, nothing was written");
        } else {
            println!("✅ Sync completed successfully!");
        }
    } else if report.has_errors_of(SyncErrorKind::Cancelled) {
        println!("⚠️  Sync interrupted by shutdown signal");
    } else {
        println!("⚠️  Sync completed with errors");
    }
}

/// Rejected input maps to 3, anything else that went wrong to 1
fn exit_code_for(report: &SyncReport) -> i32 {
    if report.is_successful() {
        exit_code::SUCCESS
    } else if report.has_errors_of(SyncErrorKind::Parse)
        || report.has_errors_of(SyncErrorKind::Validation)
    {
        exit_code::INVALID_INPUT
    } else {
        exit_code::COMPLETED_WITH_ERRORS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sync::SyncError;
    use crate::domain::Violation;

    #[test]
    fn test_exit_code_for_clean_report() {
        assert_eq!(exit_code_for(&SyncReport::new(false)), exit_code::SUCCESS);
    }

    #[test]
    fn test_exit_code_for_rejected_input() {
        let mut report = SyncReport::new(false);
        report.add_error(SyncError::validation(&Violation::new(
            1,
            "LastName",
            "'LastName' must not be empty",
        )));
        assert_eq!(exit_code_for(&report), exit_code::INVALID_INPUT);
    }

    #[test]
    fn test_exit_code_for_store_failure() {
        let mut report = SyncReport::new(false);
        report.add_error(SyncError::new(SyncErrorKind::Store, "server unavailable"));
        assert_eq!(exit_code_for(&report), exit_code::COMPLETED_WITH_ERRORS);
    }

    #[tokio::test]
    async fn test_missing_config_is_configuration_error() {
        let (_tx, rx) = watch::channel(false);
        let args = SyncArgs {
            file: PathBuf::from("patients.csv"),
            dry_run: false,
            skip_invalid_conversions: false,
        };
        let code = args.execute("/nonexistent/fhirbridge.toml", rx).await.unwrap();
        assert_eq!(code, exit_code::CONFIGURATION);
    }
}
