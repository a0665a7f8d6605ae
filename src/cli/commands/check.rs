//! Check command implementation
//!
//! Parses and validates a CSV batch locally. Nothing is sent to the server.

use super::exit_code;
use crate::core::tabular::parse_patients;
use crate::core::validation::validate;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// CSV file with one patient per row
    pub file: PathBuf,
}

impl CheckArgs {
    /// Execute the check command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(file = %self.file.display(), "Checking input");
        println!("🔍 Checking {}", self.file.display());
        println!();

        let bytes = match tokio::fs::read(&self.file).await {
            Ok(b) => b,
            Err(e) => {
                println!("❌ Cannot read {}: {e}", self.file.display());
                return Ok(exit_code::INVALID_INPUT);
            }
        };

        let records = match parse_patients(&bytes) {
            Ok(r) => r,
            Err(e) => {
                println!("❌ Input could not be parsed");
                println!("   Error: {e}");
                return Ok(exit_code::INVALID_INPUT);
            }
        };
        println!("✅ Parsed {} record(s)", records.len());

        let report = validate(&records);
        if report.is_valid() {
            println!("✅ All records are valid");
            return Ok(exit_code::SUCCESS);
        }

        println!("❌ {} violation(s) found:", report.violations.len());
        for violation in &report.violations {
            println!("  - {violation}");
        }
        Ok(exit_code::INVALID_INPUT)
    }
}
