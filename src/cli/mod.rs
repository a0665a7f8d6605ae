//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for FhirBridge using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// FhirBridge - FHIR R4 Resource Normalization & Sync
#[derive(Parser, Debug)]
#[command(name = "fhirbridge")]
#[command(version, about, long_about = None)]
#[command(author = "FhirBridge Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "fhirbridge.toml", env = "FHIRBRIDGE_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "FHIRBRIDGE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync a CSV batch of patients to the FHIR server
    Sync(commands::sync::SyncArgs),

    /// Parse and validate a CSV batch without contacting the server
    Check(commands::check::CheckArgs),

    /// Look up patients
    #[command(subcommand)]
    Patient(commands::patient::PatientCommand),

    /// List or add blood count observations
    #[command(subcommand)]
    Observations(commands::observations::ObservationsCommand),

    /// List the medications of a patient
    #[command(subcommand)]
    Medications(commands::medications::MedicationsCommand),

    /// Add or look up organizations
    #[command(subcommand)]
    Organization(commands::organization::OrganizationCommand),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

impl Commands {
    /// Whether the command needs the file logging from configuration
    pub fn uses_config(&self) -> bool {
        !matches!(self, Commands::Check(_) | Commands::Init(_))
    }
}
