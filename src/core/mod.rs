//! Core business logic for FhirBridge.
//!
//! # Modules
//!
//! - [`tabular`] - CSV batches into typed records
//! - [`validation`] - Row rules and aggregated violations
//! - [`reference`] - Citizenship code table
//! - [`transform`] - Conversions between flat records and FHIR resources
//! - [`reconcile`] - Partition of a batch into new and existing records
//! - [`sync`] - Batch pipeline orchestration and reporting
//! - [`service`] - Single-record patient, observation, medication and organization operations
//!
//! # Sync Workflow
//!
//! 1. **Parse**: Read the CSV batch; any malformed row fails the whole batch
//! 2. **Validate**: Check every row, collecting all violations
//! 3. **Reconcile**: Look up each identifier once, concurrently
//! 4. **Convert**: Build Patient resources for new and existing records
//! 5. **Write**: Create and update concurrently
//! 6. **Report**: Return counts and every error with the stage reached
//!
//! # Example
//!
//! ```rust,no_run
//! use fhirbridge::adapters::fhir::{FhirClient, FhirStore};
//! use fhirbridge::config::load_config;
//! use fhirbridge::core::sync::{SyncCoordinator, SyncOptions};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("fhirbridge.toml")?;
//! let store: Arc<dyn FhirStore> = Arc::new(FhirClient::new(config.fhir.clone())?);
//!
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let coordinator = SyncCoordinator::new(store, SyncOptions::from_config(&config), shutdown_rx);
//!
//! let report = coordinator.sync_bytes(&std::fs::read("patients.csv")?).await;
//! println!("Created: {}", report.created_count);
//! println!("Updated: {}", report.updated_count);
//! println!("Errors: {}", report.errors.len());
//! # Ok(())
//! # }
//! ```

pub mod reconcile;
pub mod reference;
pub mod service;
pub mod sync;
pub mod tabular;
pub mod transform;
pub mod validation;
