// FhirBridge - FHIR R4 Resource Normalization & Sync
// Copyright (c) 2025 FhirBridge Contributors
// Licensed under the MIT License

//! # FhirBridge - FHIR R4 Resource Normalization & Sync
//!
//! FhirBridge turns flat patient rows into FHIR R4 resources, reconciles them
//! against what a FHIR server already holds and writes the difference back.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Parsing** CSV batches of patient rows
//! - **Validating** every row and collecting all violations
//! - **Converting** between flat records and FHIR Patient/Observation resources
//! - **Reconciling** a batch against the server by business identifier
//! - **Syncing** the result with concurrent creates and updates
//! - **Single-record operations** on patients, observations, medications and
//!   organizations
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (parsing, validation, conversion, sync)
//! - [`adapters`] - External integrations (FHIR REST server)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fhirbridge::adapters::fhir::{FhirClient, FhirStore};
//! use fhirbridge::config::load_config;
//! use fhirbridge::core::sync::{SyncCoordinator, SyncOptions};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("fhirbridge.toml")?;
//!     let client = FhirClient::new(config.fhir.clone())?;
//!     client.check_connection().await?;
//!
//!     let store: Arc<dyn FhirStore> = Arc::new(client);
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!     let coordinator = SyncCoordinator::new(store, SyncOptions::from_config(&config), shutdown_rx);
//!
//!     let report = coordinator.sync_bytes(&std::fs::read("patients.csv")?).await;
//!     println!("Created {}, updated {}", report.created_count, report.updated_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Conversions
//!
//! Conversions are pure functions and can be used without a server:
//!
//! ```rust
//! use chrono::NaiveDate;
//! use fhirbridge::core::transform::record_to_patient;
//! use fhirbridge::domain::PatientRecord;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let record = PatientRecord::new("PAT0001", "Anna", "Meyer", NaiveDate::from_ymd_opt(1980, 4, 12).unwrap())
//!     .with_gender("female");
//! let patient = record_to_patient(&record, "urn:fhirbridge:patient-identifier")?;
//! assert_eq!(patient.birth_date.as_deref(), Some("1980-04-12"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Fallible library calls return [`domain::Result`], whose error is
//! [`domain::BridgeError`]. A sync run itself does not fail: it returns a
//! [`core::sync::SyncReport`] listing every error and the stage reached.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
