//! External system integrations for FhirBridge.
//!
//! - [`fhir`] - FHIR R4 server integration
//!
//! # Design Pattern
//!
//! The sync pipeline depends on the [`fhir::FhirStore`] trait only. The
//! HTTP implementation lives beside it, and tests substitute an in-memory
//! store.
//!
//! ```rust,no_run
//! use fhirbridge::adapters::fhir::{FhirClient, FhirStore};
//! use fhirbridge::config::FhirConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = FhirClient::new(FhirConfig {
//!     base_url: "https://fhir.example.com/fhir".to_string(),
//!     ..Default::default()
//! })?;
//! client.check_connection().await?;
//!
//! let store: Arc<dyn FhirStore> = Arc::new(client);
//! let patients = store.list_patients(10).await?;
//! println!("{} patients", patients.len());
//! # Ok(())
//! # }
//! ```

pub mod fhir;
