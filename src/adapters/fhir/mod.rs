//! FHIR server adapter
//!
//! [`FhirStore`] is the capability the core consumes; [`FhirClient`] is the
//! REST implementation.

pub mod client;
pub mod models;
pub mod store;

#[cfg(test)]
pub(crate) mod mock;

pub use client::FhirClient;
pub use models::{Bundle, BundleEntry};
pub use store::{FhirStore, StoreResult};
