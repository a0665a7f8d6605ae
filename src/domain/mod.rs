//! Domain models and types for FhirBridge.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`BusinessIdentifier`], [`ResourceId`])
//! - **Resource graph** ([`Patient`], [`Observation`], [`Organization`],
//!   [`Medication`] and their datatypes)
//! - **Flat records** ([`PatientRecord`], [`PatientDetail`], [`ObservationRecord`],
//!   [`OrganizationDetail`], [`MedicationRecord`])
//! - **Error types** ([`BridgeError`], [`ParseError`], [`ConversionError`], [`StoreError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Business identifiers and store-assigned resource ids are separate types:
//!
//! ```rust
//! use fhirbridge::domain::{BusinessIdentifier, ResourceId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let identifier = BusinessIdentifier::new("PAT0001")?;
//! let resource_id = ResourceId::new("a1b2c3")?;
//!
//! // This won't compile
//! // let wrong: ResourceId = identifier;
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod ids;
pub mod medication;
pub mod observation;
pub mod organization;
pub mod patient;
pub mod resource;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{
    BridgeError, ConversionError, ParseError, StoreError, StoreErrorKind, Violation,
};
pub use ids::{BusinessIdentifier, ResourceId};
pub use medication::MedicationRecord;
pub use observation::{ObservationKind, ObservationRecord};
pub use organization::OrganizationDetail;
pub use patient::{PatientDetail, PatientRecord};
pub use resource::{
    CodeableConcept, Coding, Extension, ExtensionValue, Medication, MedicationChoice,
    MedicationRequest, Observation, ObservationEffective, ObservationValue, Organization, Patient,
    Quantity,
};
pub use result::Result;
