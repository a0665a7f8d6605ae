//! Resource conversions
//!
//! Pure functions between flat records and the FHIR resource graph, one
//! module per resource family. Flattening and unflattening are separate
//! operations and are not guaranteed to round-trip byte for byte:
//! observation timestamps are re-expressed at a fixed offset and free-text
//! elements the caller does not use are dropped.
//!
//! Every singular converter has a list form that applies it element-wise,
//! preserves order and maps an empty input to an empty output.

pub mod medication;
pub mod observation;
pub mod organization;
pub mod patient;

pub use medication::{medication_to_record, medications_to_records, request_medications};
pub use observation::{
    kind_record, observation_to_record, observations_to_records, record_to_observation,
    records_to_observations, reporting_offset, REPORTING_OFFSET_SECONDS,
};
pub use organization::{
    new_organization, organization_to_detail, DEFAULT_ORGANIZATION_IDENTIFIER_SYSTEM,
};
pub use patient::{
    patient_to_detail, patients_to_details, record_to_patient, records_to_patients,
    set_marital_status, DEFAULT_IDENTIFIER_SYSTEM,
};
