//! Remote resource store capability
//!
//! The pipeline never talks HTTP directly. It consumes the operations below,
//! which [`FhirClient`](super::FhirClient) implements against a FHIR REST
//! server and tests implement in memory.

use crate::domain::{
    BusinessIdentifier, Coding, Medication, Observation, Organization, Patient, ResourceId,
    StoreError,
};
use async_trait::async_trait;

/// Result of a store call
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Operations the core needs from a FHIR resource store
///
/// Implementations must be safe to call concurrently. Retrying failed calls
/// is the implementation's concern, callers report errors as they are.
///
/// # Example
///
/// ```no_run
/// use fhirbridge::adapters::fhir::{FhirClient, FhirStore};
/// use fhirbridge::config::FhirConfig;
/// use fhirbridge::domain::BusinessIdentifier;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = FhirClient::new(FhirConfig::default())?;
/// let identifier = BusinessIdentifier::new("PAT0001")?;
///
/// if let Some(patient) = client.find_patient_by_identifier(&identifier).await? {
///     println!("found {:?}", patient.id);
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait FhirStore: Send + Sync {
    /// Find the Patient carrying a business identifier
    async fn find_patient_by_identifier(
        &self,
        identifier: &BusinessIdentifier,
    ) -> StoreResult<Option<Patient>>;

    /// Read a Patient by resource id
    async fn get_patient(&self, id: &ResourceId) -> StoreResult<Option<Patient>>;

    /// Create a Patient; the store assigns the id
    async fn create_patient(&self, patient: &Patient) -> StoreResult<Patient>;

    /// Replace a Patient by resource id
    async fn update_patient(&self, id: &ResourceId, patient: &Patient) -> StoreResult<Patient>;

    /// Delete a Patient by resource id; deleting a missing Patient succeeds
    async fn delete_patient(&self, id: &ResourceId) -> StoreResult<()>;

    /// First page of Patients
    async fn list_patients(&self, page_size: usize) -> StoreResult<Vec<Patient>>;

    /// Observations for a Patient, optionally restricted to one code
    async fn search_observations(
        &self,
        patient: &ResourceId,
        code: Option<&Coding>,
    ) -> StoreResult<Vec<Observation>>;

    /// Create an Observation; the store assigns the id
    async fn create_observation(&self, observation: &Observation) -> StoreResult<Observation>;

    /// Drugs prescribed to a Patient through its MedicationRequests
    async fn search_medications(&self, patient: &ResourceId) -> StoreResult<Vec<Medication>>;

    /// Find the Organization carrying a business identifier
    async fn find_organization_by_identifier(
        &self,
        identifier: &BusinessIdentifier,
    ) -> StoreResult<Option<Organization>>;

    /// Create an Organization; the store assigns the id
    async fn create_organization(&self, organization: &Organization)
        -> StoreResult<Organization>;

    /// Human-readable location of the store, for logging
    fn describe(&self) -> String;
}
