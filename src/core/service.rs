//! Single-record operations on patients, their observations and medications,
//! and organizations
//!
//! These back the interactive CLI commands. Each call goes straight to the
//! store; results come back flattened.

use crate::adapters::fhir::FhirStore;
use crate::core::reference::CitizenshipTable;
use crate::core::transform::{
    kind_record, medications_to_records, new_organization, observations_to_records,
    organization_to_detail, patient_to_detail, patients_to_details, record_to_observation,
    record_to_patient, set_marital_status,
};
use crate::core::validation::validate;
use crate::domain::{
    BridgeError, BusinessIdentifier, Coding, MedicationRecord, ObservationKind, ObservationRecord,
    OrganizationDetail, PatientDetail, PatientRecord, ResourceId, Result, Violation,
};
use std::sync::Arc;

/// Page size used when the caller does not ask for one
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Patient lookups and single-record writes
pub struct PatientService {
    store: Arc<dyn FhirStore>,
    citizenships: Arc<CitizenshipTable>,
    identifier_system: String,
}

impl PatientService {
    pub fn new(
        store: Arc<dyn FhirStore>,
        citizenships: Arc<CitizenshipTable>,
        identifier_system: impl Into<String>,
    ) -> Self {
        Self {
            store,
            citizenships,
            identifier_system: identifier_system.into(),
        }
    }

    pub async fn get_by_identifier(
        &self,
        identifier: &BusinessIdentifier,
    ) -> Result<Option<PatientDetail>> {
        let patient = self.store.find_patient_by_identifier(identifier).await?;
        Ok(patient.map(|p| self.detail(&p)))
    }

    pub async fn get_by_resource_id(&self, id: &ResourceId) -> Result<Option<PatientDetail>> {
        let patient = self.store.get_patient(id).await?;
        Ok(patient.map(|p| self.detail(&p)))
    }

    /// First page of patients; `None` uses [`DEFAULT_PAGE_SIZE`]
    pub async fn list(&self, page_size: Option<usize>) -> Result<Vec<PatientDetail>> {
        let patients = self
            .store
            .list_patients(page_size.unwrap_or(DEFAULT_PAGE_SIZE))
            .await?;
        Ok(patients_to_details(
            &patients,
            &self.identifier_system,
            &self.citizenships,
        ))
    }

    /// Validates and creates one patient
    ///
    /// # Errors
    ///
    /// [`BridgeError::Validation`] if the record breaks a row rule; nothing is
    /// written in that case.
    pub async fn create(&self, record: &PatientRecord) -> Result<PatientDetail> {
        validate(std::slice::from_ref(record)).into_result()?;
        let patient = record_to_patient(record, &self.identifier_system)?;
        let created = self.store.create_patient(&patient).await?;

        tracing::info!(
            identifier = %record.identifier,
            resource_id = ?created.id,
            "Patient created"
        );
        Ok(self.detail(&created))
    }

    /// Replaces the stored patient carrying the record's identifier
    ///
    /// # Errors
    ///
    /// [`BridgeError::NotFound`] if no patient carries the identifier.
    pub async fn update(&self, record: &PatientRecord) -> Result<PatientDetail> {
        validate(std::slice::from_ref(record)).into_result()?;
        let identifier = BusinessIdentifier::new(record.identifier.as_str())
            .map_err(BridgeError::Other)?;

        let existing = self
            .store
            .find_patient_by_identifier(&identifier)
            .await?
            .ok_or_else(|| BridgeError::NotFound(format!("patient with identifier {identifier}")))?;
        let id = stored_id(existing.id)?;

        let patient = record_to_patient(record, &self.identifier_system)?;
        let updated = self.store.update_patient(&id, &patient).await?;

        tracing::info!(identifier = %identifier, resource_id = %id, "Patient updated");
        Ok(self.detail(&updated))
    }

    /// Deletes the patient carrying `identifier` and returns its resource id
    ///
    /// # Errors
    ///
    /// [`BridgeError::NotFound`] if no patient carries the identifier.
    pub async fn delete_by_identifier(&self, identifier: &BusinessIdentifier) -> Result<ResourceId> {
        let existing = self
            .store
            .find_patient_by_identifier(identifier)
            .await?
            .ok_or_else(|| BridgeError::NotFound(format!("patient with identifier {identifier}")))?;
        let id = stored_id(existing.id)?;

        self.store.delete_patient(&id).await?;

        tracing::info!(identifier = %identifier, resource_id = %id, "Patient deleted");
        Ok(id)
    }

    /// Reads a patient, replaces its marital status and writes it back whole
    pub async fn update_marital_status(
        &self,
        id: &ResourceId,
        code: &str,
    ) -> Result<PatientDetail> {
        if code.trim().is_empty() {
            return Err(BridgeError::Validation(vec![Violation::new(
                0,
                "MaritalStatus",
                "'MaritalStatus' must not be empty",
            )]));
        }

        let mut patient = self
            .store
            .get_patient(id)
            .await?
            .ok_or_else(|| BridgeError::NotFound(format!("patient {id}")))?;

        set_marital_status(&mut patient, code);
        let updated = self.store.update_patient(id, &patient).await?;

        tracing::info!(resource_id = %id, marital_status = %code.trim(), "Marital status updated");
        Ok(self.detail(&updated))
    }

    fn detail(&self, patient: &crate::domain::Patient) -> PatientDetail {
        patient_to_detail(patient, &self.identifier_system, &self.citizenships)
    }
}

/// Blood count observations of one patient
pub struct ObservationService {
    store: Arc<dyn FhirStore>,
}

impl ObservationService {
    pub fn new(store: Arc<dyn FhirStore>) -> Self {
        Self { store }
    }

    /// Observations of a patient, optionally only one kind
    ///
    /// # Errors
    ///
    /// A stored Observation that is not a coded point-in-time quantity fails
    /// the whole call with [`BridgeError::Conversion`].
    pub async fn for_patient(
        &self,
        patient: &ResourceId,
        kind: Option<ObservationKind>,
    ) -> Result<Vec<ObservationRecord>> {
        let code = kind.map(|k| Coding::new(k.system(), k.code()));
        let observations = self
            .store
            .search_observations(patient, code.as_ref())
            .await?;
        Ok(observations_to_records(&observations)?)
    }

    /// Records a new measurement of `kind`, taken now
    pub async fn add(
        &self,
        patient: &ResourceId,
        kind: ObservationKind,
        value: f64,
    ) -> Result<ObservationRecord> {
        if !value.is_finite() {
            return Err(BridgeError::Validation(vec![Violation::new(
                0,
                "Value",
                format!("'{value}' is not a finite number"),
            )]));
        }

        let record = kind_record(kind, value);
        let observation = record_to_observation(&record, Some(patient));
        let created = self.store.create_observation(&observation).await?;

        tracing::info!(
            patient = %patient,
            kind = %kind,
            value,
            "Observation created"
        );

        Ok(ObservationRecord {
            id: created.id,
            ..record
        })
    }
}

/// Drugs prescribed to one patient
pub struct MedicationService {
    store: Arc<dyn FhirStore>,
}

impl MedicationService {
    pub fn new(store: Arc<dyn FhirStore>) -> Self {
        Self { store }
    }

    pub async fn for_patient(&self, patient: &ResourceId) -> Result<Vec<MedicationRecord>> {
        let medications = self.store.search_medications(patient).await?;
        Ok(medications_to_records(&medications))
    }
}

/// Organization lookups and creation
pub struct OrganizationService {
    store: Arc<dyn FhirStore>,
    identifier_system: String,
}

impl OrganizationService {
    pub fn new(store: Arc<dyn FhirStore>, identifier_system: impl Into<String>) -> Self {
        Self {
            store,
            identifier_system: identifier_system.into(),
        }
    }

    /// Creates an active organization with a work phone
    ///
    /// # Errors
    ///
    /// [`BridgeError::Validation`] if the name or phone is blank; nothing is
    /// written in that case.
    pub async fn add(
        &self,
        identifier: &BusinessIdentifier,
        name: &str,
        phone: &str,
    ) -> Result<OrganizationDetail> {
        let violations: Vec<Violation> = [("Name", name), ("Phone", phone)]
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| Violation::new(0, field, format!("'{field}' must not be empty")))
            .collect();
        if !violations.is_empty() {
            return Err(BridgeError::Validation(violations));
        }

        let organization = new_organization(identifier, name, phone, &self.identifier_system);
        let created = self.store.create_organization(&organization).await?;

        tracing::info!(
            identifier = %identifier,
            resource_id = ?created.id,
            "Organization created"
        );
        Ok(organization_to_detail(&created, &self.identifier_system))
    }

    pub async fn get_by_identifier(
        &self,
        identifier: &BusinessIdentifier,
    ) -> Result<Option<OrganizationDetail>> {
        let organization = self.store.find_organization_by_identifier(identifier).await?;
        Ok(organization.map(|o| organization_to_detail(&o, &self.identifier_system)))
    }
}

fn stored_id(id: Option<String>) -> Result<ResourceId> {
    let id = id.ok_or_else(|| BridgeError::Other("stored patient has no id".to_string()))?;
    ResourceId::new(id).map_err(BridgeError::Other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fhir::mock::MockStore;
    use crate::domain::resource::CodeableConcept;
    use crate::domain::{Medication, StoreErrorKind};
    use chrono::NaiveDate;

    fn services(store: Arc<MockStore>) -> (PatientService, ObservationService) {
        let table = Arc::new(CitizenshipTable::bundled().unwrap());
        (
            PatientService::new(store.clone(), table, "urn:test"),
            ObservationService::new(store),
        )
    }

    fn record(identifier: &str) -> PatientRecord {
        PatientRecord::new(
            identifier,
            "Anna",
            "Meyer",
            NaiveDate::from_ymd_opt(1980, 4, 12).unwrap(),
        )
        .with_citizenship("DE")
    }

    #[tokio::test]
    async fn test_create_then_get_by_identifier() {
        let store = Arc::new(MockStore::new());
        let (patients, _) = services(store.clone());

        let created = patients.create(&record("PAT0001")).await.unwrap();
        assert!(created.resource_id.is_some());
        assert_eq!(created.citizenship.as_deref(), Some("Germany"));

        let found = patients
            .get_by_identifier(&BusinessIdentifier::new("PAT0001").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.resource_id, created.resource_id);
        assert_eq!(found.last_name.as_deref(), Some("Meyer"));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_record() {
        let store = Arc::new(MockStore::new());
        let (patients, _) = services(store.clone());

        let err = patients
            .create(&PatientRecord::new(
                "PAT0001",
                "",
                "Meyer",
                NaiveDate::from_ymd_opt(1980, 4, 12).unwrap(),
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::Validation(ref v) if v[0].field == "FirstName"));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_identifier() {
        let store = Arc::new(MockStore::new());
        let (patients, _) = services(store.clone());

        let err = patients.update(&record("PAT0009")).await.unwrap_err();
        assert!(matches!(err, BridgeError::NotFound(_)));
        assert_eq!(store.count("update_patient"), 0);
    }

    #[tokio::test]
    async fn test_update_replaces_whole_resource() {
        let store = Arc::new(MockStore::new().with_patient("PAT0001", "p-1"));
        let (patients, _) = services(store.clone());

        let updated = patients
            .update(&record("PAT0001").with_marital_status("M"))
            .await
            .unwrap();

        assert_eq!(updated.resource_id.as_deref(), Some("p-1"));
        assert_eq!(updated.first_name.as_deref(), Some("Anna"));
        assert_eq!(updated.marital_status.as_deref(), Some("Married"));
    }

    #[tokio::test]
    async fn test_update_marital_status() {
        let store = Arc::new(MockStore::new().with_patient("PAT0001", "p-1"));
        let (patients, _) = services(store.clone());
        let id = ResourceId::new("p-1").unwrap();

        let detail = patients.update_marital_status(&id, "D").await.unwrap();

        assert_eq!(detail.marital_status_code.as_deref(), Some("D"));
        assert_eq!(detail.marital_status.as_deref(), Some("Divorced"));
        assert_eq!(store.calls(), vec!["get_patient", "update_patient"]);
    }

    #[tokio::test]
    async fn test_update_marital_status_missing_patient() {
        let store = Arc::new(MockStore::new());
        let (patients, _) = services(store);
        let id = ResourceId::new("nope").unwrap();

        let err = patients.update_marital_status(&id, "M").await.unwrap_err();
        assert!(matches!(err, BridgeError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_uses_default_page_size() {
        let mut store = MockStore::new();
        for i in 0..12 {
            store = store.with_patient(&format!("PAT{i:04}"), &format!("p-{i}"));
        }
        let (patients, _) = services(Arc::new(store));

        assert_eq!(patients.list(None).await.unwrap().len(), DEFAULT_PAGE_SIZE);
        assert_eq!(patients.list(Some(3)).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_add_and_list_observations() {
        let store = Arc::new(MockStore::new());
        let (_, observations) = services(store.clone());
        let patient = ResourceId::new("p-1").unwrap();

        let added = observations
            .add(&patient, ObservationKind::Hemoglobin, 13.5)
            .await
            .unwrap();
        assert!(added.id.is_some());
        assert_eq!(added.code, "718-7");
        assert_eq!(added.unit.as_deref(), Some("g/dL"));

        observations
            .add(&patient, ObservationKind::WhiteBloodCellCount, 6.1)
            .await
            .unwrap();

        let all = observations.for_patient(&patient, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let hgb = observations
            .for_patient(&patient, Some(ObservationKind::Hemoglobin))
            .await
            .unwrap();
        assert_eq!(hgb.len(), 1);
        assert_eq!(hgb[0].value, 13.5);
    }

    #[tokio::test]
    async fn test_add_rejects_non_finite_value() {
        let store = Arc::new(MockStore::new());
        let (_, observations) = services(store.clone());
        let patient = ResourceId::new("p-1").unwrap();

        let err = observations
            .add(&patient, ObservationKind::Hemoglobin, f64::NAN)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Validation(_)));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_identifier() {
        let store = Arc::new(
            MockStore::new()
                .with_patient("PAT0001", "p-1")
                .with_patient("PAT0002", "p-2"),
        );
        let (patients, _) = services(store.clone());

        let id = patients
            .delete_by_identifier(&BusinessIdentifier::new("PAT0001").unwrap())
            .await
            .unwrap();

        assert_eq!(id.as_str(), "p-1");
        assert_eq!(store.calls(), vec!["find_patient_by_identifier", "delete_patient"]);
        let remaining: Vec<_> = store.patients().into_iter().filter_map(|p| p.id).collect();
        assert_eq!(remaining, vec!["p-2"]);
    }

    #[tokio::test]
    async fn test_delete_unknown_identifier() {
        let store = Arc::new(MockStore::new().with_patient("PAT0001", "p-1"));
        let (patients, _) = services(store.clone());

        let err = patients
            .delete_by_identifier(&BusinessIdentifier::new("PAT0009").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::NotFound(_)));
        assert_eq!(store.count("delete_patient"), 0);
        assert_eq!(store.patients().len(), 1);
    }

    #[tokio::test]
    async fn test_medications_for_patient() {
        let drug = |code: &str, display: &str| Medication {
            id: Some(format!("med-{code}")),
            code: Some(CodeableConcept::from_coding(Coding {
                display: Some(display.to_string()),
                ..Coding::new("http://www.nlm.nih.gov/research/umls/rxnorm", code)
            })),
            ..Default::default()
        };
        let store = Arc::new(
            MockStore::new()
                .with_medication("p-1", drug("197361", "Amlodipine 5 MG"))
                .with_medication("p-2", drug("860975", "Metformin 500 MG")),
        );
        let medications = MedicationService::new(store);

        let records = medications
            .for_patient(&ResourceId::new("p-1").unwrap())
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].code.as_deref(), Some("197361"));
        assert_eq!(records[0].name.as_deref(), Some("Amlodipine 5 MG"));
        assert_eq!(records[0].resource_id.as_deref(), Some("med-197361"));
    }

    #[tokio::test]
    async fn test_add_then_get_organization() {
        let store = Arc::new(MockStore::new());
        let organizations = OrganizationService::new(store.clone(), "urn:test:org");
        let identifier = BusinessIdentifier::new("ORG0001").unwrap();

        let created = organizations
            .add(&identifier, " Klinikum Nord ", "+49 40 555")
            .await
            .unwrap();
        assert!(created.resource_id.is_some());
        assert_eq!(created.name.as_deref(), Some("Klinikum Nord"));
        assert_eq!(created.active, Some(true));

        let found = organizations
            .get_by_identifier(&identifier)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.resource_id, created.resource_id);
        assert_eq!(found.identifier.as_deref(), Some("ORG0001"));
        assert_eq!(found.phone.as_deref(), Some("+49 40 555"));

        let missing = organizations
            .get_by_identifier(&BusinessIdentifier::new("ORG0404").unwrap())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_add_organization_rejects_blank_fields() {
        let store = Arc::new(MockStore::new());
        let organizations = OrganizationService::new(store.clone(), "urn:test:org");

        let err = organizations
            .add(&BusinessIdentifier::new("ORG0001").unwrap(), " ", "")
            .await
            .unwrap_err();

        let violations = match err {
            BridgeError::Validation(violations) => violations,
            other => panic!("expected validation error, got {other:?}"),
        };
        let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["Name", "Phone"]);
        assert!(store.organizations().is_empty());
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_get_organization_uses_seeded_identifier() {
        let store = Arc::new(MockStore::new().with_organization("ORG0002", "o-2"));
        let organizations = OrganizationService::new(store, "urn:test:org");

        let found = organizations
            .get_by_identifier(&BusinessIdentifier::new("ORG0002").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.resource_id.as_deref(), Some("o-2"));
        assert_eq!(found.identifier.as_deref(), Some("ORG0002"));
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let store = Arc::new(MockStore::new().failing("list_patients", StoreErrorKind::Timeout));
        let (patients, _) = services(store);

        let err = patients.list(None).await.unwrap_err();
        assert!(matches!(err, BridgeError::Store(ref e) if e.kind == StoreErrorKind::Timeout));
    }
}
