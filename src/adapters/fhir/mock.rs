//! In-memory store for unit tests

use super::store::{FhirStore, StoreResult};
use crate::domain::resource::Identifier;
use crate::domain::{
    BusinessIdentifier, Coding, Medication, Observation, Organization, Patient, ResourceId,
    StoreError, StoreErrorKind,
};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Default)]
pub(crate) struct MockStore {
    patients: Mutex<Vec<Patient>>,
    observations: Mutex<Vec<Observation>>,
    /// (patient id, prescribed drug)
    medications: Mutex<Vec<(String, Medication)>>,
    organizations: Mutex<Vec<Organization>>,
    calls: Mutex<Vec<&'static str>>,
    failing: Mutex<Option<(&'static str, StoreErrorKind)>>,
}

impl MockStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Seeds a stored patient carrying `identifier` under `id`
    pub(crate) fn with_patient(self, identifier: &str, id: &str) -> Self {
        let patient = Patient {
            id: Some(id.to_string()),
            identifier: vec![Identifier {
                value: Some(identifier.to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        self.lock_patients().push(patient);
        self
    }

    pub(crate) fn with_observation(self, observation: Observation) -> Self {
        self.observations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(observation);
        self
    }

    pub(crate) fn with_medication(self, patient_id: &str, medication: Medication) -> Self {
        self.medications
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((patient_id.to_string(), medication));
        self
    }

    pub(crate) fn with_organization(self, identifier: &str, id: &str) -> Self {
        self.lock_organizations().push(Organization {
            id: Some(id.to_string()),
            identifier: vec![Identifier {
                value: Some(identifier.to_string()),
                ..Default::default()
            }],
            ..Default::default()
        });
        self
    }

    /// Makes every call to `operation` fail with `kind`
    pub(crate) fn failing(self, operation: &'static str, kind: StoreErrorKind) -> Self {
        *self.failing.lock().unwrap_or_else(|e| e.into_inner()) = Some((operation, kind));
        self
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub(crate) fn count(&self, operation: &str) -> usize {
        self.calls().iter().filter(|c| **c == operation).count()
    }

    pub(crate) fn patients(&self) -> Vec<Patient> {
        self.lock_patients().clone()
    }

    pub(crate) fn organizations(&self) -> Vec<Organization> {
        self.lock_organizations().clone()
    }

    fn lock_organizations(&self) -> std::sync::MutexGuard<'_, Vec<Organization>> {
        self.organizations.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_patients(&self) -> std::sync::MutexGuard<'_, Vec<Patient>> {
        self.patients.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, operation: &'static str, identifier: &str) -> StoreResult<()> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(operation);
        match &*self.failing.lock().unwrap_or_else(|e| e.into_inner()) {
            Some((op, kind)) if *op == operation => Err(StoreError::new(
                operation,
                identifier,
                *kind,
                "injected failure",
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl FhirStore for MockStore {
    async fn find_patient_by_identifier(
        &self,
        identifier: &BusinessIdentifier,
    ) -> StoreResult<Option<Patient>> {
        self.record("find_patient_by_identifier", identifier.as_str())?;
        Ok(self
            .lock_patients()
            .iter()
            .find(|p| p.identifier_value(None) == Some(identifier.as_str()))
            .cloned())
    }

    async fn get_patient(&self, id: &ResourceId) -> StoreResult<Option<Patient>> {
        self.record("get_patient", id.as_str())?;
        Ok(self
            .lock_patients()
            .iter()
            .find(|p| p.id.as_deref() == Some(id.as_str()))
            .cloned())
    }

    async fn create_patient(&self, patient: &Patient) -> StoreResult<Patient> {
        self.record("create_patient", patient.identifier_value(None).unwrap_or(""))?;
        let mut stored = patient.clone();
        stored.id = Some(ResourceId::generate().into_inner());
        self.lock_patients().push(stored.clone());
        Ok(stored)
    }

    async fn update_patient(&self, id: &ResourceId, patient: &Patient) -> StoreResult<Patient> {
        self.record("update_patient", id.as_str())?;
        let mut stored = patient.clone();
        stored.id = Some(id.to_string());
        let mut patients = self.lock_patients();
        match patients.iter_mut().find(|p| p.id.as_deref() == Some(id.as_str())) {
            Some(slot) => {
                *slot = stored.clone();
                Ok(stored)
            }
            None => Err(StoreError::new(
                "update_patient",
                id.as_str(),
                StoreErrorKind::Status(404),
                "no such patient",
            )),
        }
    }

    async fn delete_patient(&self, id: &ResourceId) -> StoreResult<()> {
        self.record("delete_patient", id.as_str())?;
        self.lock_patients()
            .retain(|p| p.id.as_deref() != Some(id.as_str()));
        Ok(())
    }

    async fn list_patients(&self, page_size: usize) -> StoreResult<Vec<Patient>> {
        self.record("list_patients", "*")?;
        Ok(self.lock_patients().iter().take(page_size).cloned().collect())
    }

    async fn search_observations(
        &self,
        patient: &ResourceId,
        code: Option<&Coding>,
    ) -> StoreResult<Vec<Observation>> {
        self.record("search_observations", patient.as_str())?;
        let subject = format!("Patient/{patient}");
        Ok(self
            .observations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|o| {
                o.subject.as_ref().and_then(|s| s.reference.as_deref()) == Some(subject.as_str())
            })
            .filter(|o| code.map_or(true, |c| o.code.first_code() == c.code.as_deref()))
            .cloned()
            .collect())
    }

    async fn create_observation(&self, observation: &Observation) -> StoreResult<Observation> {
        self.record("create_observation", "")?;
        let mut stored = observation.clone();
        stored.id = Some(ResourceId::generate().into_inner());
        self.observations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(stored.clone());
        Ok(stored)
    }

    async fn search_medications(&self, patient: &ResourceId) -> StoreResult<Vec<Medication>> {
        self.record("search_medications", patient.as_str())?;
        Ok(self
            .medications
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(owner, _)| owner == patient.as_str())
            .map(|(_, medication)| medication.clone())
            .collect())
    }

    async fn find_organization_by_identifier(
        &self,
        identifier: &BusinessIdentifier,
    ) -> StoreResult<Option<Organization>> {
        self.record("find_organization_by_identifier", identifier.as_str())?;
        Ok(self
            .lock_organizations()
            .iter()
            .find(|o| o.identifier_value(None) == Some(identifier.as_str()))
            .cloned())
    }

    async fn create_organization(&self, organization: &Organization) -> StoreResult<Organization> {
        self.record(
            "create_organization",
            organization.identifier_value(None).unwrap_or(""),
        )?;
        let mut stored = organization.clone();
        stored.id = Some(ResourceId::generate().into_inner());
        self.lock_organizations().push(stored.clone());
        Ok(stored)
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
