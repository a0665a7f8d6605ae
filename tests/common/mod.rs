//! Shared helpers for integration tests
//!
//! `RecordingStore` is an in-memory `FhirStore` that records every call so
//! tests can assert on what the pipeline sent.

#![allow(dead_code)]

use async_trait::async_trait;
use fhirbridge::adapters::fhir::{FhirStore, StoreResult};
use fhirbridge::domain::resource::Identifier;
use fhirbridge::domain::{
    BusinessIdentifier, Coding, Medication, Observation, Organization, Patient, ResourceId,
    StoreError, StoreErrorKind,
};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const HEADER: &str = "Identifier,FirstName,LastName,BirthDate,Gender,Citizenship,MaritalStatus,Phone,Email\n";

/// One recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub operation: &'static str,
    pub key: String,
}

#[derive(Default)]
pub struct RecordingStore {
    patients: Mutex<Vec<Patient>>,
    observations: Mutex<Vec<Observation>>,
    organizations: Mutex<Vec<Organization>>,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<Vec<(&'static str, String, StoreErrorKind)>>,
    /// When set, writes announce themselves here and then never finish
    stall_writes: Option<Arc<Notify>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a stored patient
    pub fn with_patient(self, identifier: &str, id: &str) -> Self {
        self.patients.lock().unwrap().push(Patient {
            id: Some(id.to_string()),
            identifier: vec![Identifier {
                system: Some("urn:fhirbridge:patient-identifier".to_string()),
                value: Some(identifier.to_string()),
                ..Default::default()
            }],
            ..Default::default()
        });
        self
    }

    /// Fails `operation` for the given key (identifier or resource id), or
    /// for every key when `key` is `*`
    pub fn failing(self, operation: &'static str, key: &str, kind: StoreErrorKind) -> Self {
        self.failures
            .lock()
            .unwrap()
            .push((operation, key.to_string(), kind));
        self
    }

    /// Writes block forever; `started` is notified when the first one begins
    pub fn stalling_writes(mut self, started: Arc<Notify>) -> Self {
        self.stall_writes = Some(started);
        self
    }

    pub fn organizations(&self) -> Vec<Organization> {
        self.organizations.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    pub fn patients(&self) -> Vec<Patient> {
        self.patients.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str, key: &str) -> StoreResult<()> {
        self.calls.lock().unwrap().push(Call {
            operation,
            key: key.to_string(),
        });
        let failures = self.failures.lock().unwrap();
        match failures
            .iter()
            .find(|(op, k, _)| *op == operation && (k == "*" || k == key))
        {
            Some((_, _, kind)) => Err(StoreError::new(operation, key, *kind, "injected failure")),
            None => Ok(()),
        }
    }

    async fn maybe_stall(&self) {
        if let Some(started) = &self.stall_writes {
            started.notify_one();
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl FhirStore for RecordingStore {
    async fn find_patient_by_identifier(
        &self,
        identifier: &BusinessIdentifier,
    ) -> StoreResult<Option<Patient>> {
        self.record("find_patient_by_identifier", identifier.as_str())?;
        Ok(self
            .patients
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.identifier_value(None) == Some(identifier.as_str()))
            .cloned())
    }

    async fn get_patient(&self, id: &ResourceId) -> StoreResult<Option<Patient>> {
        self.record("get_patient", id.as_str())?;
        Ok(self
            .patients
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id.as_deref() == Some(id.as_str()))
            .cloned())
    }

    async fn create_patient(&self, patient: &Patient) -> StoreResult<Patient> {
        let key = patient.identifier_value(None).unwrap_or_default().to_string();
        self.record("create_patient", &key)?;
        self.maybe_stall().await;

        let mut stored = patient.clone();
        stored.id = Some(ResourceId::generate().into_inner());
        self.patients.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn update_patient(&self, id: &ResourceId, patient: &Patient) -> StoreResult<Patient> {
        self.record("update_patient", id.as_str())?;
        self.maybe_stall().await;

        let mut stored = patient.clone();
        stored.id = Some(id.to_string());
        let mut patients = self.patients.lock().unwrap();
        match patients
            .iter_mut()
            .find(|p| p.id.as_deref() == Some(id.as_str()))
        {
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
        self.patients
            .lock()
            .unwrap()
            .retain(|p| p.id.as_deref() != Some(id.as_str()));
        Ok(())
    }

    async fn list_patients(&self, page_size: usize) -> StoreResult<Vec<Patient>> {
        self.record("list_patients", "")?;
        Ok(self
            .patients
            .lock()
            .unwrap()
            .iter()
            .take(page_size)
            .cloned()
            .collect())
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
            .unwrap()
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
        self.observations.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn search_medications(&self, patient: &ResourceId) -> StoreResult<Vec<Medication>> {
        self.record("search_medications", patient.as_str())?;
        Ok(Vec::new())
    }

    async fn find_organization_by_identifier(
        &self,
        identifier: &BusinessIdentifier,
    ) -> StoreResult<Option<Organization>> {
        self.record("find_organization_by_identifier", identifier.as_str())?;
        Ok(self
            .organizations
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.identifier_value(None) == Some(identifier.as_str()))
            .cloned())
    }

    async fn create_organization(&self, organization: &Organization) -> StoreResult<Organization> {
        let key = organization
            .identifier_value(None)
            .unwrap_or_default()
            .to_string();
        self.record("create_organization", &key)?;
        let mut stored = organization.clone();
        stored.id = Some(ResourceId::generate().into_inner());
        self.organizations.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    fn describe(&self) -> String {
        "recording".to_string()
    }
}

/// A CSV row with the required columns filled in
pub fn row(identifier: &str, first: &str, last: &str) -> String {
    format!("{identifier},{first},{last},1980-04-12,female,DE,M,+49 30 1234567,{first}@example.org\n")
}
