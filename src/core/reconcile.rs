//! Reconciliation of an inbound batch against the store
//!
//! Each distinct business identifier is looked up once, all lookups run
//! concurrently, and the batch is then partitioned in input order into
//! records the store does not know and records it already holds.

use crate::adapters::fhir::FhirStore;
use crate::domain::{BusinessIdentifier, PatientRecord, ResourceId, StoreError, StoreErrorKind};
use futures::future::try_join_all;
use std::collections::HashMap;

/// A record the store does not hold yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    /// Zero-based position in the input batch
    pub row_index: usize,
    pub record: PatientRecord,
}

/// A record whose identifier matched a stored resource
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingRecord {
    /// Zero-based position in the input batch
    pub row_index: usize,
    pub record: PatientRecord,
    pub resource_id: ResourceId,
}

/// Partition of a batch by presence in the store
///
/// Every input record is in exactly one partition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub new: Vec<NewRecord>,
    pub existing: Vec<ExistingRecord>,
}

impl Reconciliation {
    pub fn len(&self) -> usize {
        self.new.len() + self.existing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partitions `batch` into new and existing records
///
/// # Errors
///
/// The first failing lookup aborts reconciliation; no partial partition is
/// returned. A matched resource without an id is reported as an invalid
/// response.
pub async fn reconcile(
    batch: &[PatientRecord],
    store: &dyn FhirStore,
) -> Result<Reconciliation, StoreError> {
    let mut distinct: Vec<BusinessIdentifier> = Vec::new();
    for record in batch {
        if let Some(identifier) = lookup_key(record) {
            if !distinct.contains(&identifier) {
                distinct.push(identifier);
            }
        }
    }

    let lookups = distinct.iter().map(|identifier| async move {
        let found = store.find_patient_by_identifier(identifier).await?;
        let resource_id = match found {
            Some(patient) => {
                let id = patient.id.ok_or_else(|| {
                    StoreError::new(
                        "find_patient_by_identifier",
                        identifier.as_str(),
                        StoreErrorKind::InvalidResponse,
                        "matched patient has no id",
                    )
                })?;
                Some(ResourceId::new(id).map_err(|e| {
                    StoreError::new(
                        "find_patient_by_identifier",
                        identifier.as_str(),
                        StoreErrorKind::InvalidResponse,
                        e,
                    )
                })?)
            }
            None => None,
        };
        Ok::<_, StoreError>((identifier.as_str().to_string(), resource_id))
    });

    let known: HashMap<String, ResourceId> = try_join_all(lookups)
        .await?
        .into_iter()
        .filter_map(|(identifier, id)| id.map(|id| (identifier, id)))
        .collect();

    tracing::debug!(
        records = batch.len(),
        distinct_identifiers = distinct.len(),
        matched = known.len(),
        "Identifiers reconciled against store"
    );

    let mut result = Reconciliation::default();
    for (row_index, record) in batch.iter().enumerate() {
        match known.get(record.identifier.trim()) {
            Some(resource_id) => result.existing.push(ExistingRecord {
                row_index,
                record: record.clone(),
                resource_id: resource_id.clone(),
            }),
            None => result.new.push(NewRecord {
                row_index,
                record: record.clone(),
            }),
        }
    }

    Ok(result)
}

/// Identifier to look up, or `None` for records that cannot match
///
/// Blank identifiers and identifiers containing `|` never match; they only
/// reach here when validation was bypassed, and conversion rejects them later.
fn lookup_key(record: &PatientRecord) -> Option<BusinessIdentifier> {
    BusinessIdentifier::new(record.identifier.as_str()).ok()
}
