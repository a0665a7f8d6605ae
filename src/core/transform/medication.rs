//! Medication conversions
//!
//! A patient's drugs are reached through their MedicationRequests. A request
//! either codes the drug inline or references a Medication resource, which a
//! search with `_include` returns alongside the requests.

use crate::domain::{
    CodeableConcept, Medication, MedicationChoice, MedicationRecord, MedicationRequest,
};
use std::collections::HashSet;

/// The drugs named by `requests`, in request order
///
/// Referenced Medications are taken from `included`; a reference with no
/// matching resource yields a Medication carrying only its id. The same
/// referenced drug is listed once.
pub fn request_medications(
    requests: &[MedicationRequest],
    included: &[Medication],
) -> Vec<Medication> {
    let mut seen = HashSet::new();
    let mut medications = Vec::new();

    for request in requests {
        match &request.medication {
            Some(MedicationChoice::CodeableConcept(code)) => medications.push(Medication {
                code: Some(code.clone()),
                ..Default::default()
            }),
            Some(MedicationChoice::Reference(reference)) => {
                let Some(id) = reference
                    .reference
                    .as_deref()
                    .and_then(|r| r.rsplit('/').next())
                    .filter(|id| !id.is_empty())
                else {
                    continue;
                };
                if !seen.insert(id.to_string()) {
                    continue;
                }
                let medication = included
                    .iter()
                    .find(|m| m.id.as_deref() == Some(id))
                    .cloned()
                    .unwrap_or_else(|| Medication {
                        id: Some(id.to_string()),
                        ..Default::default()
                    });
                medications.push(medication);
            }
            None => {}
        }
    }

    medications
}

/// Flattens a Medication
pub fn medication_to_record(medication: &Medication) -> MedicationRecord {
    let coding = medication.code.as_ref().and_then(|c| c.first_coding());

    MedicationRecord {
        resource_id: medication.id.clone(),
        system: coding.and_then(|c| c.system.clone()),
        code: coding.and_then(|c| c.code.clone()),
        name: coding
            .and_then(|c| c.display.clone())
            .or_else(|| medication.code.as_ref().and_then(|c| c.text.clone())),
        status: medication.status.clone(),
        form: medication.form.as_ref().and_then(concept_label),
    }
}

/// Flattens a list of Medications, preserving order
pub fn medications_to_records(medications: &[Medication]) -> Vec<MedicationRecord> {
    medications.iter().map(medication_to_record).collect()
}

fn concept_label(concept: &CodeableConcept) -> Option<String> {
    concept.text.clone().or_else(|| {
        concept
            .first_coding()
            .and_then(|c| c.display.clone().or_else(|| c.code.clone()))
    })
}
