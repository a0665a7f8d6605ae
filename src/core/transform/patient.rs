//! Patient conversions
//!
//! Inbound rows become Patient resources. Stored Patients are flattened into
//! [`PatientDetail`]s for the caller. Codes for gender, marital status and
//! citizenship are passed through unchanged; checking them is the store's job.

use crate::core::reference::CitizenshipTable;
use crate::domain::patient::provided;
use crate::domain::resource::{systems, Address, ContactPoint, HumanName, Identifier};
use crate::domain::{
    CodeableConcept, Coding, ConversionError, Extension, ExtensionValue, Patient, PatientDetail,
    PatientRecord,
};

/// Identifier system used when none is configured
pub const DEFAULT_IDENTIFIER_SYSTEM: &str = "urn:fhirbridge:patient-identifier";

/// Builds a Patient resource from a flat row
///
/// # Errors
///
/// Returns [`ConversionError::MissingElement`] if the row has no identifier or
/// no birth date, and [`ConversionError::InvalidValue`] if the identifier
/// contains `|`. Validated rows always convert.
pub fn record_to_patient(
    record: &PatientRecord,
    identifier_system: &str,
) -> Result<Patient, ConversionError> {
    let identifier = record.identifier().ok_or(ConversionError::MissingElement {
        resource: "PatientRecord",
        element: "Identifier",
    })?;
    if identifier.contains('|') {
        return Err(ConversionError::InvalidValue {
            element: "Identifier",
            message: format!("'{identifier}' must not contain '|'"),
        });
    }
    let birth_date = record.birth_date.ok_or(ConversionError::MissingElement {
        resource: "PatientRecord",
        element: "BirthDate",
    })?;

    let mut telecom = Vec::new();
    if let Some(phone) = provided(record.phone.as_deref()) {
        telecom.push(ContactPoint {
            system: Some("phone".to_string()),
            value: Some(phone.to_string()),
            use_: Some("home".to_string()),
        });
    }
    if let Some(email) = provided(record.email.as_deref()) {
        telecom.push(ContactPoint {
            system: Some("email".to_string()),
            value: Some(email.to_string()),
            use_: None,
        });
    }

    Ok(Patient {
        identifier: vec![Identifier {
            use_: Some("official".to_string()),
            system: Some(identifier_system.to_string()),
            value: Some(identifier.to_string()),
        }],
        active: Some(true),
        name: vec![HumanName {
            use_: Some("official".to_string()),
            family: provided(Some(record.last_name.as_str())).map(str::to_string),
            given: provided(Some(record.first_name.as_str()))
                .map(|given| vec![given.to_string()])
                .unwrap_or_default(),
            text: None,
        }],
        telecom,
        gender: provided(record.gender.as_deref()).map(str::to_string),
        birth_date: Some(birth_date.format("%Y-%m-%d").to_string()),
        address: address_of(record).into_iter().collect(),
        marital_status: provided(record.marital_status.as_deref()).map(|code| {
            CodeableConcept::from_coding(Coding {
                display: marital_status_display(code).map(str::to_string),
                ..Coding::new(systems::MARITAL_STATUS, code)
            })
        }),
        extension: provided(record.citizenship.as_deref())
            .map(citizenship_extension)
            .into_iter()
            .collect(),
        ..Default::default()
    })
}

/// Converts rows element-wise, failing on the first row that does not convert
pub fn records_to_patients(
    records: &[PatientRecord],
    identifier_system: &str,
) -> Result<Vec<Patient>, ConversionError> {
    records
        .iter()
        .map(|record| record_to_patient(record, identifier_system))
        .collect()
}

/// Flattens a stored Patient
///
/// The identifier is taken from `identifier_system` when the Patient has one
/// in that system, otherwise from its first identifier.
pub fn patient_to_detail(
    patient: &Patient,
    identifier_system: &str,
    citizenships: &CitizenshipTable,
) -> PatientDetail {
    let name = patient.official_name();
    let citizenship_code = citizenship_code(patient).map(str::to_string);
    let marital_status_code = patient
        .marital_status
        .as_ref()
        .and_then(|c| c.first_code())
        .map(str::to_string);

    PatientDetail {
        resource_id: patient.id.clone(),
        identifier: patient
            .identifier_value(Some(identifier_system))
            .or_else(|| patient.identifier_value(None))
            .map(str::to_string),
        first_name: name.and_then(|n| n.given.first().cloned()),
        last_name: name.and_then(|n| n.family.clone()),
        birth_date: patient.birth_date.clone(),
        gender: patient.gender.clone(),
        citizenship: citizenship_code
            .as_deref()
            .and_then(|code| citizenships.explanation(code))
            .map(str::to_string),
        citizenship_code,
        marital_status: patient
            .marital_status
            .as_ref()
            .and_then(|c| {
                c.text
                    .clone()
                    .or_else(|| c.first_coding().and_then(|coding| coding.display.clone()))
            })
            .or_else(|| {
                marital_status_code
                    .as_deref()
                    .and_then(marital_status_display)
                    .map(str::to_string)
            }),
        marital_status_code,
        phone: patient.telecom_value("phone").map(str::to_string),
        email: patient.telecom_value("email").map(str::to_string),
        address: patient.address.first().and_then(format_address),
        last_updated: patient.meta.as_ref().and_then(|m| m.last_updated.clone()),
    }
}

/// Flattens a list of Patients, preserving order
pub fn patients_to_details(
    patients: &[Patient],
    identifier_system: &str,
    citizenships: &CitizenshipTable,
) -> Vec<PatientDetail> {
    patients
        .iter()
        .map(|p| patient_to_detail(p, identifier_system, citizenships))
        .collect()
}

/// Replaces the marital status of a Patient
pub fn set_marital_status(patient: &mut Patient, code: &str) {
    let code = code.trim();
    patient.marital_status = Some(CodeableConcept::from_coding(Coding {
        display: marital_status_display(code).map(str::to_string),
        ..Coding::new(systems::MARITAL_STATUS, code)
    }));
}

/// Display text for HL7 v3 marital status codes
pub fn marital_status_display(code: &str) -> Option<&'static str> {
    let display = match code {
        "A" => "Annulled",
        "D" => "Divorced",
        "I" => "Interlocutory",
        "L" => "Legally Separated",
        "M" => "Married",
        "C" => "Common Law",
        "P" => "Polygamous",
        "T" => "Domestic partner",
        "U" => "unmarried",
        "S" => "Never Married",
        "W" => "Widowed",
        "UNK" => "unknown",
        _ => return None,
    };
    Some(display)
}

fn citizenship_extension(code: &str) -> Extension {
    Extension {
        url: systems::CITIZENSHIP_EXTENSION.to_string(),
        value: None,
        extension: vec![Extension {
            url: "code".to_string(),
            value: Some(ExtensionValue::CodeableConcept(CodeableConcept::from_coding(
                Coding::new(systems::ISO_3166, code),
            ))),
            extension: Vec::new(),
        }],
    }
}

fn citizenship_code(patient: &Patient) -> Option<&str> {
    let code = patient
        .extension(systems::CITIZENSHIP_EXTENSION)?
        .nested("code")?;
    match code.value.as_ref()? {
        ExtensionValue::CodeableConcept(concept) => concept.first_code(),
        ExtensionValue::Coding(coding) => coding.code.as_deref(),
        ExtensionValue::Code(code) => Some(code.as_str()),
        _ => None,
    }
}

fn address_of(record: &PatientRecord) -> Option<Address> {
    let line = provided(record.address_line.as_deref());
    let city = provided(record.city.as_deref());
    let postal_code = provided(record.postal_code.as_deref());
    let country = provided(record.country.as_deref());

    if line.is_none() && city.is_none() && postal_code.is_none() && country.is_none() {
        return None;
    }

    Some(Address {
        use_: Some("home".to_string()),
        line: line.map(|l| vec![l.to_string()]).unwrap_or_default(),
        city: city.map(str::to_string),
        postal_code: postal_code.map(str::to_string),
        country: country.map(str::to_string),
    })
}

fn format_address(address: &Address) -> Option<String> {
    let locality = match (address.postal_code.as_deref(), address.city.as_deref()) {
        (Some(zip), Some(city)) => Some(format!("{zip} {city}")),
        (Some(part), None) | (None, Some(part)) => Some(part.to_string()),
        (None, None) => None,
    };

    let parts: Vec<String> = address
        .line
        .iter()
        .cloned()
        .chain(locality)
        .chain(address.country.clone())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}
