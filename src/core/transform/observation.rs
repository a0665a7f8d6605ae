//! Observation conversions
//!
//! Flattening takes the first coding and requires a `valueQuantity` and a
//! point-in-time `effective[x]`. Timestamps are re-expressed at a fixed
//! `+01:00` offset. The instant does not change, only its rendering.

use crate::domain::resource::{systems, Identifier, Reference};
use crate::domain::{
    CodeableConcept, Coding, ConversionError, Observation, ObservationEffective, ObservationKind,
    ObservationRecord, ObservationValue, Quantity, ResourceId,
};
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, TimeZone, Utc};

/// Offset applied to every flattened observation timestamp, in seconds east of UTC
///
/// This is a fixed setting of the deployment the facade was built for, not a
/// timezone lookup.
pub const REPORTING_OFFSET_SECONDS: i32 = 3600;

/// The fixed offset flattened timestamps are rendered in
pub fn reporting_offset() -> FixedOffset {
    // east_opt only fails outside ±24h
    FixedOffset::east_opt(REPORTING_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix())
}

/// Flattens an Observation
///
/// # Errors
///
/// - [`ConversionError::MissingElement`] if there is no coding, no value or no effective time
/// - [`ConversionError::UnexpectedVariant`] if the value is not a Quantity or the
///   effective time is a Period or Timing
/// - [`ConversionError::InvalidValue`] if the effective time cannot be parsed
pub fn observation_to_record(
    observation: &Observation,
) -> Result<ObservationRecord, ConversionError> {
    let coding = observation
        .code
        .first_coding()
        .ok_or(ConversionError::MissingElement {
            resource: "Observation",
            element: "code.coding",
        })?;
    let code = coding.code.clone().ok_or(ConversionError::MissingElement {
        resource: "Observation",
        element: "code.coding.code",
    })?;

    let quantity = match &observation.value {
        Some(ObservationValue::Quantity(quantity)) => quantity,
        Some(other) => {
            return Err(ConversionError::UnexpectedVariant {
                resource: "Observation",
                element: "value[x]",
                expected: "Quantity",
                found: other.type_name(),
            })
        }
        None => {
            return Err(ConversionError::MissingElement {
                resource: "Observation",
                element: "value[x]",
            })
        }
    };
    let value = quantity.value.ok_or(ConversionError::MissingElement {
        resource: "Observation",
        element: "valueQuantity.value",
    })?;

    let effective = match &observation.effective {
        Some(ObservationEffective::DateTime(raw)) | Some(ObservationEffective::Instant(raw)) => {
            parse_point_in_time(raw)?
        }
        Some(other) => {
            return Err(ConversionError::UnexpectedVariant {
                resource: "Observation",
                element: "effective[x]",
                expected: "dateTime",
                found: other.type_name(),
            })
        }
        None => {
            return Err(ConversionError::MissingElement {
                resource: "Observation",
                element: "effective[x]",
            })
        }
    };

    Ok(ObservationRecord {
        id: observation.id.clone(),
        identifier: observation
            .identifier
            .iter()
            .find_map(|i| i.value.clone()),
        system: coding.system.clone().unwrap_or_default(),
        code,
        name: observation.code.text.clone(),
        unit: quantity.code.clone().or_else(|| quantity.unit.clone()),
        value,
        effective,
    })
}

/// Flattens a list of observations, failing on the first one that does not convert
pub fn observations_to_records(
    observations: &[Observation],
) -> Result<Vec<ObservationRecord>, ConversionError> {
    observations.iter().map(observation_to_record).collect()
}

/// Builds an Observation from a flat record
///
/// `subject` becomes a `Patient/{id}` reference when given.
pub fn record_to_observation(
    record: &ObservationRecord,
    subject: Option<&ResourceId>,
) -> Observation {
    let category = match ObservationKind::from_code(&record.system, &record.code) {
        Some(_) => vec![CodeableConcept::from_coding(Coding::new(
            systems::OBSERVATION_CATEGORY,
            "laboratory",
        ))],
        None => Vec::new(),
    };

    Observation {
        id: record.id.clone(),
        identifier: record
            .identifier
            .iter()
            .map(|value| Identifier {
                value: Some(value.clone()),
                ..Default::default()
            })
            .collect(),
        category,
        code: CodeableConcept {
            coding: vec![Coding {
                system: Some(record.system.clone()).filter(|s| !s.is_empty()),
                code: Some(record.code.clone()),
                display: None,
            }],
            text: record.name.clone(),
        },
        subject: subject.map(|id| Reference::to("Patient", id.as_str())),
        effective: Some(ObservationEffective::DateTime(
            record.effective.to_rfc3339(),
        )),
        value: Some(ObservationValue::Quantity(Quantity {
            value: Some(record.value),
            unit: record.unit.clone(),
            system: record.unit.as_ref().map(|_| systems::UCUM.to_string()),
            code: record.unit.clone(),
            ..Default::default()
        })),
        ..Default::default()
    }
}

/// Builds Observations for a list of records, all referencing `subject`
pub fn records_to_observations(
    records: &[ObservationRecord],
    subject: Option<&ResourceId>,
) -> Vec<Observation> {
    records
        .iter()
        .map(|record| record_to_observation(record, subject))
        .collect()
}

/// Record for a new measurement of a known kind, taken now
pub fn kind_record(kind: ObservationKind, value: f64) -> ObservationRecord {
    ObservationRecord {
        id: None,
        identifier: None,
        system: kind.system().to_string(),
        code: kind.code().to_string(),
        name: Some(kind.display().to_string()),
        unit: Some(kind.unit().to_string()),
        value,
        effective: Utc::now().with_timezone(&reporting_offset()),
    }
}

/// Parses a FHIR `dateTime` or `instant` and re-expresses it at the reporting offset
///
/// Date-only values (`YYYY-MM-DD`) are taken as midnight at the reporting offset.
fn parse_point_in_time(raw: &str) -> Result<DateTime<FixedOffset>, ConversionError> {
    let offset = reporting_offset();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&offset));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        ConversionError::InvalidValue {
            element: "effective[x]",
            message: format!("'{raw}' is not a FHIR dateTime"),
        }
    })?;
    date.and_hms_opt(0, 0, 0)
        .and_then(|midnight| offset.from_local_datetime(&midnight).single())
        .ok_or_else(|| ConversionError::InvalidValue {
            element: "effective[x]",
            message: format!("'{raw}' cannot be placed at the reporting offset"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resource::Period;
    use serde_json::json;

    fn hemoglobin() -> Observation {
        serde_json::from_value(json!({
            "resourceType": "Observation",
            "id": "obs-1",
            "identifier": [{"value": "LAB-77"}],
            "status": "final",
            "code": {
                "coding": [
                    {"system": "http://loinc.org", "code": "718-7"},
                    {"system": "http://snomed.info/sct", "code": "271026005"}
                ],
                "text": "Hemoglobin"
            },
            "subject": {"reference": "Patient/p1"},
            "effectiveDateTime": "2024-03-01T08:30:00Z",
            "valueQuantity": {"value": 13.5, "unit": "g/dL", "system": "http://unitsofmeasure.org", "code": "g/dL"}
        }))
        .unwrap()
    }

    #[test]
    fn test_flatten_takes_first_coding() {
        let record = observation_to_record(&hemoglobin()).unwrap();
        assert_eq!(record.id.as_deref(), Some("obs-1"));
        assert_eq!(record.identifier.as_deref(), Some("LAB-77"));
        assert_eq!(record.system, "http://loinc.org");
        assert_eq!(record.code, "718-7");
        assert_eq!(record.name.as_deref(), Some("Hemoglobin"));
        assert_eq!(record.unit.as_deref(), Some("g/dL"));
        assert_eq!(record.value, 13.5);
    }

    #[test]
    fn test_flatten_applies_reporting_offset() {
        let record = observation_to_record(&hemoglobin()).unwrap();
        assert_eq!(record.effective.to_rfc3339(), "2024-03-01T09:30:00+01:00");
        assert_eq!(
            record.effective,
            DateTime::parse_from_rfc3339("2024-03-01T08:30:00Z").unwrap()
        );
    }

    #[test]
    fn test_flatten_date_only_effective() {
        let mut obs = hemoglobin();
        obs.effective = Some(ObservationEffective::DateTime("2024-03-01".into()));
        let record = observation_to_record(&obs).unwrap();
        assert_eq!(record.effective.to_rfc3339(), "2024-03-01T00:00:00+01:00");
    }

    #[test]
    fn test_non_quantity_value_is_rejected() {
        let mut obs = hemoglobin();
        obs.value = Some(ObservationValue::CodeableConcept(CodeableConcept::default()));
        let err = observation_to_record(&obs).unwrap_err();
        assert_eq!(
            err,
            ConversionError::UnexpectedVariant {
                resource: "Observation",
                element: "value[x]",
                expected: "Quantity",
                found: "CodeableConcept",
            }
        );
    }

    #[test]
    fn test_string_value_from_json_is_rejected() {
        let obs: Observation = serde_json::from_value(json!({
            "resourceType": "Observation",
            "status": "final",
            "code": {"coding": [{"system": "http://loinc.org", "code": "718-7"}]},
            "effectiveDateTime": "2024-03-01T08:30:00Z",
            "valueString": "13.5 g/dL"
        }))
        .unwrap();
        assert!(matches!(
            observation_to_record(&obs),
            Err(ConversionError::UnexpectedVariant { found: "string", .. })
        ));
    }

    #[test]
    fn test_period_effective_is_rejected() {
        let mut obs = hemoglobin();
        obs.effective = Some(ObservationEffective::Period(Period::default()));
        assert!(matches!(
            observation_to_record(&obs),
            Err(ConversionError::UnexpectedVariant { element: "effective[x]", found: "Period", .. })
        ));
    }

    #[test]
    fn test_missing_elements() {
        let mut obs = hemoglobin();
        obs.code.coding.clear();
        assert!(matches!(
            observation_to_record(&obs),
            Err(ConversionError::MissingElement { element: "code.coding", .. })
        ));

        let mut obs = hemoglobin();
        obs.value = None;
        assert!(matches!(
            observation_to_record(&obs),
            Err(ConversionError::MissingElement { element: "value[x]", .. })
        ));

        let mut obs = hemoglobin();
        obs.effective = None;
        assert!(matches!(
            observation_to_record(&obs),
            Err(ConversionError::MissingElement { element: "effective[x]", .. })
        ));
    }

    #[test]
    fn test_unparseable_effective() {
        let mut obs = hemoglobin();
        obs.effective = Some(ObservationEffective::DateTime("yesterday".into()));
        assert!(matches!(
            observation_to_record(&obs),
            Err(ConversionError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_record_roundtrip_preserves_key_fields() {
        let original = observation_to_record(&hemoglobin()).unwrap();
        let subject = ResourceId::new("p1").unwrap();

        let resource = record_to_observation(&original, Some(&subject));
        assert_eq!(
            resource.subject.as_ref().and_then(|r| r.reference.as_deref()),
            Some("Patient/p1")
        );

        let back = observation_to_record(&resource).unwrap();
        assert_eq!(back.identifier, original.identifier);
        assert_eq!(back.code, original.code);
        assert_eq!(back.system, original.system);
        assert_eq!(back.value, original.value);
        assert_eq!(back.effective, original.effective);
    }

    #[test]
    fn test_kind_record_builds_lab_observation() {
        let record = kind_record(ObservationKind::WhiteBloodCellCount, 6.2);
        assert_eq!(record.code, "6690-2");
        assert_eq!(record.effective.offset().local_minus_utc(), REPORTING_OFFSET_SECONDS);

        let resource = record_to_observation(&record, None);
        assert_eq!(resource.category.len(), 1);
        assert!(resource.subject.is_none());
    }

    #[test]
    fn test_list_conversions_preserve_order() {
        let mut second = hemoglobin();
        second.id = Some("obs-2".into());
        let records = observations_to_records(&[hemoglobin(), second]).unwrap();
        assert_eq!(records[0].id.as_deref(), Some("obs-1"));
        assert_eq!(records[1].id.as_deref(), Some("obs-2"));

        assert!(observations_to_records(&[]).unwrap().is_empty());
        assert!(records_to_observations(&[], None).is_empty());
    }
}
