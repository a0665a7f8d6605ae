//! FHIR R4 resource graph
//!
//! Serde models of the parts of the FHIR R4 JSON representation that the
//! converters read or write. Unknown elements are ignored on input.
//!
//! Choice elements (`value[x]`, `effective[x]`) are modelled as externally
//! tagged enums flattened into the owning resource, so `valueQuantity` and
//! `valueString` deserialize into different variants of [`ObservationValue`]
//! and callers have to match on them.

use serde::{Deserialize, Serialize};

/// Well-known system and extension URIs
pub mod systems {
    /// LOINC code system
    pub const LOINC: &str = "http://loinc.org";

    /// UCUM units of measure
    pub const UCUM: &str = "http://unitsofmeasure.org";

    /// HL7 v3 marital status codes
    pub const MARITAL_STATUS: &str = "http://terminology.hl7.org/CodeSystem/v3-MaritalStatus";

    /// ISO 3166 country codes used for citizenship
    pub const ISO_3166: &str = "urn:iso:std:iso:3166";

    /// Patient citizenship extension
    pub const CITIZENSHIP_EXTENSION: &str =
        "http://hl7.org/fhir/StructureDefinition/patient-citizenship";

    /// Observation category codes
    pub const OBSERVATION_CATEGORY: &str =
        "http://terminology.hl7.org/CodeSystem/observation-category";
}

/// Resource metadata maintained by the store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Coding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Coding {
    /// Creates a coding with a system and code
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            code: Some(code.into()),
            display: None,
        }
    }

    /// Token form used by FHIR search parameters: `system|code`
    pub fn search_token(&self) -> String {
        format!(
            "{}|{}",
            self.system.as_deref().unwrap_or_default(),
            self.code.as_deref().unwrap_or_default()
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeableConcept {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    /// Creates a concept holding a single coding
    pub fn from_coding(coding: Coding) -> Self {
        Self {
            coding: vec![coding],
            text: None,
        }
    }

    /// First coding, if any
    pub fn first_coding(&self) -> Option<&Coding> {
        self.coding.first()
    }

    /// Code of the first coding
    pub fn first_code(&self) -> Option<&str> {
        self.first_coding().and_then(|c| c.code.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HumanName {
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactPoint {
    /// phone | fax | email | pager | url | sms | other
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Reference {
    /// Literal reference of the form `{resource_type}/{id}`
    pub fn to(resource_type: &str, id: &str) -> Self {
        Self {
            reference: Some(format!("{resource_type}/{id}")),
            display: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparator: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Period {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Range {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<Quantity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<Quantity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ratio {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numerator: Option<Quantity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denominator: Option<Quantity>,
}

/// `Extension.value[x]` restricted to the variants this crate produces or reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExtensionValue {
    #[serde(rename = "valueCodeableConcept")]
    CodeableConcept(CodeableConcept),
    #[serde(rename = "valueCoding")]
    Coding(Coding),
    #[serde(rename = "valueCode")]
    Code(String),
    #[serde(rename = "valueString")]
    String(String),
    #[serde(rename = "valueBoolean")]
    Boolean(bool),
    #[serde(rename = "valuePeriod")]
    Period(Period),
}

/// FHIR extension, possibly nested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    pub url: String,

    #[serde(flatten)]
    pub value: Option<ExtensionValue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
}

impl Extension {
    /// First nested extension with the given url
    pub fn nested(&self, url: &str) -> Option<&Extension> {
        self.extension.iter().find(|e| e.url == url)
    }
}

/// Patient demographics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[serde(default = "patient_resource_type")]
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub telecom: Vec<ContactPoint>,

    /// male | female | other | unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    /// FHIR `date`, possibly partial (`YYYY`, `YYYY-MM`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<Address>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marital_status: Option<CodeableConcept>,
}

impl Default for Patient {
    fn default() -> Self {
        Self {
            resource_type: patient_resource_type(),
            id: None,
            meta: None,
            extension: Vec::new(),
            identifier: Vec::new(),
            active: None,
            name: Vec::new(),
            telecom: Vec::new(),
            gender: None,
            birth_date: None,
            address: Vec::new(),
            marital_status: None,
        }
    }
}

impl Patient {
    /// Value of the first identifier, optionally restricted to a system
    pub fn identifier_value(&self, system: Option<&str>) -> Option<&str> {
        self.identifier
            .iter()
            .filter(|i| system.is_none() || i.system.as_deref() == system)
            .find_map(|i| i.value.as_deref())
    }

    /// The official name, falling back to the first one
    pub fn official_name(&self) -> Option<&HumanName> {
        self.name
            .iter()
            .find(|n| n.use_.as_deref() == Some("official"))
            .or_else(|| self.name.first())
    }

    /// First contact point of the given system
    pub fn telecom_value(&self, system: &str) -> Option<&str> {
        self.telecom
            .iter()
            .filter(|t| t.system.as_deref() == Some(system))
            .find_map(|t| t.value.as_deref())
    }

    /// First extension with the given url
    pub fn extension(&self, url: &str) -> Option<&Extension> {
        self.extension.iter().find(|e| e.url == url)
    }
}

fn patient_resource_type() -> String {
    "Patient".to_string()
}

/// `Observation.value[x]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObservationValue {
    #[serde(rename = "valueQuantity")]
    Quantity(Quantity),
    #[serde(rename = "valueCodeableConcept")]
    CodeableConcept(CodeableConcept),
    #[serde(rename = "valueString")]
    String(String),
    #[serde(rename = "valueBoolean")]
    Boolean(bool),
    #[serde(rename = "valueInteger")]
    Integer(i64),
    #[serde(rename = "valueRange")]
    Range(Range),
    #[serde(rename = "valueRatio")]
    Ratio(Ratio),
    #[serde(rename = "valueSampledData")]
    SampledData(serde_json::Value),
    #[serde(rename = "valueTime")]
    Time(String),
    #[serde(rename = "valueDateTime")]
    DateTime(String),
    #[serde(rename = "valuePeriod")]
    Period(Period),
}

impl ObservationValue {
    /// FHIR type name of the variant
    pub fn type_name(&self) -> &'static str {
        match self {
            ObservationValue::Quantity(_) => "Quantity",
            ObservationValue::CodeableConcept(_) => "CodeableConcept",
            ObservationValue::String(_) => "string",
            ObservationValue::Boolean(_) => "boolean",
            ObservationValue::Integer(_) => "integer",
            ObservationValue::Range(_) => "Range",
            ObservationValue::Ratio(_) => "Ratio",
            ObservationValue::SampledData(_) => "SampledData",
            ObservationValue::Time(_) => "time",
            ObservationValue::DateTime(_) => "dateTime",
            ObservationValue::Period(_) => "Period",
        }
    }
}

/// `Observation.effective[x]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObservationEffective {
    #[serde(rename = "effectiveDateTime")]
    DateTime(String),
    #[serde(rename = "effectiveInstant")]
    Instant(String),
    #[serde(rename = "effectivePeriod")]
    Period(Period),
    #[serde(rename = "effectiveTiming")]
    Timing(serde_json::Value),
}

impl ObservationEffective {
    /// FHIR type name of the variant
    pub fn type_name(&self) -> &'static str {
        match self {
            ObservationEffective::DateTime(_) => "dateTime",
            ObservationEffective::Instant(_) => "instant",
            ObservationEffective::Period(_) => "Period",
            ObservationEffective::Timing(_) => "Timing",
        }
    }
}

/// Coded measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(default = "observation_resource_type")]
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    /// registered | preliminary | final | amended | ...
    #[serde(default = "default_observation_status")]
    pub status: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<CodeableConcept>,

    #[serde(default)]
    pub code: CodeableConcept,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,

    #[serde(flatten)]
    pub effective: Option<ObservationEffective>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued: Option<String>,

    #[serde(flatten)]
    pub value: Option<ObservationValue>,
}

impl Default for Observation {
    fn default() -> Self {
        Self {
            resource_type: observation_resource_type(),
            id: None,
            meta: None,
            identifier: Vec::new(),
            status: default_observation_status(),
            category: Vec::new(),
            code: CodeableConcept::default(),
            subject: None,
            effective: None,
            issued: None,
            value: None,
        }
    }
}

fn observation_resource_type() -> String {
    "Observation".to_string()
}

fn default_observation_status() -> String {
    "final".to_string()
}

/// Care provider organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(default = "organization_resource_type")]
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub telecom: Vec<ContactPoint>,
}

impl Default for Organization {
    fn default() -> Self {
        Self {
            resource_type: organization_resource_type(),
            id: None,
            meta: None,
            identifier: Vec::new(),
            active: None,
            name: None,
            telecom: Vec::new(),
        }
    }
}

impl Organization {
    /// Value of the first identifier, optionally restricted to a system
    pub fn identifier_value(&self, system: Option<&str>) -> Option<&str> {
        self.identifier
            .iter()
            .filter(|i| system.is_none() || i.system.as_deref() == system)
            .find_map(|i| i.value.as_deref())
    }

    /// First contact point of the given system
    pub fn telecom_value(&self, system: &str) -> Option<&str> {
        self.telecom
            .iter()
            .filter(|t| t.system.as_deref() == Some(system))
            .find_map(|t| t.value.as_deref())
    }
}

fn organization_resource_type() -> String {
    "Organization".to_string()
}

/// A drug definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    #[serde(default = "medication_resource_type")]
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,

    /// active | inactive | entered-in-error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<CodeableConcept>,
}

impl Default for Medication {
    fn default() -> Self {
        Self {
            resource_type: medication_resource_type(),
            id: None,
            meta: None,
            code: None,
            status: None,
            form: None,
        }
    }
}

fn medication_resource_type() -> String {
    "Medication".to_string()
}

/// `MedicationRequest.medication[x]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MedicationChoice {
    #[serde(rename = "medicationCodeableConcept")]
    CodeableConcept(CodeableConcept),
    #[serde(rename = "medicationReference")]
    Reference(Reference),
}

/// An order for a medication; only the parts used to find a patient's drugs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationRequest {
    #[serde(default)]
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(flatten)]
    pub medication: Option<MedicationChoice>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,
}

/// Error details returned by a FHIR server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationOutcome {
    #[serde(default)]
    pub issue: Vec<OperationOutcomeIssue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationOutcomeIssue {
    /// fatal | error | warning | information
    #[serde(default)]
    pub severity: String,

    #[serde(default)]
    pub code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

impl OperationOutcome {
    /// Diagnostics of the first fatal or error issue, falling back to any issue
    pub fn primary_diagnostics(&self) -> Option<&str> {
        self.issue
            .iter()
            .find(|i| matches!(i.severity.as_str(), "fatal" | "error"))
            .or_else(|| self.issue.first())
            .and_then(|i| i.diagnostics.as_deref())
    }
}
