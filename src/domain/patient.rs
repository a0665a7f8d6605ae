//! Flat patient shapes
//!
//! [`PatientRecord`] is one row of inbound person data, either a CSV row or a
//! JSON request body. [`PatientDetail`] is the flattened outbound view of a
//! stored Patient resource.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Value clients leave in generated request bodies for fields they did not fill in
pub const PLACEHOLDER: &str = "string";

/// Returns the trimmed value unless it is blank or the client placeholder
pub fn provided(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(PLACEHOLDER))
}

/// One inbound person row
///
/// Field names follow the CSV header (`Identifier`, `FirstName`, ...). JSON
/// bodies may use either that form or camelCase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PatientRecord {
    #[serde(default, alias = "identifier")]
    pub identifier: String,

    #[serde(default, alias = "firstName")]
    pub first_name: String,

    #[serde(default, alias = "lastName")]
    pub last_name: String,

    #[serde(
        default,
        alias = "birthDate",
        deserialize_with = "flexible_date::deserialize",
        serialize_with = "flexible_date::serialize"
    )]
    pub birth_date: Option<NaiveDate>,

    /// Administrative sex code, passed through verbatim
    #[serde(default, alias = "gender")]
    pub gender: Option<String>,

    /// Citizenship country code
    #[serde(default, alias = "citizenship")]
    pub citizenship: Option<String>,

    /// HL7 v3 marital status code
    #[serde(default, alias = "maritalStatus")]
    pub marital_status: Option<String>,

    #[serde(default, alias = "phone")]
    pub phone: Option<String>,

    #[serde(default, alias = "email")]
    pub email: Option<String>,

    #[serde(default, alias = "addressLine")]
    pub address_line: Option<String>,

    #[serde(default, alias = "city")]
    pub city: Option<String>,

    #[serde(default, alias = "postalCode")]
    pub postal_code: Option<String>,

    #[serde(default, alias = "country")]
    pub country: Option<String>,
}

impl PatientRecord {
    /// Creates a record with the required fields set
    pub fn new(
        identifier: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        birth_date: NaiveDate,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            birth_date: Some(birth_date),
            ..Default::default()
        }
    }

    /// Trimmed business identifier, `None` when not provided
    pub fn identifier(&self) -> Option<&str> {
        provided(Some(&self.identifier))
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn with_citizenship(mut self, code: impl Into<String>) -> Self {
        self.citizenship = Some(code.into());
        self
    }

    pub fn with_marital_status(mut self, code: impl Into<String>) -> Self {
        self.marital_status = Some(code.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

/// Flattened view of a stored Patient
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDetail {
    /// Id assigned by the store
    pub resource_id: Option<String>,
    pub identifier: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub citizenship_code: Option<String>,

    /// Explanation from the citizenship reference table
    pub citizenship: Option<String>,
    pub marital_status_code: Option<String>,
    pub marital_status: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,

    /// Single-line rendering of the first address
    pub address: Option<String>,
    pub last_updated: Option<String>,
}

/// Birth dates in `YYYY-MM-DD` or `DD.MM.YYYY`; empty means absent
pub mod flexible_date {
    use super::*;

    const FORMATS: [&str; 2] = ["%Y-%m-%d", "%d.%m.%Y"];

    /// Parses a date in one of the accepted formats
    pub fn parse(value: &str) -> Result<NaiveDate, String> {
        FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
            .ok_or_else(|| {
                format!("invalid date '{value}', expected YYYY-MM-DD or DD.MM.YYYY")
            })
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => parse(value).map(Some).map_err(serde::de::Error::custom),
        }
    }

    pub fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&date.format("%Y-%m-%d").to_string()),
            None => serializer.serialize_none(),
        }
    }
}
