//! Flat medication shape

use serde::{Deserialize, Serialize};

/// A drug a patient has been prescribed
///
/// Taken from the first coding of the drug's code. Drugs referenced by a
/// request but not returned by the store keep only `resource_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationRecord {
    /// Id of the Medication resource, absent for drugs coded inline on a request
    pub resource_id: Option<String>,
    pub system: Option<String>,
    pub code: Option<String>,

    /// Coding display, falling back to `code.text`
    pub name: Option<String>,
    pub status: Option<String>,
    pub form: Option<String>,
}
