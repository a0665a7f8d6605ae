//! Flat organization shape

use serde::{Deserialize, Serialize};

/// Flattened view of a stored Organization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationDetail {
    /// Id assigned by the store
    pub resource_id: Option<String>,
    pub identifier: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub active: Option<bool>,
}
