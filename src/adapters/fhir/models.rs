//! FHIR REST wire models
//!
//! Search results arrive as `searchset` Bundles. Entries are kept as raw JSON
//! until the caller asks for a resource type, so included or outcome entries
//! of other types do not break decoding.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Media type for FHIR JSON
pub const FHIR_JSON: &str = "application/fhir+json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    #[serde(default)]
    pub resource_type: String,

    #[serde(default, rename = "type")]
    pub bundle_type: Option<String>,

    #[serde(default)]
    pub total: Option<u64>,

    #[serde(default)]
    pub link: Vec<BundleLink>,

    #[serde(default)]
    pub entry: Vec<BundleEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleLink {
    pub relation: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(default)]
    pub full_url: Option<String>,

    #[serde(default)]
    pub resource: Option<serde_json::Value>,

    #[serde(default)]
    pub search: Option<BundleEntrySearch>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleEntrySearch {
    /// match | include | outcome
    #[serde(default)]
    pub mode: Option<String>,
}

impl Bundle {
    /// Decodes the matched entries of the given resource type, in bundle order
    pub fn matches<T: DeserializeOwned>(
        &self,
        resource_type: &str,
    ) -> Result<Vec<T>, serde_json::Error> {
        self.decode(resource_type, |mode| mode.map_or(true, |m| m == "match"))
    }

    /// Decodes the entries of the given type that `_include` pulled in
    pub fn included<T: DeserializeOwned>(
        &self,
        resource_type: &str,
    ) -> Result<Vec<T>, serde_json::Error> {
        self.decode(resource_type, |mode| mode == Some("include"))
    }

    fn decode<T: DeserializeOwned>(
        &self,
        resource_type: &str,
        keep_mode: impl Fn(Option<&str>) -> bool,
    ) -> Result<Vec<T>, serde_json::Error> {
        self.entry
            .iter()
            .filter(|e| keep_mode(e.search.as_ref().and_then(|s| s.mode.as_deref())))
            .filter_map(|e| e.resource.as_ref())
            .filter(|r| r.get("resourceType").and_then(|t| t.as_str()) == Some(resource_type))
            .map(T::deserialize)
            .collect()
    }

    /// URL of the next page, if the server paginated
    pub fn next_link(&self) -> Option<&str> {
        self.link
            .iter()
            .find(|l| l.relation == "next")
            .map(|l| l.url.as_str())
    }
}
