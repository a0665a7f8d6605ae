//! Domain identifier types with validation
//!
//! Newtype wrappers that keep the externally meaningful business identifier
//! (for example `PAT0001`) apart from the id the remote store assigns to a
//! resource.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Business identifier newtype wrapper
///
/// A human-assigned code such as a patient number. Reconciliation keys on
/// this value.
///
/// # Examples
///
/// ```
/// use fhirbridge::domain::ids::BusinessIdentifier;
/// use std::str::FromStr;
///
/// let id = BusinessIdentifier::from_str("PAT0001").unwrap();
/// assert_eq!(id.as_str(), "PAT0001");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BusinessIdentifier(String);

impl BusinessIdentifier {
    /// Creates a new BusinessIdentifier, trimming surrounding whitespace
    ///
    /// # Returns
    ///
    /// Returns `Ok(BusinessIdentifier)` if the identifier is non-blank, `Err` otherwise
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err("Business identifier cannot be empty".to_string());
        }
        if trimmed.contains('|') {
            return Err(format!(
                "Business identifier cannot contain '|', got: {trimmed}"
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for BusinessIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BusinessIdentifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for BusinessIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Remote resource id newtype wrapper
///
/// The logical id of a resource in the store. FHIR restricts ids to
/// `[A-Za-z0-9\-\.]{1,64}`.
///
/// # Examples
///
/// ```
/// use fhirbridge::domain::ids::ResourceId;
///
/// let id = ResourceId::new("3f2a9c").unwrap();
/// assert_eq!(id.as_str(), "3f2a9c");
/// assert!(ResourceId::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(String);

impl ResourceId {
    /// Creates a new ResourceId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.is_empty() {
            return Err("Resource id cannot be empty".to_string());
        }
        if id.len() > 64 {
            return Err(format!(
                "Resource id must be at most 64 characters, got {}",
                id.len()
            ));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return Err(format!("Invalid resource id format: {id}"));
        }
        Ok(Self(id))
    }

    /// Generates a fresh id as 32 lowercase hex digits without hyphens
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Returns the resource id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ResourceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
