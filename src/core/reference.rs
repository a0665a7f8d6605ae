//! Citizenship reference table
//!
//! Loaded once at startup, either from the copy compiled into the binary or
//! from a configured file, and shared read-only afterwards.

use crate::core::tabular::{parse_records, TabularRecord};
use crate::domain::patient::flexible_date;
use crate::domain::{BridgeError, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const BUNDLED_CITIZENSHIP_CSV: &str = include_str!("../../resources/citizenship.csv");

/// One row of the citizenship table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CitizenshipEntry {
    pub code: String,
    pub explanation: String,

    /// First day the code is valid
    #[serde(default, deserialize_with = "flexible_date::deserialize")]
    pub from: Option<NaiveDate>,

    /// Last day the code is valid
    #[serde(default, deserialize_with = "flexible_date::deserialize")]
    pub through: Option<NaiveDate>,
}

impl CitizenshipEntry {
    /// Whether the code is in force on `date`
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| from <= date)
            && self.through.map_or(true, |through| date <= through)
    }
}

impl TabularRecord for CitizenshipEntry {
    const REQUIRED_HEADERS: &'static [&'static str] = &["Code", "Explanation", "From", "Through"];
}

/// Code to explanation lookup
#[derive(Debug, Clone, Default)]
pub struct CitizenshipTable {
    entries: HashMap<String, CitizenshipEntry>,
}

impl CitizenshipTable {
    /// Builds the table from CSV bytes; codes are matched case-insensitively
    ///
    /// A code listed twice keeps its last row.
    pub fn from_csv(bytes: &[u8]) -> Result<Self> {
        let rows: Vec<CitizenshipEntry> = parse_records(bytes)?;
        let entries = rows
            .into_iter()
            .map(|entry| (entry.code.to_uppercase(), entry))
            .collect();
        Ok(Self { entries })
    }

    /// The table shipped with the crate
    pub fn bundled() -> Result<Self> {
        Self::from_csv(BUNDLED_CITIZENSHIP_CSV.as_bytes())
    }

    /// Loads the table from `path`, or the bundled table when `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let table = match path {
            Some(path) => {
                let bytes = std::fs::read(path).map_err(|e| {
                    BridgeError::Configuration(format!(
                        "Failed to read citizenship table {}: {e}",
                        path.display()
                    ))
                })?;
                Self::from_csv(&bytes)?
            }
            None => Self::bundled()?,
        };

        tracing::info!(
            entries = table.len(),
            source = %path.map(|p| p.display().to_string()).unwrap_or_else(|| "bundled".to_string()),
            "Citizenship table loaded"
        );
        Ok(table)
    }

    pub fn get(&self, code: &str) -> Option<&CitizenshipEntry> {
        self.entries.get(&code.trim().to_uppercase())
    }

    /// Explanation for a code, if known
    pub fn explanation(&self, code: &str) -> Option<&str> {
        self.get(code).map(|e| e.explanation.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
