//! Flat observation shape and the laboratory measurements the service knows about

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::resource::systems;

/// Flattened coded measurement
///
/// Exactly one coding and one quantity are taken from the source resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationRecord {
    /// Id assigned by the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Business identifier of the measurement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    /// Coding system URI
    pub system: String,
    pub code: String,

    /// Human-readable name (`code.text`)
    #[serde(default)]
    pub name: Option<String>,

    /// Unit code of the quantity
    #[serde(default)]
    pub unit: Option<String>,
    pub value: f64,
    pub effective: DateTime<FixedOffset>,
}

/// Laboratory measurements with a dedicated add/list operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
    Hemoglobin,
    RedBloodCellCount,
    WhiteBloodCellCount,
}

impl ObservationKind {
    pub const ALL: [ObservationKind; 3] = [
        ObservationKind::Hemoglobin,
        ObservationKind::RedBloodCellCount,
        ObservationKind::WhiteBloodCellCount,
    ];

    /// LOINC code
    pub fn code(&self) -> &'static str {
        match self {
            ObservationKind::Hemoglobin => "718-7",
            ObservationKind::RedBloodCellCount => "789-8",
            ObservationKind::WhiteBloodCellCount => "6690-2",
        }
    }

    /// LOINC display name
    pub fn display(&self) -> &'static str {
        match self {
            ObservationKind::Hemoglobin => "Hemoglobin [Mass/volume] in Blood",
            ObservationKind::RedBloodCellCount => "Erythrocytes [#/volume] in Blood by Automated count",
            ObservationKind::WhiteBloodCellCount => "Leukocytes [#/volume] in Blood by Automated count",
        }
    }

    /// UCUM unit code
    pub fn unit(&self) -> &'static str {
        match self {
            ObservationKind::Hemoglobin => "g/dL",
            ObservationKind::RedBloodCellCount => "10*6/uL",
            ObservationKind::WhiteBloodCellCount => "10*3/uL",
        }
    }

    pub fn system(&self) -> &'static str {
        systems::LOINC
    }

    /// Kind matching a coding, if any
    pub fn from_code(system: &str, code: &str) -> Option<Self> {
        if system != systems::LOINC {
            return None;
        }
        Self::ALL.into_iter().find(|k| k.code() == code)
    }
}

impl fmt::Display for ObservationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObservationKind::Hemoglobin => "hemoglobin",
            ObservationKind::RedBloodCellCount => "rbc",
            ObservationKind::WhiteBloodCellCount => "wbc",
        };
        write!(f, "{name}")
    }
}

impl FromStr for ObservationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hemoglobin" | "hgb" => Ok(ObservationKind::Hemoglobin),
            "rbc" | "red_blood_cell_count" => Ok(ObservationKind::RedBloodCellCount),
            "wbc" | "white_blood_cell_count" => Ok(ObservationKind::WhiteBloodCellCount),
            other => Err(format!(
                "Unknown observation kind '{other}'. Must be one of: hemoglobin, rbc, wbc"
            )),
        }
    }
}
