//! Row validation
//!
//! Each record type brings its own rule set by implementing [`RowRules`].
//! [`validate`] runs the rules over every row of a batch and collects all
//! violations instead of stopping at the first one. Input is never modified.

mod patient;

use crate::domain::patient::provided;
use crate::domain::{BridgeError, Violation};

/// Rule set for one record type
pub trait RowRules {
    /// Checks a single row, pushing any violations onto `violations`
    fn check_row(&self, row_index: usize, violations: &mut Vec<Violation>);

    /// Checks rules that span rows, such as uniqueness
    fn check_batch(_rows: &[Self], _violations: &mut Vec<Violation>)
    where
        Self: Sized,
    {
    }
}

/// Outcome of validating a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Number of rows checked
    pub rows_checked: usize,

    /// All violations, ordered by row
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// A batch is valid iff it has no violations
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations for one row
    pub fn for_row(&self, row_index: usize) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(move |v| v.row_index == row_index)
    }

    /// Converts an invalid report into [`BridgeError::Validation`]
    pub fn into_result(self) -> Result<(), BridgeError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(BridgeError::Validation(self.violations))
        }
    }
}

/// Validates every row of a batch
pub fn validate<T: RowRules>(rows: &[T]) -> ValidationReport {
    let mut violations = Vec::new();
    for (row_index, row) in rows.iter().enumerate() {
        row.check_row(row_index, &mut violations);
    }
    T::check_batch(rows, &mut violations);

    // stable, so rule order within a row is kept
    violations.sort_by_key(|v| v.row_index);

    if !violations.is_empty() {
        tracing::debug!(
            rows = rows.len(),
            violations = violations.len(),
            "Batch failed validation"
        );
    }

    ValidationReport {
        rows_checked: rows.len(),
        violations,
    }
}

/// Rejects blank values and the client placeholder
pub(crate) fn require(
    value: Option<&str>,
    row_index: usize,
    field: &str,
    violations: &mut Vec<Violation>,
) {
    if provided(value).is_none() {
        violations.push(Violation::new(
            row_index,
            field,
            format!("'{field}' must not be empty"),
        ));
    }
}
