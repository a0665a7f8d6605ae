//! Sync report and error records
//!
//! A run never returns `Err`: whatever stops it is recorded here together
//! with the stage it reached.

use crate::domain::{ConversionError, ParseError, StoreError, Violation};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Pipeline stages, in order
///
/// A report's stage is the last one that completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SyncStage {
    /// Nothing completed yet
    Received,
    Parsed,
    Validated,
    Reconciled,
    Converted,
    Written,
    Reported,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStage::Received => "received",
            SyncStage::Parsed => "parsed",
            SyncStage::Validated => "validated",
            SyncStage::Reconciled => "reconciled",
            SyncStage::Converted => "converted",
            SyncStage::Written => "written",
            SyncStage::Reported => "reported",
        };
        write!(f, "{name}")
    }
}

/// Summary of a sync run
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Correlates log lines of one run
    pub run_id: Uuid,

    /// Records in the batch (0 if the input did not parse)
    pub total_records: usize,

    /// Patients created, or that would be created in a dry run
    pub created_count: usize,

    /// Patients updated, or that would be updated in a dry run
    pub updated_count: usize,

    /// Records left out because they failed conversion
    pub skipped_count: usize,

    pub errors: Vec<SyncError>,

    pub stage: SyncStage,

    pub dry_run: bool,

    pub duration: Duration,
}

impl SyncReport {
    /// Create an empty report for a new run
    pub fn new(dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            total_records: 0,
            created_count: 0,
            updated_count: 0,
            skipped_count: 0,
            errors: Vec::new(),
            stage: SyncStage::Received,
            dry_run,
            duration: Duration::from_secs(0),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Add an error
    pub fn add_error(&mut self, error: SyncError) {
        self.errors.push(error);
    }

    /// Whether the run finished every stage without errors
    pub fn is_successful(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether any error of the given kind was recorded
    pub fn has_errors_of(&self, kind: SyncErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }

    /// Records written (or planned, in a dry run)
    pub fn written_count(&self) -> usize {
        self.created_count + self.updated_count
    }

    /// Share of the batch written, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_records == 0 {
            return 100.0;
        }
        (self.written_count() as f64 / self.total_records as f64) * 100.0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            run_id = %self.run_id,
            stage = %self.stage,
            total_records = self.total_records,
            created = self.created_count,
            updated = self.updated_count,
            skipped = self.skipped_count,
            dry_run = self.dry_run,
            duration_ms = self.duration.as_millis() as u64,
            success_rate = format!("{:.2}%", self.success_rate()),
            "Sync completed"
        );

        if !self.errors.is_empty() {
            tracing::warn!(
                run_id = %self.run_id,
                error_count = self.errors.len(),
                "Sync completed with errors"
            );
            for error in &self.errors {
                tracing::warn!(
                    run_id = %self.run_id,
                    kind = ?error.kind,
                    row_index = ?error.row_index,
                    identifier = ?error.identifier,
                    message = %error.message,
                    "Sync error"
                );
            }
        }
    }
}

/// Category of a sync error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    /// Input bytes could not be read as a table
    Parse,
    /// A row broke a validation rule
    Validation,
    /// A record could not be converted to a resource
    Conversion,
    /// A store call failed
    Store,
    /// The run was stopped by a shutdown signal
    Cancelled,
}

/// One error of a sync run, with whatever context is known
#[derive(Debug, Clone, PartialEq)]
pub struct SyncError {
    pub kind: SyncErrorKind,

    pub message: String,

    /// Zero-based data row
    pub row_index: Option<usize>,

    /// Column header, for validation errors
    pub field: Option<String>,

    /// Business identifier or resource id involved
    pub identifier: Option<String>,

    /// Store operation, for store errors
    pub operation: Option<&'static str>,
}

impl SyncError {
    /// Create a new error without context
    pub fn new(kind: SyncErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            row_index: None,
            field: None,
            identifier: None,
            operation: None,
        }
    }

    pub fn parse(error: &ParseError) -> Self {
        Self::new(SyncErrorKind::Parse, error.to_string())
    }

    pub fn validation(violation: &Violation) -> Self {
        Self {
            row_index: Some(violation.row_index),
            field: Some(violation.field.clone()),
            ..Self::new(SyncErrorKind::Validation, violation.message.clone())
        }
    }

    pub fn conversion(error: &ConversionError) -> Self {
        Self::new(SyncErrorKind::Conversion, error.to_string())
    }

    pub fn store(error: &StoreError) -> Self {
        Self {
            identifier: Some(error.identifier.clone()),
            operation: Some(error.operation),
            ..Self::new(SyncErrorKind::Store, error.to_string())
        }
    }

    pub fn cancelled(stage: SyncStage) -> Self {
        Self::new(
            SyncErrorKind::Cancelled,
            format!("sync cancelled after stage '{stage}'"),
        )
    }

    /// Attach the data row the error belongs to
    pub fn at_row(mut self, row_index: usize) -> Self {
        self.row_index = Some(row_index);
        self
    }

    /// Attach the business identifier of the record
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(row) = self.row_index {
            write!(f, "row {row}: ")?;
        }
        if let Some(field) = &self.field {
            write!(f, "{field}: ")?;
        }
        write!(f, "{}", self.message)
    }
}
