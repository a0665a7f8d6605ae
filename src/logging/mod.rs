//! Logging and observability
//!
//! Structured logging through `tracing`, with optional JSON file output
//! and a few macros that keep field names consistent across the crate.
//!
//! # Example
//!
//! ```no_run
//! use fhirbridge::config::LoggingConfig;
//! use fhirbridge::logging::init_logging;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, parse_log_level, LoggingGuard};

/// Log the start of a sync run
///
/// # Example
///
/// ```no_run
/// use fhirbridge::log_sync_start;
///
/// log_sync_start!("patients.csv", false);
/// ```
#[macro_export]
macro_rules! log_sync_start {
    ($source:expr, $dry_run:expr) => {
        tracing::info!(source = %$source, dry_run = $dry_run, "Starting sync");
    };
}

/// Log the end of a sync run from its counts
///
/// ```no_run
/// use fhirbridge::log_sync_complete;
/// use std::time::Duration;
///
/// log_sync_complete!(3, 1, Duration::from_millis(250));
/// ```
#[macro_export]
macro_rules! log_sync_complete {
    ($created:expr, $updated:expr, $duration:expr) => {
        tracing::info!(
            created = $created,
            updated = $updated,
            duration_ms = $duration.as_millis() as u64,
            "Sync finished"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use fhirbridge::domain::BridgeError;
/// use fhirbridge::log_error_with_context;
///
/// let error = BridgeError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log a retry attempt
///
/// ```no_run
/// use fhirbridge::log_retry_attempt;
///
/// log_retry_attempt!(2, 4, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying operation"
        );
    };
}
