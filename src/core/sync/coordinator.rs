//! Sync coordinator - drives one batch through the pipeline
//!
//! Stages run strictly in order. A failing stage stops the run and nothing
//! after it happens; in particular no write is issued unless parsing,
//! validation, reconciliation and conversion all succeeded (conversion may be
//! relaxed with [`ConversionFailurePolicy::SkipAndReport`]).

use super::summary::{SyncError, SyncReport, SyncStage};
use crate::adapters::fhir::FhirStore;
use crate::config::{BridgeConfig, ConversionFailurePolicy};
use crate::core::reconcile::{reconcile, Reconciliation};
use crate::core::tabular::parse_patients;
use crate::core::transform::{record_to_patient, DEFAULT_IDENTIFIER_SYSTEM};
use crate::core::validation::validate;
use crate::domain::{Patient, PatientRecord, ResourceId};
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::Instrument;

/// Per-run behaviour
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Run up to conversion and report what would be written
    pub dry_run: bool,

    pub conversion_policy: ConversionFailurePolicy,

    /// System URI written on Patient identifiers
    pub identifier_system: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            conversion_policy: ConversionFailurePolicy::default(),
            identifier_system: DEFAULT_IDENTIFIER_SYSTEM.to_string(),
        }
    }
}

impl SyncOptions {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            dry_run: config.application.dry_run,
            conversion_policy: config.sync.conversion_failure_policy,
            identifier_system: config.fhir.identifier_system.clone(),
        }
    }
}

/// A converted record ready to be written
struct PlannedWrite {
    row_index: usize,
    identifier: String,
    patient: Patient,
}

/// Outcome of a stage: continue with a value, or stop
type Step<T> = std::result::Result<T, ()>;

/// Sync coordinator
///
/// # Example
///
/// ```no_run
/// use fhirbridge::adapters::fhir::{FhirClient, FhirStore};
/// use fhirbridge::config::FhirConfig;
/// use fhirbridge::core::sync::{SyncCoordinator, SyncOptions};
/// use std::sync::Arc;
///
/// # async fn example() -> fhirbridge::domain::Result<()> {
/// let store: Arc<dyn FhirStore> = Arc::new(FhirClient::new(FhirConfig::default())?);
/// let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
///
/// let coordinator = SyncCoordinator::new(store, SyncOptions::default(), shutdown_rx);
/// let report = coordinator.sync_bytes(b"Identifier,FirstName,LastName,BirthDate\n").await;
/// assert!(report.is_successful());
/// # Ok(())
/// # }
/// ```
pub struct SyncCoordinator {
    store: Arc<dyn FhirStore>,
    options: SyncOptions,
    shutdown: watch::Receiver<bool>,
}

impl SyncCoordinator {
    /// Create a new coordinator
    ///
    /// Sending `true` on the shutdown channel stops a running sync at its
    /// next suspension point.
    pub fn new(
        store: Arc<dyn FhirStore>,
        options: SyncOptions,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            options,
            shutdown,
        }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Parses a CSV batch and syncs it
    pub async fn sync_bytes(&self, bytes: &[u8]) -> SyncReport {
        let mut report = SyncReport::new(self.options.dry_run);
        let span = tracing::info_span!("sync", run_id = %report.run_id);

        async {
            let start = Instant::now();
            crate::log_sync_start!(self.store.describe(), self.options.dry_run);
            tracing::debug!(bytes = bytes.len(), "Parsing input");

            match parse_patients(bytes) {
                Ok(records) => {
                    report.stage = SyncStage::Parsed;
                    self.run(&records, &mut report).await;
                }
                Err(e) => {
                    tracing::error!(line = e.line, error = %e, "Input could not be parsed");
                    report.add_error(SyncError::parse(&e));
                }
            }

            finish(report, start)
        }
        .instrument(span)
        .await
    }

    /// Syncs already structured records
    pub async fn sync_records(&self, records: &[PatientRecord]) -> SyncReport {
        let mut report = SyncReport::new(self.options.dry_run);
        let span = tracing::info_span!("sync", run_id = %report.run_id);

        async {
            let start = Instant::now();
            crate::log_sync_start!(self.store.describe(), self.options.dry_run);

            report.stage = SyncStage::Parsed;
            self.run(records, &mut report).await;

            finish(report, start)
        }
        .instrument(span)
        .await
    }

    /// Validate → Reconcile → Convert → Write, recording into `report`
    ///
    /// Returns at the first stage that stops the run; `report.stage` is the
    /// last stage completed.
    async fn run(&self, records: &[PatientRecord], report: &mut SyncReport) {
        report.total_records = records.len();
        let mut shutdown = self.shutdown.clone();

        // Validate
        if self.check_cancelled(&shutdown, report).is_err() {
            return;
        }
        let validation = validate(records);
        if !validation.is_valid() {
            tracing::warn!(
                violations = validation.violations.len(),
                "Batch failed validation, nothing written"
            );
            for violation in &validation.violations {
                report.add_error(SyncError::validation(violation));
            }
            return;
        }
        report.stage = SyncStage::Validated;

        // Reconcile
        let reconciled = self
            .until_cancelled(&mut shutdown, report, reconcile(records, self.store.as_ref()))
            .await;
        let reconciliation = match reconciled {
            Ok(Ok(reconciliation)) => reconciliation,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Reconciliation failed, nothing written");
                report.add_error(SyncError::store(&e));
                return;
            }
            Err(()) => return,
        };
        report.stage = SyncStage::Reconciled;
        tracing::info!(
            new = reconciliation.new.len(),
            existing = reconciliation.existing.len(),
            "Batch reconciled"
        );

        // Convert
        let Ok((creates, updates)) = self.convert(reconciliation, report) else {
            return;
        };
        report.stage = SyncStage::Converted;

        if self.options.dry_run {
            report.created_count = creates.len();
            report.updated_count = updates.len();
            tracing::info!(
                would_create = creates.len(),
                would_update = updates.len(),
                "Dry run, no writes issued"
            );
            return;
        }

        // Write
        if self.check_cancelled(&shutdown, report).is_err() {
            return;
        }
        let store = self.store.as_ref();
        let create_calls = creates.iter().map(|w| store.create_patient(&w.patient));
        let update_calls = updates.iter().map(|(id, w)| store.update_patient(id, &w.patient));
        let writes = async { tokio::join!(join_all(create_calls), join_all(update_calls)) };

        let Ok((created, updated)) = self.until_cancelled(&mut shutdown, report, writes).await
        else {
            return;
        };

        for (write, result) in creates.iter().zip(created) {
            match result {
                Ok(_) => report.created_count += 1,
                Err(e) => {
                    tracing::warn!(identifier = %write.identifier, error = %e, "Create failed");
                    report.add_error(SyncError::store(&e).at_row(write.row_index));
                }
            }
        }
        for ((_, write), result) in updates.iter().zip(updated) {
            match result {
                Ok(_) => report.updated_count += 1,
                Err(e) => {
                    tracing::warn!(identifier = %write.identifier, error = %e, "Update failed");
                    report.add_error(SyncError::store(&e).at_row(write.row_index));
                }
            }
        }
        report.stage = SyncStage::Written;
    }

    /// Converts both partitions, applying the conversion failure policy
    #[allow(clippy::type_complexity)]
    fn convert(
        &self,
        reconciliation: Reconciliation,
        report: &mut SyncReport,
    ) -> Step<(Vec<PlannedWrite>, Vec<(ResourceId, PlannedWrite)>)> {
        let mut failures = Vec::new();
        let mut plan = |row_index: usize, record: &PatientRecord| -> Option<PlannedWrite> {
            match record_to_patient(record, &self.options.identifier_system) {
                Ok(patient) => Some(PlannedWrite {
                    row_index,
                    identifier: record.identifier.trim().to_string(),
                    patient,
                }),
                Err(e) => {
                    failures.push(
                        SyncError::conversion(&e)
                            .at_row(row_index)
                            .with_identifier(record.identifier.trim()),
                    );
                    None
                }
            }
        };

        let creates: Vec<PlannedWrite> = reconciliation
            .new
            .iter()
            .filter_map(|new| plan(new.row_index, &new.record))
            .collect();
        let updates: Vec<(ResourceId, PlannedWrite)> = reconciliation
            .existing
            .into_iter()
            .filter_map(|existing| {
                plan(existing.row_index, &existing.record).map(|w| (existing.resource_id, w))
            })
            .collect();

        if failures.is_empty() {
            return Ok((creates, updates));
        }

        failures.sort_by_key(|f| f.row_index);
        let failed = failures.len();
        for failure in failures {
            report.add_error(failure);
        }

        match self.options.conversion_policy {
            ConversionFailurePolicy::FailBatch => {
                tracing::error!(failed, "Conversion failed, nothing written");
                Err(())
            }
            ConversionFailurePolicy::SkipAndReport => {
                tracing::warn!(skipped = failed, "Skipping records that failed conversion");
                report.skipped_count = failed;
                Ok((creates, updates))
            }
        }
    }

    fn check_cancelled(
        &self,
        shutdown: &watch::Receiver<bool>,
        report: &mut SyncReport,
    ) -> Step<()> {
        if *shutdown.borrow() {
            tracing::warn!(stage = %report.stage, "Shutdown requested, stopping sync");
            report.add_error(SyncError::cancelled(report.stage));
            return Err(());
        }
        Ok(())
    }

    /// Awaits `work` unless shutdown is signalled first
    async fn until_cancelled<T>(
        &self,
        shutdown: &mut watch::Receiver<bool>,
        report: &mut SyncReport,
        work: impl Future<Output = T>,
    ) -> Step<T> {
        tokio::select! {
            biased;
            _ = shutdown_signalled(shutdown) => {
                tracing::warn!(stage = %report.stage, "Shutdown requested, abandoning in-flight calls");
                report.add_error(SyncError::cancelled(report.stage));
                Err(())
            }
            result = work => Ok(result),
        }
    }
}

/// Stamps the duration and logs the summary; a run whose writes were all
/// issued ends as reported
fn finish(mut report: SyncReport, start: Instant) -> SyncReport {
    if report.stage == SyncStage::Written {
        report.stage = SyncStage::Reported;
    }
    let report = report.with_duration(start.elapsed());
    report.log_summary();
    report
}

/// Resolves once the flag is `true`; never resolves if the sender is gone
async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
