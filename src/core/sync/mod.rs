//! Batch sync pipeline
//!
//! Parsed → Validated → Reconciled → Converted → Written → Reported.
//! [`SyncCoordinator`] runs the stages and returns a [`SyncReport`] that
//! carries every error and the stage the run reached.

pub mod coordinator;
pub mod summary;

pub use coordinator::{SyncCoordinator, SyncOptions};
pub use summary::{SyncError, SyncErrorKind, SyncReport, SyncStage};
