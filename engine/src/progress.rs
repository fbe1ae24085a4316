//! Progress reporting trait.
//!
//! `ProgressCallback` decouples the engine from console output. The run log
//! is written by the engine itself; callbacks are for whatever front end is
//! driving the run.

use crate::model::{BackupJob, BackupPlan, FileItem, JobSummary};

/// Receives updates while a backup runs.
///
/// All methods are called synchronously from the thread running the job.
pub trait ProgressCallback {
    /// Called once the plan is built, before any file is processed.
    fn on_job_started(&self, job: &BackupJob, plan: &BackupPlan);

    /// Called when a file has an outcome (copied, skipped, would copy or failed).
    fn on_file_completed(&self, job: &BackupJob, file_index: usize, file: &FileItem);

    /// Called after every file has been processed.
    fn on_job_completed(&self, job: &BackupJob, summary: &JobSummary);
}
