//! Job orchestration module.
//!
//! This module provides the backup lifecycle:
//! - Validating the sources of a resolved job
//! - Planning a job (enumerating every source tree)
//! - Running a job (copying, or reporting what would be copied)
//! - `run_backup`, which strings the steps together with logging and
//!   notifications

use std::fs;
use std::io;
use std::time::Instant;

use crate::error::EngineError;
use crate::fs_ops;
use crate::logfile::RunLog;
use crate::model::{BackupJob, BackupPlan, CopyResult, FileItem, JobSummary, SkipReason};
use crate::notify::Notifier;
use crate::progress::ProgressCallback;

/// Determine whether the destination already holds an up-to-date copy.
///
/// Up to date means a regular file of the same size whose modification
/// time is not older than the source's.
fn destination_is_current(file: &FileItem) -> bool {
    let (Ok(src), Ok(dst)) = (
        fs::metadata(&file.source_path),
        fs::metadata(&file.destination_path),
    ) else {
        return false;
    };

    if !dst.is_file() || src.len() != dst.len() {
        return false;
    }

    match (src.modified(), dst.modified()) {
        (Ok(src_mtime), Ok(dst_mtime)) => dst_mtime >= src_mtime,
        _ => false,
    }
}

/// Check that every source exists and is a directory.
///
/// Each missing source is written to the run log before the first one is
/// returned as the error.
///
/// # Errors
/// `SourceNotFound`, `SourceNotDirectory` or `SourceAccessDenied`.
pub fn validate_job(job: &BackupJob, log: &RunLog) -> Result<(), EngineError> {
    let mut first_error = None;

    for source in &job.sources {
        let error = match fs::metadata(source) {
            Ok(metadata) if metadata.is_dir() => continue,
            Ok(_) => EngineError::SourceNotDirectory {
                path: source.clone(),
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log.missing_source(source);
                EngineError::SourceNotFound {
                    path: source.clone(),
                }
            }
            Err(e) => EngineError::SourceAccessDenied {
                path: source.clone(),
                source: e,
            },
        };
        if !matches!(error, EngineError::SourceNotFound { .. }) {
            log.failed(source, &error.to_string());
        }
        first_error.get_or_insert(error);
    }

    match first_error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Plan a job by enumerating each source in order.
///
/// A source root that cannot be read becomes a single `Failed` item.
pub fn plan_job(job: &BackupJob) -> BackupPlan {
    let mut plan = BackupPlan::default();

    for source in &job.sources {
        match fs_ops::enumerate_source(source, &job.destination) {
            Ok(source_plan) => {
                tracing::debug!(
                    source = %source.display(),
                    files = source_plan.items.len(),
                    hidden = source_plan.hidden_skipped,
                    "enumerated source"
                );
                plan.items.extend(source_plan.items);
                plan.hidden_skipped += source_plan.hidden_skipped;
            }
            Err(e) => {
                plan.items.push(FileItem {
                    source_root: source.clone(),
                    source_path: source.clone(),
                    relative_path: Default::default(),
                    destination_path: job.destination.clone(),
                    file_size: 0,
                    result: Some(CopyResult::Failed {
                        os_error: e.raw_os_error(),
                        reason: e.to_string(),
                    }),
                });
            }
        }
    }

    plan
}

fn process_file(job: &BackupJob, file: &FileItem) -> CopyResult {
    if destination_is_current(file) {
        return CopyResult::Skipped(SkipReason::Unchanged);
    }

    if job.dry_run {
        return CopyResult::SkippedDryRun;
    }

    match fs_ops::copy_file_with_metadata(&file.source_path, &file.destination_path) {
        Ok(bytes) => CopyResult::Copied { bytes },
        Err(e) => CopyResult::Failed {
            os_error: e.raw_os_error(),
            reason: e.to_string(),
        },
    }
}

fn log_outcome(log: &RunLog, file: &FileItem) {
    match &file.result {
        Some(CopyResult::Copied { .. }) => log.copied(file),
        Some(CopyResult::SkippedDryRun) => log.would_copy(file),
        Some(CopyResult::Skipped(reason)) => log.skipped(file, *reason),
        Some(CopyResult::Failed { reason, .. }) => log.failed(&file.source_path, reason),
        None => {}
    }
}

/// Run a planned job.
///
/// Every item gets an outcome and a run log line. A failure on one file is
/// recorded on that item and the loop moves on to the next.
pub fn run_job(
    job: &BackupJob,
    plan: &mut BackupPlan,
    log: &RunLog,
    progress_callback: Option<&dyn ProgressCallback>,
) -> JobSummary {
    let start = Instant::now();

    if let Some(callback) = progress_callback {
        callback.on_job_started(job, plan);
    }

    for file_index in 0..plan.items.len() {
        if plan.items[file_index].result.is_none() {
            let result = process_file(job, &plan.items[file_index]);
            plan.items[file_index].result = Some(result);
        }

        let file = &plan.items[file_index];
        tracing::debug!(path = %file.source_path.display(), result = ?file.result, "processed");
        log_outcome(log, file);

        if let Some(callback) = progress_callback {
            callback.on_file_completed(job, file_index, file);
        }
    }

    let summary = JobSummary::from_plan(plan, job.dry_run, start.elapsed());

    if let Some(callback) = progress_callback {
        callback.on_job_completed(job, &summary);
    }

    summary
}

fn create_destination(job: &BackupJob, log: &RunLog) -> Result<(), EngineError> {
    if job.dry_run {
        return Ok(());
    }
    fs::create_dir_all(&job.destination).map_err(|e| {
        log.failed(&job.destination, &e.to_string());
        EngineError::DestinationCreateFailed {
            path: job.destination.clone(),
            source: e,
        }
    })
}

/// Run a complete backup: log, notify, validate, plan, copy, summarize.
///
/// # Errors
/// Only fatal errors are returned: invalid sources or a destination root that
/// cannot be created. Per-file failures are counted in the summary.
pub fn run_backup(
    job: &BackupJob,
    progress_callback: Option<&dyn ProgressCallback>,
) -> Result<JobSummary, EngineError> {
    let start = Instant::now();
    let log = RunLog::new(&job.logfile);
    let notifier = Notifier::new(job.notifier.clone());

    notifier.job_started();
    log.started(&job.id, job.dry_run);

    validate_job(job, &log)?;
    create_destination(job, &log)?;

    let mut plan = plan_job(job);
    let mut summary = run_job(job, &mut plan, &log, progress_callback);
    summary.elapsed = start.elapsed();

    log.finished(&summary);
    notifier.job_completed(&summary);
    tracing::info!(
        copied = summary.copied,
        would_copy = summary.would_copy,
        skipped = summary.skipped,
        failed = summary.failed,
        "backup finished"
    );

    Ok(summary)
}
