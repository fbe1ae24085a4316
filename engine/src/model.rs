//! Core data model for backup runs.
//!
//! - BackupJob: the resolved settings for one run
//! - FileItem / BackupPlan: the enumerated work list
//! - CopyResult, SkipReason: per-file outcomes
//! - JobSummary: counts reported at the end of a run

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Default run log location when nothing else is configured.
pub const DEFAULT_LOGFILE: &str = "./backup.log";

/// Resolved settings for a single backup run.
///
/// Built once by `config::resolve` and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupJob {
    /// Unique identifier for this run, written into the run log
    pub id: Uuid,

    /// Source directories, processed in order
    pub sources: Vec<PathBuf>,

    /// Root of the mirrored destination tree
    pub destination: PathBuf,

    /// Report actions without writing to the destination
    pub dry_run: bool,

    /// Append-only run log
    pub logfile: PathBuf,

    /// Optional desktop notification binary
    pub notifier: Option<PathBuf>,
}

/// Why a file was not copied.
///
/// Hidden entries never become items; they are only counted in
/// `BackupPlan::hidden_skipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Destination already has the same size and an equal or newer mtime
    Unchanged,
    /// Symlink, socket, device or anything else that is not a regular file
    NotRegular,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unchanged => write!(f, "unchanged"),
            SkipReason::NotRegular => write!(f, "not-regular"),
        }
    }
}

/// Outcome of processing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyResult {
    /// Contents and metadata were written to the destination
    Copied { bytes: u64 },
    /// Nothing to do
    Skipped(SkipReason),
    /// Dry run: the file would have been copied
    SkippedDryRun,
    /// The copy failed; the run continued
    Failed { reason: String, os_error: Option<i32> },
}

/// A single file found under one of the sources.
#[derive(Debug, Clone)]
pub struct FileItem {
    /// The source directory this file was found under
    pub source_root: PathBuf,

    /// Full source path
    pub source_path: PathBuf,

    /// Path relative to `source_root`
    pub relative_path: PathBuf,

    /// Mirrored path under the destination root
    pub destination_path: PathBuf,

    /// Size in bytes at enumeration time
    pub file_size: u64,

    /// None until the item has been processed
    pub result: Option<CopyResult>,
}

impl FileItem {
    /// Returns true once the item has an outcome.
    pub fn is_processed(&self) -> bool {
        self.result.is_some()
    }
}

/// All files enumerated for a run, in source order.
#[derive(Debug, Clone, Default)]
pub struct BackupPlan {
    pub items: Vec<FileItem>,

    /// Hidden entries pruned during enumeration (a pruned directory counts once)
    pub hidden_skipped: usize,
}

impl BackupPlan {
    /// Total bytes of items still waiting to be processed.
    pub fn pending_bytes(&self) -> u64 {
        self.items
            .iter()
            .filter(|item| !item.is_processed())
            .map(|item| item.file_size)
            .sum()
    }
}

/// Counts for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSummary {
    /// Files considered (hidden entries excluded)
    pub evaluated: usize,
    pub copied: usize,
    pub would_copy: usize,
    /// Unchanged, not-regular and hidden entries
    pub skipped: usize,
    pub failed: usize,
    pub bytes_copied: u64,
    pub elapsed: Duration,
    pub dry_run: bool,
}

impl JobSummary {
    /// Tally the outcomes recorded on a processed plan.
    pub fn from_plan(plan: &BackupPlan, dry_run: bool, elapsed: Duration) -> Self {
        let mut summary = JobSummary {
            evaluated: plan.items.len(),
            skipped: plan.hidden_skipped,
            elapsed,
            dry_run,
            ..Default::default()
        };

        for item in &plan.items {
            match &item.result {
                Some(CopyResult::Copied { bytes }) => {
                    summary.copied += 1;
                    summary.bytes_copied += bytes;
                }
                Some(CopyResult::SkippedDryRun) => summary.would_copy += 1,
                Some(CopyResult::Skipped(_)) => summary.skipped += 1,
                Some(CopyResult::Failed { .. }) => summary.failed += 1,
                None => {}
            }
        }

        summary
    }
}

impl fmt::Display for JobSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            write!(
                f,
                "Dry run completed. Files evaluated: {}; would copy: {}; skipped: {}; failed: {}; elapsed: {:.2?}",
                self.evaluated, self.would_copy, self.skipped, self.failed, self.elapsed
            )
        } else {
            write!(
                f,
                "Backup completed. Files evaluated: {}; copied: {}; skipped: {}; failed: {}; elapsed: {:.2?}",
                self.evaluated, self.copied, self.skipped, self.failed, self.elapsed
            )
        }
    }
}
