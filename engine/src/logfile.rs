//! Append-only run log.
//!
//! One line per event, `[YYYY-MM-DD HH:MM:SS] ACTION detail`. The file and
//! its parent directories are created on first write. Write failures are
//! reported through `tracing` and never stop a run.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::EngineError;
use crate::model::{FileItem, SkipReason};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Handle to the run log file.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RunLog { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line.
    pub fn try_append(&self, message: &str) -> Result<(), EngineError> {
        let log_error = |e| EngineError::LogWrite {
            path: self.path.clone(),
            source: e,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(log_error)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(log_error)?;
        let stamp = Local::now().format(TIMESTAMP_FORMAT);
        writeln!(file, "[{}] {}", stamp, message).map_err(log_error)
    }

    /// Append one line, downgrading any failure to a warning.
    pub fn append(&self, message: &str) {
        if let Err(e) = self.try_append(message) {
            tracing::warn!(error = %e, "run log write failed");
        }
    }

    pub fn started(&self, job_id: &uuid::Uuid, dry_run: bool) {
        if dry_run {
            self.append(&format!("START dry run {}", job_id));
        } else {
            self.append(&format!("START backup {}", job_id));
        }
    }

    pub fn missing_source(&self, path: &Path) {
        self.append(&format!("MISSING {}", path.display()));
    }

    pub fn copied(&self, item: &FileItem) {
        self.append(&format!(
            "COPY {} -> {}",
            item.source_path.display(),
            item.destination_path.display()
        ));
    }

    pub fn would_copy(&self, item: &FileItem) {
        self.append(&format!(
            "DRY-RUN would copy {} -> {}",
            item.source_path.display(),
            item.destination_path.display()
        ));
    }

    pub fn skipped(&self, item: &FileItem, reason: SkipReason) {
        self.append(&format!("SKIP {} {}", reason, item.source_path.display()));
    }

    pub fn failed(&self, path: &Path, reason: &str) {
        self.append(&format!("ERROR {}: {}", path.display(), reason));
    }

    pub fn finished(&self, summary: &impl std::fmt::Display) {
        self.append(&format!("DONE {}", summary));
    }
}
