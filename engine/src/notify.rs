//! Best-effort desktop notifications through an external binary.
//!
//! The binary is called as `<notifier> -title <title> -message <message>`,
//! the calling convention of terminal-notifier. Nothing happens when no
//! notifier is configured or the configured path does not exist.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::error::EngineError;
use crate::model::JobSummary;

pub const NOTIFY_TITLE: &str = "Backup";

#[derive(Debug, Clone, Default)]
pub struct Notifier {
    program: Option<PathBuf>,
}

impl Notifier {
    pub fn new(program: Option<PathBuf>) -> Self {
        Notifier { program }
    }

    /// Run the notifier and wait for it.
    ///
    /// Returns `Ok(false)` when there is nothing to run. The notifier's exit
    /// status is not inspected.
    pub fn try_notify(&self, title: &str, message: &str) -> Result<bool, EngineError> {
        let Some(program) = self.program.as_deref().filter(|p| p.exists()) else {
            return Ok(false);
        };

        Command::new(program)
            .arg("-title")
            .arg(title)
            .arg("-message")
            .arg(message)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| EngineError::Notifier {
                path: program.to_path_buf(),
                source: e,
            })?;
        Ok(true)
    }

    /// Fire and forget.
    pub fn notify(&self, title: &str, message: &str) {
        if let Err(e) = self.try_notify(title, message) {
            tracing::debug!(error = %e, "notification failed");
        }
    }

    pub fn job_started(&self) {
        self.notify(NOTIFY_TITLE, "Backup starting…");
    }

    pub fn job_completed(&self, summary: &JobSummary) {
        self.notify(NOTIFY_TITLE, &completion_message(summary));
    }
}

/// Short human summary of a finished run.
pub fn completion_message(summary: &JobSummary) -> String {
    if summary.dry_run {
        format!(
            "Dry run complete: {} would copy, {} skipped, {} failed",
            summary.would_copy, summary.skipped, summary.failed
        )
    } else {
        format!(
            "Backup complete: {} copied, {} skipped, {} failed",
            summary.copied, summary.skipped, summary.failed
        )
    }
}
