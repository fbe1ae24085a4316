//! # Backup Engine - Directory Tree Backup Library
//!
//! A small, headless engine that mirrors one or more source directories into
//! a destination tree. It is the library half of the `backup` command.
//!
//! ## Overview
//!
//! - Configuration merged from CLI flags, environment and a `.env` file
//! - Hidden entries (dot-prefixed names) pruned with their whole subtree
//! - Copies staged in a temporary file and renamed into place, keeping
//!   permission bits and timestamps
//! - Unchanged files skipped, so repeated runs are cheap and idempotent
//! - Dry-run mode that reports without writing to the destination
//! - Append-only run log and an optional desktop notifier
//! - Best-effort batches: a failing file is logged and the run continues
//!
//! ## Basic Usage
//!
//! ```no_run
//! use std::collections::HashMap;
//! use backup_engine::{resolve, run_backup, ConfigOverrides, ProcessEnv};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let overrides = ConfigOverrides {
//!     sources: Some("/home/me/Documents,/home/me/Pictures".to_string()),
//!     destination: Some("/media/usb/backup".into()),
//!     ..Default::default()
//! };
//! let job = resolve(&overrides, &ProcessEnv, &HashMap::new())?;
//!
//! let summary = run_backup(&job, None)?;
//! println!("{}", summary);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **config**: Layered settings resolution
//! - **model**: Core data structures (BackupJob, FileItem, CopyResult)
//! - **error**: Error types and handling
//! - **fs_ops**: Tree enumeration and file copying
//! - **job**: Job orchestration (validate, plan, run)
//! - **logfile**: The append-only run log
//! - **notify**: External notifier invocation
//! - **progress**: Progress callback trait

pub mod config;
pub mod error;
pub mod fs_ops;
pub mod job;
pub mod logfile;
pub mod model;
pub mod notify;
pub mod progress;

// Re-export main types and functions
pub use config::{load_dotenv, resolve, ConfigOverrides, EnvSource, ProcessEnv};
pub use error::{ConfigError, EngineError};
pub use job::{plan_job, run_backup, run_job, validate_job};
pub use logfile::RunLog;
pub use model::{BackupJob, BackupPlan, CopyResult, FileItem, JobSummary, SkipReason};
pub use notify::Notifier;
pub use progress::ProgressCallback;
