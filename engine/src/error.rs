//! Error types for the backup engine.
//!
//! `EngineError` covers both run-level failures (bad configuration, missing
//! sources, an uncreatable destination root) and the per-file failures that
//! are recorded on a `FileItem` instead of stopping the run. `is_fatal`
//! tells the two apart.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Problems found while merging CLI flags, environment and `.env` values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No source directory could be resolved from any layer
    #[error("No sources provided. Use --sources or BACKUP_SOURCES")]
    NoSources,

    /// No destination could be resolved from any layer
    #[error("No destination provided. Use --dest or BACKUP_DESTINATION")]
    NoDestination,

    /// A value was present but could not be interpreted
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    /// The `.env` file exists but could not be parsed
    #[error("Failed to read env file {}: {message}", path.display())]
    EnvFile { path: PathBuf, message: String },
}

/// Errors raised by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration could not be resolved
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Source directory does not exist
    #[error("Source not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    /// Source exists but is a file or something else
    #[error("Source is not a directory: {}", path.display())]
    SourceNotDirectory { path: PathBuf },

    /// Source metadata could not be read
    #[error("Source access denied: {}", path.display())]
    SourceAccessDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Destination root could not be created
    #[error("Failed to create destination {}: {source}", path.display())]
    DestinationCreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read from a source file
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write a destination file
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to create an intermediate directory
    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A directory below a source root could not be listed
    #[error("Failed to enumerate {}: {message}", path.display())]
    EnumerationFailed {
        path: PathBuf,
        message: String,
        os_error: Option<i32>,
    },

    /// Appending to the run log failed
    #[error("Failed to write log {}: {source}", path.display())]
    LogWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The notifier binary could not be invoked
    #[error("Notifier {} failed: {source}", path.display())]
    Notifier {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl EngineError {
    /// Extract the OS error code from this error, if available.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::SourceAccessDenied { source, .. }
            | Self::DestinationCreateFailed { source, .. }
            | Self::Read { source, .. }
            | Self::Write { source, .. }
            | Self::DirectoryCreationFailed { source, .. }
            | Self::LogWrite { source, .. }
            | Self::Notifier { source, .. } => source.raw_os_error(),
            Self::EnumerationFailed { os_error, .. } => *os_error,
            Self::Config(_) | Self::SourceNotFound { .. } | Self::SourceNotDirectory { .. } => None,
        }
    }

    /// True for errors that stop a run before any file is processed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::SourceNotFound { .. }
                | Self::SourceNotDirectory { .. }
                | Self::SourceAccessDenied { .. }
                | Self::DestinationCreateFailed { .. }
        )
    }
}
