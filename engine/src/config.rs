//! Configuration resolution.
//!
//! Settings come from three layers, highest precedence first:
//! command-line flags, the process environment, and a `.env` file.
//! `resolve` merges them into a `BackupJob` without touching the
//! filesystem or the process environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{ConfigError, EngineError};
use crate::model::{BackupJob, DEFAULT_LOGFILE};

pub const ENV_SOURCES: &str = "BACKUP_SOURCES";
pub const ENV_DESTINATION: &str = "BACKUP_DESTINATION";
pub const ENV_LOGFILE: &str = "BACKUP_LOGFILE";
pub const ENV_NOTIFIER: &str = "BACKUP_NOTIFIER";
pub const ENV_DRY_RUN: &str = "BACKUP_DRY_RUN";

/// Key/value lookup for environment-style settings.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Comma-separated source directories
    pub sources: Option<String>,
    pub destination: Option<PathBuf>,
    pub logfile: Option<PathBuf>,
    pub notifier: Option<PathBuf>,
    pub dry_run: bool,
}

/// Read a `.env` file into a map without exporting anything.
///
/// A missing file is not an error and yields an empty map.
pub fn load_dotenv(path: &Path) -> Result<HashMap<String, String>, EngineError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no env file");
        return Ok(HashMap::new());
    }

    let env_file_error = |message: String| ConfigError::EnvFile {
        path: path.to_path_buf(),
        message,
    };

    let iter = dotenvy::from_path_iter(path).map_err(|e| env_file_error(e.to_string()))?;
    let mut values = HashMap::new();
    for entry in iter {
        let (key, value) = entry.map_err(|e| env_file_error(e.to_string()))?;
        values.insert(key, value);
    }
    tracing::debug!(path = %path.display(), count = values.len(), "loaded env file");
    Ok(values)
}

struct Layers<'a> {
    env: &'a dyn EnvSource,
    dotenv: &'a HashMap<String, String>,
}

impl Layers<'_> {
    /// First non-empty value from the environment, then the `.env` file.
    fn lookup(&self, key: &str) -> Option<String> {
        self.env
            .var(key)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.dotenv.get(key).filter(|v| !v.trim().is_empty()).cloned())
    }

    fn path(&self, cli: Option<&PathBuf>, key: &str) -> Option<PathBuf> {
        cli.filter(|p| !p.as_os_str().is_empty())
            .cloned()
            .or_else(|| self.lookup(key).map(|v| PathBuf::from(v.trim())))
            .map(|p| self.expand_home(p))
    }

    fn expand_home(&self, path: PathBuf) -> PathBuf {
        let Some(home) = self.lookup("HOME") else {
            return path;
        };
        if let Ok(rest) = path.strip_prefix("~") {
            return Path::new(&home).join(rest);
        }
        path
    }
}

/// Split a comma-separated source list, dropping blank parts.
pub fn parse_sources(list: &str) -> Vec<PathBuf> {
    list.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Merge CLI flags, environment and `.env` values into a `BackupJob`.
///
/// # Errors
/// Returns `ConfigError::NoSources` or `ConfigError::NoDestination` when
/// no layer provides a usable value, and `ConfigError::InvalidValue` for an
/// unparsable `BACKUP_DRY_RUN`.
pub fn resolve(
    overrides: &ConfigOverrides,
    env: &dyn EnvSource,
    dotenv: &HashMap<String, String>,
) -> Result<BackupJob, EngineError> {
    let layers = Layers { env, dotenv };

    let source_list = overrides
        .sources
        .clone()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| layers.lookup(ENV_SOURCES))
        .unwrap_or_default();
    let sources: Vec<PathBuf> = parse_sources(&source_list)
        .into_iter()
        .map(|p| layers.expand_home(p))
        .collect();
    if sources.is_empty() {
        return Err(ConfigError::NoSources.into());
    }

    let destination = layers
        .path(overrides.destination.as_ref(), ENV_DESTINATION)
        .ok_or(ConfigError::NoDestination)?;

    let logfile = layers
        .path(overrides.logfile.as_ref(), ENV_LOGFILE)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOGFILE));

    let notifier = layers.path(overrides.notifier.as_ref(), ENV_NOTIFIER);

    let dry_run = match (overrides.dry_run, layers.lookup(ENV_DRY_RUN)) {
        (true, _) => true,
        (false, Some(value)) => parse_flag(ENV_DRY_RUN, &value)?,
        (false, None) => false,
    };

    Ok(BackupJob {
        id: Uuid::new_v4(),
        sources,
        destination,
        dry_run,
        logfile,
        notifier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn empty() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_cli_beats_env_beats_dotenv() {
        let overrides = ConfigOverrides {
            destination: Some(PathBuf::from("/cli/dst")),
            ..Default::default()
        };
        let env = map(&[(ENV_SOURCES, "/env/a"), (ENV_DESTINATION, "/env/dst")]);
        let dotenv = map(&[
            (ENV_SOURCES, "/dotenv/a"),
            (ENV_DESTINATION, "/dotenv/dst"),
            (ENV_LOGFILE, "/dotenv/backup.log"),
        ]);

        let job = resolve(&overrides, &env, &dotenv).expect("Failed to resolve");
        assert_eq!(job.sources, vec![PathBuf::from("/env/a")]);
        assert_eq!(job.destination, PathBuf::from("/cli/dst"));
        assert_eq!(job.logfile, PathBuf::from("/dotenv/backup.log"));
        assert_eq!(job.notifier, None);
        assert!(!job.dry_run);
    }

    #[test]
    fn test_sources_are_split_and_trimmed() {
        let overrides = ConfigOverrides {
            sources: Some(" /a , ,/b,".to_string()),
            destination: Some(PathBuf::from("/dst")),
            ..Default::default()
        };
        let job = resolve(&overrides, &empty(), &empty()).expect("Failed to resolve");
        assert_eq!(job.sources, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(job.logfile, PathBuf::from(DEFAULT_LOGFILE));
    }

    #[test]
    fn test_missing_sources_is_config_error() {
        let overrides = ConfigOverrides {
            sources: Some(" , ".to_string()),
            destination: Some(PathBuf::from("/dst")),
            ..Default::default()
        };
        let err = resolve(&overrides, &empty(), &empty()).unwrap_err();
        assert!(matches!(err, EngineError::Config(ConfigError::NoSources)));
    }

    #[test]
    fn test_missing_destination_is_config_error() {
        let env = map(&[(ENV_SOURCES, "/a"), (ENV_DESTINATION, "  ")]);
        let err = resolve(&ConfigOverrides::default(), &env, &empty()).unwrap_err();
        assert!(matches!(err, EngineError::Config(ConfigError::NoDestination)));
    }

    #[test]
    fn test_home_is_expanded() {
        let env = map(&[
            ("HOME", "/home/user"),
            (ENV_SOURCES, "~/docs,~"),
            (ENV_DESTINATION, "~/backup"),
        ]);
        let job = resolve(&ConfigOverrides::default(), &env, &empty()).expect("Failed to resolve");
        assert_eq!(
            job.sources,
            vec![PathBuf::from("/home/user/docs"), PathBuf::from("/home/user")]
        );
        assert_eq!(job.destination, PathBuf::from("/home/user/backup"));
    }

    #[test]
    fn test_dry_run_from_env() {
        let env = map(&[(ENV_SOURCES, "/a"), (ENV_DESTINATION, "/b"), (ENV_DRY_RUN, "yes")]);
        let job = resolve(&ConfigOverrides::default(), &env, &empty()).expect("Failed to resolve");
        assert!(job.dry_run);

        let env = map(&[(ENV_SOURCES, "/a"), (ENV_DESTINATION, "/b"), (ENV_DRY_RUN, "maybe")]);
        let err = resolve(&ConfigOverrides::default(), &env, &empty()).unwrap_err();
        assert!(matches!(err, EngineError::Config(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_load_dotenv_reads_without_exporting() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join(".env");
        fs::write(
            &path,
            "# backup defaults\nBACKUP_SOURCES=/x,/y\nBACKUP_NOTIFIER_TEST_ONLY=\"quoted value\"\n",
        )
        .expect("Failed to write env file");

        let values = load_dotenv(&path).expect("Failed to load env file");
        assert_eq!(values.get(ENV_SOURCES).map(String::as_str), Some("/x,/y"));
        assert_eq!(
            values.get("BACKUP_NOTIFIER_TEST_ONLY").map(String::as_str),
            Some("quoted value")
        );
        assert!(std::env::var("BACKUP_NOTIFIER_TEST_ONLY").is_err());
    }

    #[test]
    fn test_load_dotenv_missing_file_is_empty() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let values = load_dotenv(&temp_dir.path().join(".env")).expect("Missing file should be fine");
        assert!(values.is_empty());
    }
}
