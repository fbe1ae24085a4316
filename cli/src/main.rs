//! backup - Command-line interface for the backup engine.
//!
//! Collects flags, the process environment and an optional `.env` file,
//! hands the merged job to the engine and prints a summary.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use backup_engine::{
    config::{self, ConfigOverrides, ProcessEnv},
    job::run_backup,
    model::{BackupJob, BackupPlan, CopyResult, FileItem, JobSummary},
    progress::ProgressCallback,
    EngineError,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

/// Exit status for configuration and validation failures
const EXIT_CONFIG: i32 = 2;

/// backup - Mirror source directories into a destination, skipping hidden files
#[derive(Parser, Debug)]
#[command(name = "backup")]
#[command(version)]
#[command(about = "Portable backup utility")]
struct Args {
    /// Comma-separated list of source directories [env: BACKUP_SOURCES]
    #[arg(long, value_name = "PATHS")]
    sources: Option<String>,

    /// Destination directory root [env: BACKUP_DESTINATION]
    #[arg(long, value_name = "PATH")]
    dest: Option<PathBuf>,

    /// Log file path, default ./backup.log [env: BACKUP_LOGFILE]
    #[arg(long, value_name = "PATH")]
    logfile: Option<PathBuf>,

    /// Desktop notification binary, e.g. terminal-notifier [env: BACKUP_NOTIFIER]
    #[arg(long, value_name = "PATH")]
    notifier: Option<PathBuf>,

    /// Simulate without copying
    #[arg(long)]
    dry_run: bool,

    /// File with default settings
    #[arg(long, value_name = "PATH", default_value = ".env")]
    env_file: PathBuf,

    /// Print every file as it is processed
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            sources: self.sources.clone(),
            destination: self.dest.clone(),
            logfile: self.logfile.clone(),
            notifier: self.notifier.clone(),
            dry_run: self.dry_run,
        }
    }
}

const BAR_TEMPLATE: &str = "{msg} [{bar:40}] {pos}/{len} files ({elapsed})";

/// CLI implementation of ProgressCallback
///
/// Draws a file-count bar by default; verbose mode prints one line per file
/// instead and keeps the bar hidden.
struct CliProgress {
    verbose: bool,
    bar: ProgressBar,
}

impl CliProgress {
    fn new(verbose: bool) -> Self {
        let bar = if verbose {
            ProgressBar::hidden()
        } else {
            let style = ProgressStyle::default_bar()
                .template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> ");
            let bar = ProgressBar::new(0);
            bar.set_style(style);
            bar
        };
        CliProgress { verbose, bar }
    }

    fn format_bytes(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_idx = 0;

        while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
            size /= 1024.0;
            unit_idx += 1;
        }

        format!("{:.2} {}", size, UNITS[unit_idx])
    }

    fn format_duration(elapsed: Duration) -> String {
        let secs = elapsed.as_secs();
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        let secs = secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, mins, secs)
        } else if mins > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}s", secs)
        }
    }
}

impl ProgressCallback for CliProgress {
    fn on_job_started(&self, job: &BackupJob, plan: &BackupPlan) {
        self.bar.set_length(plan.items.len() as u64);
        self.bar.set_message(if job.dry_run { "Checking" } else { "Copying" });
        if !self.verbose {
            return;
        }
        eprintln!("{}", if job.dry_run { "Dry run" } else { "Backup" });
        for source in &job.sources {
            eprintln!("  Source: {}", source.display());
        }
        eprintln!("  Destination: {}", job.destination.display());
        eprintln!("  Log: {}", job.logfile.display());
        eprintln!(
            "  Total: {} across {} files",
            Self::format_bytes(plan.pending_bytes()),
            plan.items.len()
        );
        eprintln!();
    }

    fn on_file_completed(&self, _job: &BackupJob, file_index: usize, file: &FileItem) {
        self.bar.inc(1);
        if !self.verbose {
            return;
        }
        let status = match &file.result {
            Some(CopyResult::Copied { .. }) => "Copied".to_string(),
            Some(CopyResult::SkippedDryRun) => "Would copy".to_string(),
            Some(CopyResult::Skipped(reason)) => format!("Skipped ({})", reason),
            Some(CopyResult::Failed { reason, .. }) => format!("Failed: {}", reason),
            None => "Pending".to_string(),
        };
        eprintln!("[{:4}] {}: {}", file_index, status, file.relative_path.display());
    }

    fn on_job_completed(&self, _job: &BackupJob, summary: &JobSummary) {
        self.bar.finish_and_clear();
        if !self.verbose {
            return;
        }
        eprintln!();
        eprintln!("Bytes copied: {}", Self::format_bytes(summary.bytes_copied));
        eprintln!("Elapsed: {}", Self::format_duration(summary.elapsed));
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse arguments, run the backup and exit with the CLI status code
fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let exit_code = match run_cli(&args, &ProcessEnv) {
        Ok(summary) => {
            println!("{}", summary);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_CONFIG
        }
    };

    std::process::exit(exit_code);
}

/// Main CLI logic - separated for testability
///
/// Per-file failures are part of a successful summary; only configuration
/// and validation problems come back as errors.
fn run_cli(args: &Args, env: &dyn config::EnvSource) -> Result<JobSummary, EngineError> {
    let dotenv: HashMap<String, String> = config::load_dotenv(&args.env_file)?;
    let job = config::resolve(&args.overrides(), env, &dotenv)?;
    tracing::debug!(
        id = %job.id,
        sources = job.sources.len(),
        destination = %job.destination.display(),
        dry_run = job.dry_run,
        "resolved configuration"
    );

    let progress = CliProgress::new(args.verbose);
    run_backup(&job, Some(&progress))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn args(temp: &TempDir) -> Args {
        Args {
            sources: None,
            dest: None,
            logfile: Some(temp.path().join("backup.log")),
            notifier: None,
            dry_run: false,
            env_file: temp.path().join(".env"),
            verbose: false,
        }
    }

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_cli_copies_sources() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let src = temp.path().join("src");
        fs::create_dir_all(src.join(".git")).expect("Failed to create src");
        fs::write(src.join("notes.txt"), "hello").expect("Failed to write file");
        fs::write(src.join(".git/HEAD"), "ref").expect("Failed to write file");
        let dst = temp.path().join("dst");

        let mut args = args(&temp);
        args.sources = Some(src.display().to_string());
        args.dest = Some(dst.clone());

        let summary = run_cli(&args, &no_env()).expect("CLI should succeed");
        assert_eq!(summary.copied, 1);
        assert_eq!(fs::read_to_string(dst.join("notes.txt")).unwrap(), "hello");
        assert!(!dst.join(".git").exists());
    }

    #[test]
    fn test_cli_reads_env_file_defaults() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let src = temp.path().join("src");
        fs::create_dir_all(&src).expect("Failed to create src");
        fs::write(src.join("a.txt"), "a").expect("Failed to write file");
        let dst = temp.path().join("dst");
        fs::write(
            temp.path().join(".env"),
            format!("BACKUP_SOURCES={}\nBACKUP_DESTINATION={}\n", src.display(), dst.display()),
        )
        .expect("Failed to write env file");

        let summary = run_cli(&args(&temp), &no_env()).expect("CLI should succeed");
        assert_eq!(summary.copied, 1);
        assert!(dst.join("a.txt").is_file());
    }

    #[test]
    fn test_cli_environment_overrides_env_file() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let src = temp.path().join("src");
        fs::create_dir_all(&src).expect("Failed to create src");
        fs::write(src.join("a.txt"), "a").expect("Failed to write file");
        let from_env = temp.path().join("from_env");
        let from_file = temp.path().join("from_file");
        fs::write(
            temp.path().join(".env"),
            format!("BACKUP_SOURCES={}\nBACKUP_DESTINATION={}\n", src.display(), from_file.display()),
        )
        .expect("Failed to write env file");

        let mut env = no_env();
        env.insert("BACKUP_DESTINATION".to_string(), from_env.display().to_string());

        run_cli(&args(&temp), &env).expect("CLI should succeed");
        assert!(from_env.join("a.txt").is_file());
        assert!(!from_file.exists());
    }

    #[test]
    fn test_cli_dry_run_writes_nothing() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let src = temp.path().join("src");
        fs::create_dir_all(&src).expect("Failed to create src");
        fs::write(src.join("a.txt"), "a").expect("Failed to write file");
        let dst = temp.path().join("dst");

        let mut args = args(&temp);
        args.sources = Some(src.display().to_string());
        args.dest = Some(dst.clone());
        args.dry_run = true;

        let summary = run_cli(&args, &no_env()).expect("Dry run should succeed");
        assert_eq!(summary.would_copy, 1);
        assert!(!dst.exists());
    }

    #[test]
    fn test_cli_rejects_missing_sources() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let mut args = args(&temp);
        args.dest = Some(temp.path().join("dst"));

        let err = run_cli(&args, &no_env()).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_cli_rejects_missing_destination() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let mut args = args(&temp);
        args.sources = Some(temp.path().display().to_string());

        let err = run_cli(&args, &no_env()).unwrap_err();
        assert!(err.to_string().contains("destination"));
    }

    #[test]
    fn test_cli_rejects_nonexistent_source() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let mut args = args(&temp);
        args.sources = Some("/nonexistent/path".to_string());
        args.dest = Some(temp.path().join("dst"));

        let result = run_cli(&args, &no_env());
        assert!(matches!(result, Err(EngineError::SourceNotFound { .. })));
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = Args::try_parse_from([
            "backup",
            "--sources",
            "/a,/b",
            "--dest",
            "/mnt/usb",
            "--dry-run",
            "-v",
        ])
        .expect("Failed to parse args");
        assert_eq!(args.sources.as_deref(), Some("/a,/b"));
        assert_eq!(args.dest, Some(PathBuf::from("/mnt/usb")));
        assert!(args.dry_run);
        assert!(args.verbose);
        assert_eq!(args.env_file, PathBuf::from(".env"));
    }

    fn job_with_plan(temp: &TempDir, files: &[&str]) -> (BackupJob, BackupPlan) {
        let overrides = ConfigOverrides {
            sources: Some(temp.path().join("src").display().to_string()),
            destination: Some(temp.path().join("dst")),
            ..Default::default()
        };
        let job = config::resolve(&overrides, &no_env(), &no_env()).expect("Failed to resolve");
        let items = files
            .iter()
            .map(|name| FileItem {
                source_root: temp.path().join("src"),
                source_path: temp.path().join("src").join(name),
                relative_path: PathBuf::from(name),
                destination_path: temp.path().join("dst").join(name),
                file_size: 1,
                result: Some(CopyResult::Copied { bytes: 1 }),
            })
            .collect();
        (job, BackupPlan { items, hidden_skipped: 0 })
    }

    #[test]
    fn test_progress_bar_tracks_plan() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let (job, plan) = job_with_plan(&temp, &["a.txt", "b.txt", "c.txt"]);

        let progress = CliProgress::new(false);
        progress.on_job_started(&job, &plan);
        assert_eq!(progress.bar.length(), Some(3));

        for (idx, item) in plan.items.iter().take(2).enumerate() {
            progress.on_file_completed(&job, idx, item);
        }
        assert_eq!(progress.bar.position(), 2);

        progress.on_job_completed(&job, &JobSummary::from_plan(&plan, false, Duration::ZERO));
        assert!(progress.bar.is_finished());
    }

    #[test]
    fn test_verbose_mode_hides_progress_bar() {
        let progress = CliProgress::new(true);
        assert!(progress.bar.is_hidden());
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(CliProgress::format_bytes(512), "512.00 B");
        assert_eq!(CliProgress::format_bytes(2048), "2.00 KB");
        assert_eq!(CliProgress::format_duration(Duration::from_secs(3725)), "1h 2m 5s");
        assert_eq!(CliProgress::format_duration(Duration::from_secs(42)), "42s");
    }
}
