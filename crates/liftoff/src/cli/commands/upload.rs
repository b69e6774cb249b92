//! Upload command

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use console::style;
use liftoff_upload::{
    checksum, CommitRequest, UploadConfig, UploadOperation, UploadPlan, UploadReport, Uploader,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{read_reservation, PlanRejected, UploadFailed};
use crate::cli::output::{self, ProgressReporter};
use crate::cli::{Cli, OutputFormat};

/// Upload every part of an asset
#[derive(Debug, Clone, Args)]
pub struct UploadCommand {
    /// Asset file to upload
    pub file: PathBuf,

    /// Reserve response or bare operation list (`-` reads stdin)
    #[arg(short, long)]
    pub reservation: PathBuf,

    /// Write the commit request to this file
    #[arg(long)]
    pub commit_out: Option<PathBuf>,

    /// Check the operations against the file without uploading
    #[arg(long)]
    pub dry_run: bool,

    /// Abandon the upload after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Maximum number of parts in flight
    #[arg(long)]
    pub max_in_flight: Option<usize>,

    /// Maximum requests started per second
    #[arg(long)]
    pub rps: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadSummary<'a> {
    file: &'a Path,
    parts: usize,
    succeeded: usize,
    failed: usize,
    bytes_sent: u64,
    duration_ms: u64,
    cancelled: bool,
    timed_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    commit: Option<CommitRequest>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failures: Vec<FailedPart<'a>>,
}

#[derive(Debug, Serialize)]
struct FailedPart<'a> {
    index: usize,
    operation: &'a UploadOperation,
    error: String,
}

impl<'a> UploadSummary<'a> {
    fn new(file: &'a Path, report: &'a UploadReport) -> Self {
        Self {
            file,
            parts: report.total,
            succeeded: report.succeeded,
            failed: report.failed(),
            bytes_sent: report.bytes_sent,
            duration_ms: report.duration.as_millis() as u64,
            cancelled: report.was_cancelled(),
            timed_out: report.timed_out(),
            checksum: None,
            commit: None,
            failures: report
                .failures
                .iter()
                .map(|failure| FailedPart {
                    index: failure.index,
                    operation: &failure.operation,
                    error: failure.error.to_string(),
                })
                .collect(),
        }
    }
}

impl UploadCommand {
    /// Execute the upload command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run(cli))
    }

    /// Apply command-line overrides on top of the resolved config
    fn apply_overrides(&self, config: &mut UploadConfig) -> anyhow::Result<()> {
        if let Some(timeout) = self.timeout {
            config.upload_timeout_secs = Some(timeout);
        }
        if let Some(max) = self.max_in_flight {
            config.max_in_flight = Some(max);
        }
        if let Some(rps) = self.rps {
            config.requests_per_second = Some(rps);
        }
        config.validate()?;
        Ok(())
    }

    async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(file = %self.file.display(), dry_run = self.dry_run, "executing upload command");

        let document = read_reservation(&self.reservation)?;
        let operations = document.upload_operations();
        if operations.is_empty() {
            anyhow::bail!("reservation has no upload operations");
        }

        let size = std::fs::metadata(&self.file)
            .with_context(|| format!("cannot read {}", self.file.display()))?
            .len();
        let plan = UploadPlan::new(operations, size);
        if !cli.quiet {
            for issue in &plan.issues {
                output::warning(&issue.to_string());
            }
        }

        if self.dry_run {
            if cli.is_interactive() {
                println!(
                    "{} {} parts, {} of {}",
                    style("Dry run:").yellow(),
                    plan.parts,
                    output::bytes(plan.bytes),
                    output::bytes(plan.asset_size)
                );
            }
            if !plan.is_complete() {
                return Err(PlanRejected {
                    issues: plan.issues.len(),
                }
                .into());
            }
            if cli.is_interactive() {
                output::success("Operations cover the asset");
            }
            return Ok(());
        }

        let mut config = cli.load_config()?;
        self.apply_overrides(&mut config)?;

        let reporter = Arc::new(ProgressReporter::new(cli.is_interactive()));
        let uploader = Uploader::new(config)?.with_reporter(reporter);

        if cli.is_interactive() {
            println!(
                "{} {} ({} parts, {})",
                style("Uploading").cyan(),
                style(self.file.display()).bold(),
                operations.len(),
                output::bytes(size)
            );
        }

        let cancel = CancellationToken::new();
        let interrupt = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupted, cancelling upload");
                    cancel.cancel();
                }
            })
        };
        let report = uploader.upload_file(operations, &self.file, &cancel).await;
        interrupt.abort();
        let report = report.with_context(|| format!("cannot open {}", self.file.display()))?;

        let mut summary = UploadSummary::new(&self.file, &report);

        if !report.is_success() {
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
                OutputFormat::Text if !cli.quiet => {
                    for failure in &report.failures {
                        output::error(&failure.to_string());
                    }
                }
                OutputFormat::Text => {}
            }
            return Err(UploadFailed {
                failed: report.failed(),
                total: report.total,
                cancelled: report.was_cancelled(),
                timed_out: report.timed_out(),
            }
            .into());
        }

        let digest = checksum::md5_file(&self.file)
            .with_context(|| format!("cannot checksum {}", self.file.display()))?;
        let commit = document
            .reservation()
            .map(|reservation| reservation.commit(Some(digest.clone())));
        summary.checksum = Some(digest);

        if let Some(path) = &self.commit_out {
            match &commit {
                Some(commit) => {
                    std::fs::write(path, serde_json::to_string_pretty(commit)?)
                        .with_context(|| format!("cannot write {}", path.display()))?;
                    info!(path = %path.display(), "commit request written");
                }
                None => output::warning("input had no reservation; no commit request written"),
            }
        }
        summary.commit = commit;

        match cli.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
            OutputFormat::Text => {
                if !cli.quiet {
                    output::success(&report.to_string());
                    let digest = summary.checksum.as_deref().unwrap_or_default();
                    println!("{}", output::key_value("Checksum", digest));
                }
                if let (Some(commit), None) = (&summary.commit, &self.commit_out) {
                    if !cli.quiet {
                        println!("{}", output::header(&format!("PATCH {}", commit.path())));
                    }
                    println!("{}", serde_json::to_string_pretty(commit)?);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use liftoff_upload::{UploadError, UploadOperationError};
    use std::time::Duration;

    fn command(args: &[&str]) -> (Cli, UploadCommand) {
        let mut argv = vec!["liftoff"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        let cmd = match &cli.command {
            crate::cli::Commands::Upload(cmd) => cmd.clone(),
            other => panic!("unexpected command {:?}", other),
        };
        (cli, cmd)
    }

    fn write_fixture(dir: &Path, operations: &str) -> (PathBuf, PathBuf) {
        let asset = dir.join("home.png");
        std::fs::write(&asset, vec![7u8; 300]).unwrap();
        let reservation = dir.join("reservation.json");
        std::fs::write(&reservation, operations).unwrap();
        (asset, reservation)
    }

    #[test]
    fn test_flag_overrides() {
        let (_, cmd) = command(&[
            "upload", "a.png", "-r", "r.json", "--timeout", "30", "--max-in-flight", "2", "--rps",
            "5",
        ]);
        let mut config = UploadConfig::default();
        cmd.apply_overrides(&mut config).unwrap();

        assert_eq!(config.upload_timeout_secs, Some(30));
        assert_eq!(config.max_in_flight, Some(2));
        assert_eq!(config.requests_per_second, Some(5));
    }

    #[test]
    fn test_invalid_override_rejected() {
        let (_, cmd) = command(&["upload", "a.png", "-r", "r.json", "--max-in-flight", "0"]);
        let mut config = UploadConfig::default();
        assert!(cmd.apply_overrides(&mut config).is_err());
    }

    #[test]
    fn test_dry_run_accepts_complete_plan() {
        let dir = tempfile::TempDir::new().unwrap();
        let (asset, reservation) = write_fixture(
            dir.path(),
            r#"[{"method":"PUT","url":"https://cdn.example.com/a","offset":0,"length":150},
                {"method":"PUT","url":"https://cdn.example.com/b","offset":150,"length":150}]"#,
        );
        let (cli, cmd) = command(&[
            "-q",
            "upload",
            asset.to_str().unwrap(),
            "-r",
            reservation.to_str().unwrap(),
            "--dry-run",
        ]);

        cmd.execute(&cli).unwrap();
    }

    #[test]
    fn test_dry_run_rejects_gap() {
        let dir = tempfile::TempDir::new().unwrap();
        let (asset, reservation) = write_fixture(
            dir.path(),
            r#"[{"method":"PUT","url":"https://cdn.example.com/a","offset":0,"length":150}]"#,
        );
        let (cli, cmd) = command(&[
            "-q",
            "upload",
            asset.to_str().unwrap(),
            "-r",
            reservation.to_str().unwrap(),
            "--dry-run",
        ]);

        let err = cmd.execute(&cli).unwrap_err();
        assert_eq!(err.downcast_ref::<PlanRejected>().unwrap().issues, 1);
    }

    #[test]
    fn test_empty_reservation_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let (asset, reservation) = write_fixture(dir.path(), "[]");
        let (cli, cmd) = command(&[
            "-q",
            "upload",
            asset.to_str().unwrap(),
            "-r",
            reservation.to_str().unwrap(),
        ]);

        let err = cmd.execute(&cli).unwrap_err();
        assert!(err.to_string().contains("no upload operations"));
    }

    #[test]
    fn test_unreachable_destination_fails_every_part() {
        let dir = tempfile::TempDir::new().unwrap();
        let (asset, reservation) = write_fixture(
            dir.path(),
            r#"[{"method":"PUT","url":"http://127.0.0.1:1/a","offset":0,"length":150},
                {"method":"PUT","url":"http://127.0.0.1:1/b","offset":150,"length":150}]"#,
        );
        let (cli, cmd) = command(&[
            "-q",
            "upload",
            asset.to_str().unwrap(),
            "-r",
            reservation.to_str().unwrap(),
        ]);

        let err = cmd.execute(&cli).unwrap_err();
        let failed = err.downcast_ref::<UploadFailed>().unwrap();
        assert_eq!(failed.failed, 2);
        assert_eq!(failed.total, 2);
        assert!(!failed.cancelled);
        assert!(!failed.timed_out);
    }

    #[test]
    fn test_deadline_is_not_reported_as_cancellation() {
        // Accepts connections into the backlog but never answers.
        let silent = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = silent.local_addr().unwrap().port();

        let dir = tempfile::TempDir::new().unwrap();
        let operations = format!(
            r#"[{{"method":"PUT","url":"http://127.0.0.1:{port}/a","offset":0,"length":300}}]"#
        );
        let (asset, reservation) = write_fixture(dir.path(), &operations);
        let (cli, cmd) = command(&[
            "-q",
            "upload",
            asset.to_str().unwrap(),
            "-r",
            reservation.to_str().unwrap(),
            "--timeout",
            "1",
        ]);

        let err = cmd.execute(&cli).unwrap_err();
        let failed = err.downcast_ref::<UploadFailed>().unwrap();
        assert!(failed.timed_out);
        assert!(!failed.cancelled);
        assert_eq!(crate::exit_codes::for_error(&err), crate::exit_codes::UPLOAD_FAILED);
        drop(silent);
    }

    #[test]
    fn test_summary_lists_failures() {
        let report = UploadReport {
            total: 2,
            succeeded: 1,
            bytes_sent: 150,
            failures: vec![UploadOperationError {
                index: 1,
                operation: UploadOperation::new("PUT", "https://cdn.example.com/b", 150, 150),
                error: UploadError::MissingUploadDestination,
            }],
            duration: Duration::from_millis(42),
        };

        let summary = UploadSummary::new(Path::new("home.png"), &report);
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["parts"], 2);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["durationMs"], 42);
        assert_eq!(json["cancelled"], false);
        assert_eq!(json["timedOut"], false);
        assert_eq!(json["failures"][0]["index"], 1);
        assert!(json.get("commit").is_none());
    }
}
