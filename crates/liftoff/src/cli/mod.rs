//! CLI definition and command handling

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use liftoff_upload::{config, UploadConfig};
use tracing::debug;

use commands::{
    ChecksumCommand, CompletionsCommand, PlanCommand, ReserveCommand, UploadCommand,
};

/// Liftoff - upload App Store Connect assets in parts
#[derive(Debug, Parser)]
#[command(name = "liftoff")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log debug output to the console
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<PathBuf>,

    /// Configuration file (defaults to liftoff.toml found from the working directory up)
    #[arg(long, global = true, env = "LIFTOFF_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upload every part of an asset and emit its commit request
    Upload(UploadCommand),

    /// Check a reservation's upload operations against an asset
    Plan(PlanCommand),

    /// Print the MD5 checksum the commit call expects
    Checksum(ChecksumCommand),

    /// Build the reserve request for an asset
    Reserve(ReserveCommand),

    /// Generate shell completions
    Completions(CompletionsCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> anyhow::Result<()> {
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)
                .with_context(|| format!("cannot change to {}", dir.display()))?;
        }

        match self.command {
            Commands::Upload(ref cmd) => cmd.execute(&self),
            Commands::Plan(ref cmd) => cmd.execute(&self),
            Commands::Checksum(ref cmd) => cmd.execute(&self),
            Commands::Reserve(ref cmd) => cmd.execute(&self),
            Commands::Completions(ref cmd) => cmd.execute(&self),
        }
    }

    /// Whether human-readable progress and messages should be printed
    pub fn is_interactive(&self) -> bool {
        !self.quiet && self.format == OutputFormat::Text
    }

    /// Resolve the upload configuration.
    ///
    /// An explicit `--config` must load; otherwise the nearest config file is
    /// used when present. Environment overrides apply on top of either.
    pub fn load_config(&self) -> anyhow::Result<UploadConfig> {
        let cwd = std::env::current_dir()?;
        self.load_config_in(&cwd)
    }

    /// Resolve the upload configuration, discovering files from `dir`
    pub fn load_config_in(&self, dir: &Path) -> anyhow::Result<UploadConfig> {
        let mut config = match &self.config {
            Some(path) => config::load_config(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => {
                let (config, path) = config::load_config_or_default(dir)
                    .context("loading config")?;
                if let Some(path) = path {
                    debug!(path = %path.display(), "using config file");
                }
                config
            }
        };
        config
            .apply_env_overrides()
            .context("applying environment overrides")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "liftoff", "--format", "json", "-q", "checksum", "a.png",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.quiet);
        assert!(!cli.is_interactive());
        assert!(matches!(cli.command, Commands::Checksum(_)));
    }

    #[test]
    fn test_verbose_flag() {
        let cli = Cli::try_parse_from(["liftoff", "checksum", "a.png", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(
            crate::console_filter_directives(cli.verbose),
            "liftoff=debug,liftoff_upload=debug"
        );
        assert_eq!(crate::console_filter_directives(false), "warn");
    }

    #[test]
    fn test_invalid_discovered_config_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("liftoff.toml"), "requests_per_second = 0\n").unwrap();
        let cli = Cli::try_parse_from(["liftoff", "checksum", "a.png"]).unwrap();

        let err = cli.load_config_in(dir.path()).unwrap_err();
        assert_eq!(crate::exit_codes::for_error(&err), crate::exit_codes::CONFIG_ERROR);
    }

    #[test]
    fn test_explicit_config_must_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("liftoff.toml");
        let cli = Cli::try_parse_from([
            "liftoff",
            "--config",
            missing.to_str().unwrap(),
            "checksum",
            "a.png",
        ])
        .unwrap();
        assert!(cli.load_config().is_err());
    }

    #[test]
    fn test_explicit_config_is_used() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("liftoff.toml");
        std::fs::write(&path, "max_in_flight = 3\nburst = 4\n").unwrap();
        let cli = Cli::try_parse_from([
            "liftoff",
            "--config",
            path.to_str().unwrap(),
            "checksum",
            "a.png",
        ])
        .unwrap();

        let config = cli.load_config().unwrap();
        assert_eq!(config.burst, 4);
    }
}
