//! Checksum command

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use liftoff_upload::checksum;
use serde::Serialize;
use tracing::info;

use crate::cli::{Cli, OutputFormat};

/// Print the MD5 checksum of one or more assets
#[derive(Debug, Clone, Args)]
pub struct ChecksumCommand {
    /// Asset files
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
struct FileChecksum {
    path: PathBuf,
    md5: String,
}

impl ChecksumCommand {
    /// Execute the checksum command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(files = self.files.len(), "executing checksum command");

        let checksums = self
            .files
            .iter()
            .map(|path| {
                let md5 = checksum::md5_file(path)
                    .with_context(|| format!("cannot checksum {}", path.display()))?;
                Ok(FileChecksum {
                    path: path.clone(),
                    md5,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        match cli.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&checksums)?),
            OutputFormat::Text => {
                for entry in &checksums {
                    println!("{}  {}", entry.md5, entry.path.display());
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

    #[test]
    fn test_requires_a_file() {
        assert!(Cli::try_parse_from(["liftoff", "checksum"]).is_err());
    }

    #[test]
    fn test_missing_file_fails() {
        let cli = Cli::try_parse_from(["liftoff", "checksum", "/nonexistent/home.png"]).unwrap();
        let crate::cli::Commands::Checksum(cmd) = &cli.command else {
            panic!("expected checksum command");
        };

        let err = cmd.execute(&cli).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/home.png"));
    }
}
