//! Reserve command

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, ValueEnum};
use liftoff_upload::{AssetKind, ReservationRequest};
use tracing::info;

use crate::cli::output;
use crate::cli::Cli;

/// Build the JSON body that reserves an asset
#[derive(Debug, Clone, Args)]
pub struct ReserveCommand {
    /// Asset file to reserve
    pub file: PathBuf,

    /// Kind of asset
    #[arg(short, long, value_enum, default_value = "screenshot")]
    pub kind: KindArg,

    /// ID of the set or achievement that will own the asset
    #[arg(short, long)]
    pub parent: String,
}

/// Asset kinds accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// App screenshot (parent: screenshot set)
    Screenshot,
    /// App preview video (parent: preview set)
    Preview,
    /// Game Center achievement image (parent: achievement localization)
    AchievementImage,
}

impl From<KindArg> for AssetKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Screenshot => AssetKind::AppScreenshot,
            KindArg::Preview => AssetKind::AppPreview,
            KindArg::AchievementImage => AssetKind::GameCenterAchievementImage,
        }
    }
}

impl ReserveCommand {
    /// Build the reservation request for the file
    fn request(&self) -> anyhow::Result<ReservationRequest> {
        let size = std::fs::metadata(&self.file)
            .with_context(|| format!("cannot read {}", self.file.display()))?
            .len();
        let name = self
            .file
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("{} has no usable file name", self.file.display()))?;

        Ok(ReservationRequest::new(
            self.kind.into(),
            name,
            size,
            self.parent.as_str(),
        ))
    }

    /// Execute the reserve command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(file = %self.file.display(), kind = ?self.kind, "executing reserve command");

        let request = self.request()?;
        if cli.is_interactive() {
            println!(
                "{}",
                output::header(&format!("POST /{}", request.data.resource_type))
            );
        }
        println!("{}", serde_json::to_string_pretty(&request)?);

        Ok(())
    }
}
