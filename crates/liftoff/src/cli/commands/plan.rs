//! Plan command

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use console::style;
use liftoff_upload::{ReservationDocument, UploadOperation, UploadPlan};
use serde::Serialize;
use tracing::info;

use super::{read_reservation, PlanRejected};
use crate::cli::output;
use crate::cli::{Cli, OutputFormat};

/// Show how a reservation splits an asset into parts
#[derive(Debug, Clone, Args)]
pub struct PlanCommand {
    /// Reserve response or bare operation list (`-` reads stdin)
    #[arg(short, long)]
    pub reservation: PathBuf,

    /// Asset file to check the operations against
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanView<'a> {
    asset_size: u64,
    parts: usize,
    bytes: u64,
    complete: bool,
    issues: Vec<String>,
    operations: &'a [UploadOperation],
}

/// Size of the asset the operations should cover.
///
/// The file on disk wins; otherwise the size declared by the reservation, and
/// failing that the furthest byte any operation reaches.
fn asset_size(document: &ReservationDocument, file: Option<&PathBuf>) -> anyhow::Result<u64> {
    if let Some(path) = file {
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        return Ok(metadata.len());
    }

    let declared = match document {
        ReservationDocument::Reservation(reservation) => reservation.data.attributes.file_size,
        ReservationDocument::Attributes(attributes) => attributes.file_size,
        ReservationDocument::Operations(_) => None,
    };

    Ok(declared.unwrap_or_else(|| {
        document
            .upload_operations()
            .iter()
            .filter_map(|op| op.range())
            .map(|range| range.end)
            .max()
            .unwrap_or(0)
    }))
}

impl PlanCommand {
    /// Execute the plan command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(reservation = %self.reservation.display(), "executing plan command");

        let document = read_reservation(&self.reservation)?;
        let operations = document.upload_operations();
        let plan = UploadPlan::new(operations, asset_size(&document, self.file.as_ref())?);

        match cli.format {
            OutputFormat::Json => {
                let view = PlanView {
                    asset_size: plan.asset_size,
                    parts: plan.parts,
                    bytes: plan.bytes,
                    complete: plan.is_complete(),
                    issues: plan.issues.iter().map(ToString::to_string).collect(),
                    operations,
                };
                println!("{}", serde_json::to_string_pretty(&view)?);
            }
            OutputFormat::Text if !cli.quiet => {
                println!("{}", output::header("Upload plan"));
                println!("{}", output::key_value("Asset", &output::bytes(plan.asset_size)));
                println!("{}", output::key_value("Parts", &plan.parts.to_string()));
                println!("{}", output::key_value("Covered", &output::bytes(plan.bytes)));
                println!();
                for (index, op) in operations.iter().enumerate() {
                    let headers = op.headers().count();
                    println!(
                        "  {:>4}  {}  {}",
                        style(index).dim(),
                        op,
                        style(format!("{} header(s)", headers)).dim()
                    );
                }
                println!();
                if plan.is_complete() {
                    output::success("Every byte is covered exactly once");
                } else {
                    for issue in &plan.issues {
                        output::warning(&issue.to_string());
                    }
                }
            }
            OutputFormat::Text => {}
        }

        if self.file.is_some() && !plan.is_complete() {
            return Err(PlanRejected {
                issues: plan.issues.len(),
            }
            .into());
        }
        Ok(())
    }
}
