//! CLI commands

mod checksum;
mod completions;
mod plan;
mod reserve;
mod upload;

pub use checksum::ChecksumCommand;
pub use completions::CompletionsCommand;
pub use plan::PlanCommand;
pub use reserve::ReserveCommand;
pub use upload::UploadCommand;

use std::fmt;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use liftoff_upload::ReservationDocument;
use thiserror::Error;

/// Some parts of the asset were not accepted
#[derive(Debug)]
pub struct UploadFailed {
    pub failed: usize,
    pub total: usize,
    /// The user cancelled the upload
    pub cancelled: bool,
    /// The upload deadline expired
    pub timed_out: bool,
}

impl fmt::Display for UploadFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} parts failed to upload", self.failed, self.total)?;
        if self.cancelled {
            f.write_str(" (cancelled)")?;
        } else if self.timed_out {
            f.write_str(" (timed out)")?;
        }
        Ok(())
    }
}

impl std::error::Error for UploadFailed {}

/// The upload operations do not cover the asset cleanly
#[derive(Debug, Error)]
#[error("upload plan has {issues} issue(s)")]
pub struct PlanRejected {
    pub issues: usize,
}

/// Read a reservation document from a file, or from stdin when `path` is `-`
pub(crate) fn read_reservation(path: &Path) -> anyhow::Result<ReservationDocument> {
    let json = if path == Path::new("-") {
        let mut json = String::new();
        std::io::stdin()
            .read_to_string(&mut json)
            .context("reading reservation from stdin")?;
        json
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("reading reservation {}", path.display()))?
    };

    ReservationDocument::parse(&json)
        .context("reservation is not a reserve response or operation list")
}
