//! Chunked asset uploads for App Store Connect
//!
//! Screenshots, previews and other media are uploaded to App Store Connect
//! in parts. Reserving an asset returns a list of [`UploadOperation`]s, each
//! naming a byte range of the file and a pre-signed destination. This crate
//! sends those parts concurrently and reports every part that failed, so the
//! caller knows whether it is safe to commit the asset.
//!
//! ## Usage
//!
//! ```no_run
//! use liftoff_upload::{checksum, ReservationDocument, UploadConfig, Uploader};
//! use tokio_util::sync::CancellationToken;
//! use std::path::Path;
//!
//! # async fn example(reserve_response: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let reservation = ReservationDocument::parse(reserve_response)?;
//! let uploader = Uploader::new(UploadConfig::default())?;
//!
//! let path = Path::new("screenshots/en-US/home.png");
//! let report = uploader
//!     .upload_file(reservation.upload_operations(), path, &CancellationToken::new())
//!     .await?
//!     .into_result()?;
//! println!("{}", report);
//!
//! let commit = reservation
//!     .reservation()
//!     .map(|r| r.commit(checksum::md5_file(path).ok()));
//! # Ok(())
//! # }
//! ```

pub mod checksum;
pub mod config;
pub mod error;
pub mod limiter;
pub mod operation;
pub mod plan;
pub mod report;
pub mod reporter;
pub mod reservation;
pub mod uploader;

#[cfg(test)]
mod test_support;

pub use config::UploadConfig;
pub use error::{ConfigError, Result, UploadError};
pub use limiter::RateLimiter;
pub use operation::{UploadOperation, UploadOperationHeader};
pub use plan::{PlanIssue, UploadPlan};
pub use report::{UploadOperationError, UploadReport};
pub use reporter::{CollectingReporter, TracingReporter, UploadEvent, UploadReporter};
pub use reservation::{
    AssetDeliveryState, AssetKind, AssetReservation, CommitRequest, DeliveryState,
    ReservationDocument, ReservationRequest,
};
pub use uploader::Uploader;
