//! Exit codes for the CLI

use liftoff_upload::ConfigError;

use crate::cli::commands::{PlanRejected, UploadFailed};

/// Success
pub const SUCCESS: i32 = 0;

/// General error
pub const ERROR: i32 = 1;

/// Configuration error
pub const CONFIG_ERROR: i32 = 2;

/// Upload operations do not fit the asset
pub const VALIDATION_ERROR: i32 = 5;

/// One or more parts failed to upload
pub const UPLOAD_FAILED: i32 = 6;

/// User cancelled
pub const CANCELLED: i32 = 130;

/// Map a command error to the process exit code
pub fn for_error(error: &anyhow::Error) -> i32 {
    if let Some(failed) = error.downcast_ref::<UploadFailed>() {
        if failed.cancelled {
            CANCELLED
        } else {
            UPLOAD_FAILED
        }
    } else if error.downcast_ref::<PlanRejected>().is_some() {
        VALIDATION_ERROR
    } else if error.downcast_ref::<ConfigError>().is_some() {
        CONFIG_ERROR
    } else {
        ERROR
    }
}
