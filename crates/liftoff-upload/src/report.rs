//! Upload outcome aggregation

use std::fmt;
use std::time::Duration;

use crate::error::UploadError;
use crate::operation::UploadOperation;

/// A failed part paired with its cause, so it can be retried later
#[derive(Debug)]
pub struct UploadOperationError {
    /// Position of the operation in the list passed to the uploader
    pub index: usize,
    /// The operation that failed
    pub operation: UploadOperation,
    /// Why it failed
    pub error: UploadError,
}

impl fmt::Display for UploadOperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "part {} ({}): {}", self.index, self.operation, self.error)
    }
}

impl std::error::Error for UploadOperationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Outcome of uploading every part of one asset
#[derive(Debug, Default)]
pub struct UploadReport {
    /// Number of operations passed in
    pub total: usize,
    /// Number of parts accepted by their destination
    pub succeeded: usize,
    /// Bytes sent in accepted parts
    pub bytes_sent: u64,
    /// Every failed part, in the order failures were collected
    pub failures: Vec<UploadOperationError>,
    /// Wall time of the whole upload
    pub duration: Duration,
}

impl UploadReport {
    /// True only when no part failed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of failed parts
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// The first failure collected, if any
    pub fn first_error(&self) -> Option<&UploadOperationError> {
        self.failures.first()
    }

    /// Whether any part was stopped by the caller cancelling
    pub fn was_cancelled(&self) -> bool {
        self.failures.iter().any(|f| f.error.is_cancellation())
    }

    /// Whether any part was stopped by the upload deadline
    pub fn timed_out(&self) -> bool {
        self.failures.iter().any(|f| f.error.is_timeout())
    }

    /// Operations that need to be retried
    pub fn failed_operations(&self) -> impl Iterator<Item = &UploadOperation> {
        self.failures.iter().map(|f| &f.operation)
    }

    /// Convert into a `Result`, surfacing the first failure
    pub fn into_result(self) -> std::result::Result<Self, UploadOperationError> {
        if self.failures.is_empty() {
            return Ok(self);
        }
        let mut failures = self.failures;
        Err(failures.swap_remove(0))
    }
}

impl fmt::Display for UploadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} parts uploaded ({} bytes) in {:.1}s",
            self.succeeded,
            self.total,
            self.bytes_sent,
            self.duration.as_secs_f64()
        )?;
        if !self.failures.is_empty() {
            write!(f, ", {} failed", self.failures.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(index: usize, error: UploadError) -> UploadOperationError {
        UploadOperationError {
            index,
            operation: UploadOperation::new("PUT", format!("https://cdn.example.com/{index}"), 0, 1),
            error,
        }
    }

    #[test]
    fn test_empty_report_is_success() {
        let report = UploadReport {
            total: 3,
            succeeded: 3,
            bytes_sent: 30,
            ..Default::default()
        };
        assert!(report.is_success());
        assert!(report.first_error().is_none());
        assert_eq!(report.into_result().unwrap().succeeded, 3);
    }

    #[test]
    fn test_into_result_returns_first_failure() {
        let report = UploadReport {
            total: 3,
            succeeded: 1,
            failures: vec![
                failure(2, UploadError::MissingChunkBounds),
                failure(0, UploadError::MissingUploadDestination),
            ],
            ..Default::default()
        };

        assert_eq!(report.failed(), 2);
        assert_eq!(report.failed_operations().count(), 2);
        assert!(!report.was_cancelled());

        let err = report.into_result().unwrap_err();
        assert_eq!(err.index, 2);
        assert!(matches!(err.error, UploadError::MissingChunkBounds));
    }

    #[test]
    fn test_failure_display_names_the_part() {
        let err = failure(4, UploadError::Cancelled);
        assert_eq!(
            err.to_string(),
            "part 4 (PUT https://cdn.example.com/4 [0..1)): upload cancelled"
        );
    }

    #[test]
    fn test_cancelled_and_timed_out() {
        let cancelled = UploadReport {
            total: 2,
            failures: vec![failure(1, UploadError::Cancelled)],
            ..Default::default()
        };
        assert!(cancelled.was_cancelled());
        assert!(!cancelled.timed_out());

        let expired = UploadReport {
            total: 2,
            failures: vec![failure(1, UploadError::TimedOut)],
            ..Default::default()
        };
        assert!(expired.timed_out());
        assert!(!expired.was_cancelled());
    }
}
