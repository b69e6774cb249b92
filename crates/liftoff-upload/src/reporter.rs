//! Upload progress reporting

use std::time::Duration;

/// Events emitted while an asset is uploaded
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// The upload is starting
    Started { parts: usize, bytes: u64 },
    /// A part request is being sent
    PartStarted { index: usize, offset: u64, length: u64 },
    /// A part was accepted by its destination
    PartCompleted {
        index: usize,
        bytes: u64,
        duration: Duration,
    },
    /// A part failed
    PartFailed { index: usize, error: String },
    /// Every part reached a terminal state
    Finished {
        succeeded: usize,
        failed: usize,
        duration: Duration,
    },
}

/// Trait for reporting upload progress
pub trait UploadReporter: Send + Sync {
    /// Handle an upload event
    fn report(&self, event: &UploadEvent);
}

/// Reporter that logs to tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl UploadReporter for TracingReporter {
    fn report(&self, event: &UploadEvent) {
        match event {
            UploadEvent::Started { parts, bytes } => {
                tracing::info!(parts, bytes, "starting asset upload");
            }
            UploadEvent::PartStarted {
                index,
                offset,
                length,
            } => {
                tracing::debug!(index, offset, length, "uploading part");
            }
            UploadEvent::PartCompleted {
                index,
                bytes,
                duration,
            } => {
                tracing::debug!(
                    index,
                    bytes,
                    "part uploaded in {:.2}s",
                    duration.as_secs_f64()
                );
            }
            UploadEvent::PartFailed { index, error } => {
                tracing::warn!(index, "part failed: {}", error);
            }
            UploadEvent::Finished {
                succeeded,
                failed,
                duration,
            } => {
                tracing::info!(
                    "asset upload finished: {} succeeded, {} failed ({:.1}s)",
                    succeeded,
                    failed,
                    duration.as_secs_f64()
                );
            }
        }
    }
}

/// Reporter that collects events for later inspection (useful for testing)
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: std::sync::Mutex<Vec<UploadEvent>>,
}

impl CollectingReporter {
    /// Get all collected events
    pub fn events(&self) -> Vec<UploadEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl UploadReporter for CollectingReporter {
    fn report(&self, event: &UploadEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_reporter_keeps_order() {
        let reporter = CollectingReporter::default();
        reporter.report(&UploadEvent::Started { parts: 1, bytes: 10 });
        reporter.report(&UploadEvent::PartFailed {
            index: 0,
            error: "boom".to_string(),
        });

        let events = reporter.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], UploadEvent::Started { parts: 1, bytes: 10 });
        assert!(matches!(events[1], UploadEvent::PartFailed { index: 0, .. }));
    }

    #[test]
    fn test_tracing_reporter_handles_every_event() {
        let reporter = TracingReporter;
        for event in [
            UploadEvent::Started { parts: 2, bytes: 4 },
            UploadEvent::PartStarted {
                index: 0,
                offset: 0,
                length: 2,
            },
            UploadEvent::PartCompleted {
                index: 0,
                bytes: 2,
                duration: Duration::from_millis(5),
            },
            UploadEvent::PartFailed {
                index: 1,
                error: "refused".to_string(),
            },
            UploadEvent::Finished {
                succeeded: 1,
                failed: 1,
                duration: Duration::from_millis(9),
            },
        ] {
            reporter.report(&event);
        }
    }
}
