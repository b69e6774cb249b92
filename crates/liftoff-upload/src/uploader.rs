//! Upload coordinator
//!
//! Turns the upload operations of a reservation into concurrent part
//! requests against their pre-signed destinations and collects every
//! per-part failure into one [`UploadReport`].
//!
//! Chunks are read from the source one after another before any request is
//! dispatched, so concurrent parts never share a read cursor. Assets handled
//! here (screenshots, previews, images) are small enough to hold in memory.

use std::io::{Cursor, Read, Seek};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use reqwest::Client;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::sleep_until;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::UploadConfig;
use crate::error::{Result, UploadError};
use crate::limiter::RateLimiter;
use crate::operation::UploadOperation;
use crate::report::{UploadOperationError, UploadReport};
use crate::reporter::{TracingReporter, UploadEvent, UploadReporter};

/// Uploads the parts of an asset to their reserved destinations
pub struct Uploader {
    config: UploadConfig,
    /// Plain client shared by every part; carries no credentials
    client: Client,
    limiter: Option<Arc<RateLimiter>>,
    reporter: Arc<dyn UploadReporter>,
}

/// A part whose bytes have been read and is ready to send
struct PreparedPart {
    index: usize,
    operation: UploadOperation,
    data: Vec<u8>,
}

/// Everything a part task needs, cloned per task
#[derive(Clone)]
struct PartContext {
    client: Client,
    limiter: Option<Arc<RateLimiter>>,
    semaphore: Option<Arc<Semaphore>>,
    reporter: Arc<dyn UploadReporter>,
    cancel: CancellationToken,
    deadline: Option<tokio::time::Instant>,
}

impl Uploader {
    /// Create an uploader with its own HTTP client
    pub fn new(config: UploadConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;

        Self::with_client(client, config)
    }

    /// Create an uploader around an existing client
    pub fn with_client(client: Client, config: UploadConfig) -> Result<Self> {
        config.validate()?;
        let limiter = config
            .requests_per_second
            .map(|rps| Arc::new(RateLimiter::new(rps, config.burst)));

        Ok(Self {
            config,
            client,
            limiter,
            reporter: Arc::new(TracingReporter),
        })
    }

    /// Replace the progress reporter
    pub fn with_reporter(mut self, reporter: Arc<dyn UploadReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Upload every part of `source` described by `operations`.
    ///
    /// Returns once every part has succeeded, failed, or been cancelled.
    /// A failing part never stops its siblings.
    pub async fn upload<R>(
        &self,
        operations: &[UploadOperation],
        source: &mut R,
        cancel: &CancellationToken,
    ) -> UploadReport
    where
        R: Read + Seek + ?Sized,
    {
        let started = Instant::now();
        let total = operations.len();
        info!(parts = total, "uploading asset");

        let (tx, mut rx) = mpsc::channel::<UploadOperationError>(total.max(1));

        let mut parts = Vec::with_capacity(total);
        for (index, operation) in operations.iter().enumerate() {
            match operation.chunk(&mut *source) {
                Ok(data) => parts.push(PreparedPart {
                    index,
                    operation: operation.clone(),
                    data,
                }),
                Err(error) => {
                    warn!(index, error = %error, "could not read part");
                    self.reporter.report(&UploadEvent::PartFailed {
                        index,
                        error: error.to_string(),
                    });
                    let _ = tx
                        .send(UploadOperationError {
                            index,
                            operation: operation.clone(),
                            error,
                        })
                        .await;
                }
            }
        }

        self.reporter.report(&UploadEvent::Started {
            parts: total,
            bytes: parts.iter().map(|p| p.data.len() as u64).sum(),
        });

        let context = PartContext {
            client: self.client.clone(),
            limiter: self.limiter.clone(),
            semaphore: self
                .config
                .max_in_flight
                .map(|limit| Arc::new(Semaphore::new(limit))),
            reporter: self.reporter.clone(),
            cancel: cancel.clone(),
            deadline: self
                .config
                .upload_timeout()
                .map(|timeout| tokio::time::Instant::now() + timeout),
        };

        let mut pending = Vec::with_capacity(parts.len());
        let mut handles = Vec::with_capacity(parts.len());
        for part in parts {
            let context = context.clone();
            let tx = tx.clone();
            pending.push((part.index, part.operation.clone()));

            handles.push(tokio::spawn(async move {
                let PreparedPart {
                    index,
                    operation,
                    data,
                } = part;

                match context.upload_part(index, &operation, data).await {
                    Ok(bytes) => Some(bytes),
                    Err(error) => {
                        context.reporter.report(&UploadEvent::PartFailed {
                            index,
                            error: error.to_string(),
                        });
                        let _ = tx
                            .send(UploadOperationError {
                                index,
                                operation,
                                error,
                            })
                            .await;
                        None
                    }
                }
            }));
        }
        drop(tx);

        let mut report = UploadReport {
            total,
            ..Default::default()
        };

        for ((index, operation), outcome) in pending.into_iter().zip(join_all(handles).await) {
            match outcome {
                Ok(Some(bytes)) => {
                    report.succeeded += 1;
                    report.bytes_sent += bytes;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(index, "part task did not complete: {}", e);
                    report.failures.push(UploadOperationError {
                        index,
                        operation,
                        error: UploadError::TaskFailed(e.to_string()),
                    });
                }
            }
        }

        // Every sender is gone once the tasks have joined.
        let mut collected = Vec::new();
        while let Some(failure) = rx.recv().await {
            collected.push(failure);
        }
        collected.append(&mut report.failures);
        report.failures = collected;
        report.duration = started.elapsed();

        self.reporter.report(&UploadEvent::Finished {
            succeeded: report.succeeded,
            failed: report.failures.len(),
            duration: report.duration,
        });

        if report.is_success() {
            info!(parts = total, bytes = report.bytes_sent, "asset upload complete");
        } else {
            warn!(
                parts = total,
                failed = report.failures.len(),
                "asset upload incomplete"
            );
        }

        report
    }

    /// Upload the parts of the file at `path`
    pub async fn upload_file(
        &self,
        operations: &[UploadOperation],
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<UploadReport> {
        debug!(path = %path.display(), "reading asset");
        let data = tokio::fs::read(path).await?;
        Ok(self.upload(operations, &mut Cursor::new(data), cancel).await)
    }

    /// Upload and surface the first failed part as an error
    pub async fn try_upload<R>(
        &self,
        operations: &[UploadOperation],
        source: &mut R,
        cancel: &CancellationToken,
    ) -> std::result::Result<UploadReport, UploadOperationError>
    where
        R: Read + Seek + ?Sized,
    {
        self.upload(operations, source, cancel).await.into_result()
    }
}

impl PartContext {
    /// Send one part, racing it against cancellation and the upload deadline
    async fn upload_part(
        &self,
        index: usize,
        operation: &UploadOperation,
        data: Vec<u8>,
    ) -> Result<u64> {
        let deadline = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(UploadError::Cancelled),
            _ = deadline => Err(UploadError::TimedOut),
            result = self.send(index, operation, data) => result,
        }
    }

    async fn send(
        &self,
        index: usize,
        operation: &UploadOperation,
        data: Vec<u8>,
    ) -> Result<u64> {
        let length = data.len() as u64;
        let request = operation.request(&self.client, data)?;

        let _permit = match &self.semaphore {
            Some(semaphore) => Some(
                semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| UploadError::Cancelled)?,
            ),
            None => None,
        };

        if let Some(limiter) = &self.limiter {
            limiter.acquire().await;
        }

        if self.cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        self.reporter.report(&UploadEvent::PartStarted {
            index,
            offset: operation.offset.unwrap_or_default(),
            length,
        });

        let started = Instant::now();
        let response = self.client.execute(request).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected { status, body });
        }

        self.reporter.report(&UploadEvent::PartCompleted {
            index,
            bytes: length,
            duration: started.elapsed(),
        });

        Ok(length)
    }
}
