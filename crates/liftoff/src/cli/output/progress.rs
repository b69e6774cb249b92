//! Progress bar for part uploads

use std::sync::atomic::{AtomicUsize, Ordering};

use indicatif::{ProgressBar, ProgressStyle};
use liftoff_upload::{UploadEvent, UploadReporter};

/// Shows bytes acknowledged by the destination as parts complete
pub struct ProgressReporter {
    bar: ProgressBar,
    parts: AtomicUsize,
    completed: AtomicUsize,
}

impl ProgressReporter {
    /// Create a reporter; a hidden bar is used when `visible` is false
    pub fn new(visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} [{bar:32.cyan/blue}] {bytes}/{total_bytes} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
        );
        Self {
            bar,
            parts: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    fn update_message(&self, completed: usize) {
        let parts = self.parts.load(Ordering::Relaxed);
        self.bar.set_message(format!("{}/{} parts", completed, parts));
    }
}

impl UploadReporter for ProgressReporter {
    fn report(&self, event: &UploadEvent) {
        match event {
            UploadEvent::Started { parts, bytes } => {
                self.parts.store(*parts, Ordering::Relaxed);
                self.bar.set_length(*bytes);
                self.update_message(0);
            }
            UploadEvent::PartStarted { .. } => self.bar.tick(),
            UploadEvent::PartCompleted { bytes, .. } => {
                let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
                self.bar.inc(*bytes);
                self.update_message(completed);
            }
            UploadEvent::PartFailed { index, error } => {
                self.bar.println(format!("part {} failed: {}", index, error));
            }
            UploadEvent::Finished { .. } => self.bar.finish_and_clear(),
        }
    }
}
