use crossbeam_channel::Sender;

use crate::stats::BatchSummary;

/// Everything a run reports while it executes
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    /// The source directory holds no eligible images; nothing was written
    NoImagesFound,
    ScanComplete {
        total_images: u64,
        total_source_bytes: u64,
    },
    Progress {
        processed_count: u64,
        total_images: u64,
        total_dest_bytes: u64,
    },
    FileFailed {
        filename: String,
        cause: String,
    },
    BatchComplete(BatchSummary),
    /// The run stopped before converting anything
    Failed { message: String },
}

impl BatchEvent {
    /// Whether no further events follow this one
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchEvent::NoImagesFound | BatchEvent::BatchComplete(_) | BatchEvent::Failed { .. }
        )
    }
}

/// Trait for observing a conversion run.
/// This allows different interfaces (CLI, GUI, logs) to render progress their own way
pub trait ProgressReporter: Send + Sync {
    fn on_event(&self, event: BatchEvent);
}

/// A no-op progress reporter for when progress reporting is not needed
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn on_event(&self, _event: BatchEvent) {}
}

/// Forwards events to another thread, e.g. a GUI event loop
pub struct ChannelProgressReporter {
    sender: Sender<BatchEvent>,
}

impl ChannelProgressReporter {
    pub fn new(sender: Sender<BatchEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressReporter for ChannelProgressReporter {
    fn on_event(&self, event: BatchEvent) {
        // The receiver going away only means nobody is watching anymore.
        if self.sender.send(event).is_err() {
            log::debug!("Progress receiver disconnected");
        }
    }
}

/// Console-based progress reporter using indicatif
#[cfg(feature = "cli")]
pub struct ConsoleProgressReporter {
    progress_bar: indicatif::ProgressBar,
}

#[cfg(feature = "cli")]
impl Default for ConsoleProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "cli")]
impl ConsoleProgressReporter {
    pub fn new() -> Self {
        let progress_bar = indicatif::ProgressBar::new(0);

        progress_bar.set_style(
            indicatif::ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        Self { progress_bar }
    }
}

#[cfg(feature = "cli")]
impl ProgressReporter for ConsoleProgressReporter {
    fn on_event(&self, event: BatchEvent) {
        use crate::utils::format_bytes;

        match event {
            BatchEvent::NoImagesFound => {
                self.progress_bar
                    .finish_with_message("No images found in the source directory");
            }
            BatchEvent::ScanComplete {
                total_images,
                total_source_bytes,
            } => {
                self.progress_bar.set_length(total_images);
                self.progress_bar
                    .set_message(format!("source {}", format_bytes(total_source_bytes)));
            }
            BatchEvent::Progress {
                processed_count,
                total_dest_bytes,
                ..
            } => {
                self.progress_bar.inc(1);
                self.progress_bar.set_message(format!(
                    "{} converted, {} written",
                    processed_count,
                    format_bytes(total_dest_bytes)
                ));
            }
            BatchEvent::FileFailed { filename, cause } => {
                self.progress_bar.inc(1);
                self.progress_bar
                    .println(format!("❌ Error processing {filename}: {cause}"));
            }
            BatchEvent::BatchComplete(_) => {
                self.progress_bar.finish_with_message("Conversion completed!");
            }
            // The caller prints the error itself.
            BatchEvent::Failed { .. } => {
                self.progress_bar.finish_and_clear();
            }
        }
    }
}
