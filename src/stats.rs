use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

/// A file that failed during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub file_path: String,
    pub error_message: String,
    pub timestamp: DateTime<Utc>,
}

/// Running totals for one batch. Owned by the run in progress.
#[derive(Debug, Clone, Default)]
pub struct ConversionResult {
    pub total_images: u64,
    pub processed_count: u64,
    pub total_source_bytes: u64,
    pub total_dest_bytes: u64,
    /// Source bytes of the entries handed to the encoder so far
    pub attempted_source_bytes: u64,
    errors: Vec<ErrorRecord>,
}

impl ConversionResult {
    pub fn new(total_images: u64, total_source_bytes: u64) -> Self {
        Self {
            total_images,
            total_source_bytes,
            ..Default::default()
        }
    }

    pub fn record_attempt(&mut self, source_size: u64) {
        self.attempted_source_bytes += source_size;
    }

    pub fn record_success(&mut self, dest_size: u64) {
        self.processed_count += 1;
        self.total_dest_bytes += dest_size;
    }

    pub fn record_error(&mut self, error: &ConvertError) {
        self.errors.push(ErrorRecord {
            file_path: error.filename.clone(),
            error_message: error.cause.clone(),
            timestamp: Utc::now(),
        });
    }

    pub fn error_count(&self) -> u64 {
        self.errors.len() as u64
    }

    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    /// Source bytes minus output bytes. Negative when WebP came out larger.
    pub fn saved_bytes(&self) -> i64 {
        saved_bytes(self.total_source_bytes, self.total_dest_bytes)
    }

    pub fn saved_percent(&self) -> f64 {
        saved_percent(self.total_source_bytes, self.total_dest_bytes)
    }

    /// Consume the accumulator into the terminal summary
    pub fn finish(self, cancelled: bool) -> BatchSummary {
        // Entries never reached by a cancelled run saved nothing.
        let baseline = if cancelled {
            self.attempted_source_bytes
        } else {
            self.total_source_bytes
        };

        BatchSummary {
            total_images: self.total_images,
            processed_count: self.processed_count,
            failed_count: self.error_count(),
            total_source_bytes: self.total_source_bytes,
            attempted_source_bytes: self.attempted_source_bytes,
            total_dest_bytes: self.total_dest_bytes,
            saved_bytes: saved_bytes(baseline, self.total_dest_bytes),
            saved_percent: saved_percent(baseline, self.total_dest_bytes),
            cancelled,
            errors: self.errors,
        }
    }
}

fn saved_bytes(source: u64, dest: u64) -> i64 {
    source as i64 - dest as i64
}

fn saved_percent(source: u64, dest: u64) -> f64 {
    if source == 0 {
        return 0.0;
    }
    saved_bytes(source, dest) as f64 / source as f64 * 100.0
}

/// Final statistics of a completed batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_images: u64,
    pub processed_count: u64,
    pub failed_count: u64,
    pub total_source_bytes: u64,
    pub attempted_source_bytes: u64,
    pub total_dest_bytes: u64,
    pub saved_bytes: i64,
    pub saved_percent: f64,
    pub cancelled: bool,
    pub errors: Vec<ErrorRecord>,
}
