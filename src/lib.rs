//! # masswebp
//!
//! Batch converter that turns every PNG, JPEG, BMP and TIFF image of a folder
//! into a lossy WebP file, reporting progress and size savings as it goes.
//!
//! The conversion loop lives in [`BatchConverter`]; front ends observe it
//! through a [`ProgressReporter`].

pub mod config;
pub mod converter;
pub mod core;
pub mod error;
pub mod progress;
pub mod stats;
pub mod utils;

// Re-export commonly used types
pub use config::{Config, ConversionRequest, ValidatedRequest};
pub use converter::ImageConverter;
pub use crate::core::{BatchConverter, ImageFileEntry, RunOutcome};
pub use error::{BatchError, ConvertError};
pub use progress::{BatchEvent, ChannelProgressReporter, NoOpProgressReporter, ProgressReporter};
pub use stats::{BatchSummary, ConversionResult, ErrorRecord};
pub use utils::{format_bytes, format_duration};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main conversion report structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ConversionReport {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: Duration,
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
    pub quality: u8,
    pub optimize: bool,
    pub total_images: u64,
    pub processed_files: u64,
    pub failed_files: u64,
    pub total_source_bytes: u64,
    pub attempted_source_bytes: u64,
    pub total_dest_bytes: u64,
    pub saved_bytes: i64,
    pub saved_percent: f64,
    pub cancelled: bool,
    pub errors: Vec<ErrorRecord>,
}

impl ConversionReport {
    pub fn new(
        request: &ValidatedRequest,
        summary: &BatchSummary,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            start_time,
            end_time,
            duration: (end_time - start_time).to_std().unwrap_or_default(),
            source_dir: request.source_dir.clone(),
            dest_dir: request.dest_dir.clone(),
            quality: request.quality,
            optimize: request.optimize,
            total_images: summary.total_images,
            processed_files: summary.processed_count,
            failed_files: summary.failed_count,
            total_source_bytes: summary.total_source_bytes,
            attempted_source_bytes: summary.attempted_source_bytes,
            total_dest_bytes: summary.total_dest_bytes,
            saved_bytes: summary.saved_bytes,
            saved_percent: summary.saved_percent,
            cancelled: summary.cancelled,
            errors: summary.errors.clone(),
        }
    }
}

/// Report output formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportFormat {
    Json,
    Csv,
}

/// Write a conversion report to `path` in the specified format
pub fn generate_report(report: &ConversionReport, format: ReportFormat, path: &Path) -> Result<()> {
    match format {
        ReportFormat::Json => generate_json_report(report, path),
        ReportFormat::Csv => generate_csv_report(report, path),
    }
    .with_context(|| format!("Failed to write report: {}", path.display()))?;
    log::info!("Report saved to: {}", path.display());
    Ok(())
}

fn generate_json_report(report: &ConversionReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}

fn generate_csv_report(report: &ConversionReport, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let rows = [
        ("start_time", report.start_time.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        ("end_time", report.end_time.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        ("duration_seconds", report.duration.as_secs().to_string()),
        ("source_dir", report.source_dir.display().to_string()),
        ("dest_dir", report.dest_dir.display().to_string()),
        ("quality", report.quality.to_string()),
        ("optimize", report.optimize.to_string()),
        ("total_images", report.total_images.to_string()),
        ("processed_files", report.processed_files.to_string()),
        ("failed_files", report.failed_files.to_string()),
        ("total_source_bytes", report.total_source_bytes.to_string()),
        ("attempted_source_bytes", report.attempted_source_bytes.to_string()),
        ("total_dest_bytes", report.total_dest_bytes.to_string()),
        ("saved_bytes", report.saved_bytes.to_string()),
        ("saved_percent", format!("{:.2}", report.saved_percent)),
        ("cancelled", report.cancelled.to_string()),
    ];

    writer.write_record(["metric", "value"])?;
    for (metric, value) in &rows {
        writer.write_record([*metric, value.as_str()])?;
    }
    for error in &report.errors {
        writer.write_record([
            "error",
            format!("{}: {}", error.file_path, error.error_message).as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
