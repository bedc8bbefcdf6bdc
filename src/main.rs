use anyhow::Result;
use chrono::Utc;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use masswebp::{
    BatchConverter, BatchSummary, Config, ConversionReport, ConversionRequest, ProgressReporter,
    ReportFormat, RunOutcome, format_bytes, format_duration, generate_report,
    progress::ConsoleProgressReporter,
};

/// masswebp - batch converter from PNG, JPEG, BMP and TIFF to WebP
#[derive(Parser)]
#[command(name = "masswebp")]
#[command(about = "masswebp - Batch WebP converter")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Source directory holding the images
    #[arg(short, long, value_name = "DIR")]
    pub source: Option<String>,

    /// Destination directory for the .webp files (created if missing)
    #[arg(short, long, value_name = "DIR")]
    pub dest: Option<String>,

    /// WebP compression quality (1-100, recommended: 80)
    #[arg(short, long, value_name = "QUALITY")]
    pub quality: Option<String>,

    /// Disable the slower, more thorough encoder method
    #[arg(long)]
    pub no_optimize: bool,

    /// Configuration file path (defaults to the user config directory)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbose output mode
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode (results only)
    #[arg(long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write a conversion report to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Report output format
    #[arg(long, default_value = "json", value_enum)]
    pub report_format: ReportFormatArg,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ReportFormatArg {
    Json,
    Csv,
}

impl From<ReportFormatArg> for ReportFormat {
    fn from(format: ReportFormatArg) -> Self {
        match format {
            ReportFormatArg::Json => ReportFormat::Json,
            ReportFormatArg::Csv => ReportFormat::Csv,
        }
    }
}

impl Args {
    /// Config file values first, command line flags on top
    fn into_request(self, config: Option<Config>) -> ConversionRequest {
        let mut request = config
            .as_ref()
            .map(ConversionRequest::from_config)
            .unwrap_or_default();

        if let Some(source) = self.source {
            request = request.with_source_dir(source);
        }
        if let Some(dest) = self.dest {
            request = request.with_dest_dir(dest);
        }
        if let Some(quality) = self.quality {
            request = request.with_quality(quality);
        }
        if self.no_optimize {
            request = request.with_optimize(false);
        }
        request
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else if !args.quiet {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    let config = match &args.config {
        Some(path) => Some(Config::load(path)?),
        None => Config::load_default()?,
    };

    let quiet = args.quiet;
    let report_path = args.report.clone();
    let report_format: ReportFormat = args.report_format.clone().into();
    let request = args.into_request(config);

    let reporter: Box<dyn ProgressReporter> = if quiet {
        Box::new(masswebp::NoOpProgressReporter)
    } else {
        Box::new(ConsoleProgressReporter::new())
    };

    let start_time = Utc::now();
    let outcome = match BatchConverter::new().run(&request, reporter.as_ref()) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let end_time = Utc::now();

    let summary = match outcome {
        RunOutcome::NoImagesFound => {
            println!("No supported images found. Nothing was converted.");
            return Ok(());
        }
        RunOutcome::Completed(summary) => summary,
    };

    if let Some(path) = report_path {
        // Already validated by run.
        let validated = request.validate()?;
        let report = ConversionReport::new(&validated, &summary, start_time, end_time);
        generate_report(&report, report_format, &path)?;
    }

    print_results_summary(&summary, end_time - start_time);

    if summary.failed_count > 0 && summary.processed_count == 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn print_results_summary(summary: &BatchSummary, elapsed: chrono::TimeDelta) {
    if summary.cancelled {
        println!("\n⏹️ Conversion cancelled");
    } else {
        println!("\n🎉 Conversion completed!");
    }
    println!("📊 Results Summary:");
    println!(
        "  ✅ Converted: {}/{} images",
        summary.processed_count, summary.total_images
    );
    if summary.failed_count > 0 {
        println!("  ❌ Failed: {} files", summary.failed_count);
    }

    let before = if summary.cancelled {
        summary.attempted_source_bytes
    } else {
        summary.total_source_bytes
    };
    println!("\n💾 Space Analysis:");
    println!("  📦 Before: {}", format_bytes(before));
    println!("  🗜️ After: {}", format_bytes(summary.total_dest_bytes));
    if summary.saved_bytes >= 0 {
        println!(
            "  💾 Saved: {} ({:.1}%)",
            format_bytes(summary.saved_bytes as u64),
            summary.saved_percent
        );
    } else {
        println!(
            "  ⚠️ Grew by: {} ({:.1}%)",
            format_bytes(summary.saved_bytes.unsigned_abs()),
            -summary.saved_percent
        );
    }

    println!(
        "\n⏱️ Duration: {}",
        format_duration(elapsed.to_std().unwrap_or_default())
    );

    if !summary.errors.is_empty() && summary.errors.len() <= 5 {
        println!("\n❌ Errors:");
        for error in &summary.errors {
            println!("  • {}: {}", error.file_path, error.error_message);
        }
    } else if summary.errors.len() > 5 {
        println!(
            "\n❌ {} errors occurred (use --report for full details)",
            summary.errors.len()
        );
    }
}
