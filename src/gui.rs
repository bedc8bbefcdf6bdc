#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use crossbeam_channel::Receiver;
use eframe::egui;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use masswebp::{
    BatchConverter, BatchEvent, BatchSummary, ChannelProgressReporter, ConversionRequest,
    config::DEFAULT_QUALITY, format_bytes,
};

/// Display state rebuilt from the event stream of one run
#[derive(Debug, Default)]
struct RunView {
    total_images: u64,
    processed: u64,
    failed: u64,
    source_bytes: u64,
    dest_bytes: u64,
    finished: bool,
    status: Status,
    summary: Option<BatchSummary>,
    log: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
enum Status {
    #[default]
    Ready,
    Working,
    Done(String),
    Error(String),
}

impl RunView {
    fn apply(&mut self, event: BatchEvent) {
        match event {
            BatchEvent::NoImagesFound => {
                self.finished = true;
                self.status = Status::Done("No images found in the source folder".to_string());
            }
            BatchEvent::ScanComplete {
                total_images,
                total_source_bytes,
            } => {
                self.total_images = total_images;
                self.source_bytes = total_source_bytes;
            }
            BatchEvent::Progress {
                processed_count,
                total_dest_bytes,
                ..
            } => {
                self.processed = processed_count;
                self.dest_bytes = total_dest_bytes;
            }
            BatchEvent::FileFailed { filename, cause } => {
                self.failed += 1;
                self.log.push(format!("❌ {filename}: {cause}"));
            }
            BatchEvent::BatchComplete(summary) => {
                self.finished = true;
                self.status = Status::Done(format!(
                    "Done! {} images converted.",
                    summary.processed_count
                ));
                self.summary = Some(summary);
            }
            BatchEvent::Failed { message } => {
                self.finished = true;
                self.status = Status::Error(message);
            }
        }
    }

    /// The worker ended without a terminal event
    fn worker_stopped(&mut self) {
        self.finished = true;
        self.status = Status::Error("The conversion stopped unexpectedly".to_string());
    }

    fn fraction(&self) -> f32 {
        if self.total_images == 0 {
            return 0.0;
        }
        (self.processed + self.failed) as f32 / self.total_images as f32
    }
}

pub struct MassWebpApp {
    source_dir: String,
    dest_dir: String,
    quality: String,
    optimize: bool,
    view: RunView,
    events: Option<Receiver<BatchEvent>>,
    worker: Option<JoinHandle<()>>,
    cancel_flag: Arc<AtomicBool>,
}

impl Default for MassWebpApp {
    fn default() -> Self {
        Self {
            source_dir: String::new(),
            dest_dir: String::new(),
            quality: DEFAULT_QUALITY.to_string(),
            optimize: true,
            view: RunView::default(),
            events: None,
            worker: None,
            cancel_flag: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl eframe::App for MassWebpApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();
        let converting = self.events.is_some();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Mass WebP Converter");
            ui.add_space(10.0);

            ui.label("Source folder (images):");
            ui.horizontal(|ui| {
                ui.text_edit_singleline(&mut self.source_dir);
                if ui.add_enabled(!converting, egui::Button::new("Browse")).clicked() {
                    if let Some(path) = rfd::FileDialog::new().pick_folder() {
                        self.source_dir = path.display().to_string();
                    }
                }
            });

            ui.label("Destination folder (output):");
            ui.horizontal(|ui| {
                ui.text_edit_singleline(&mut self.dest_dir);
                if ui.add_enabled(!converting, egui::Button::new("Browse")).clicked() {
                    if let Some(path) = rfd::FileDialog::new().pick_folder() {
                        self.dest_dir = path.display().to_string();
                    }
                }
            });

            ui.horizontal(|ui| {
                ui.label("Quality (1-100, recommended: 80):");
                ui.add(egui::TextEdit::singleline(&mut self.quality).desired_width(50.0));
                ui.checkbox(&mut self.optimize, "Optimize");
            });

            ui.add_space(10.0);
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(!converting, egui::Button::new("Start conversion"))
                    .clicked()
                {
                    self.start_conversion();
                }
                if converting && ui.button("Cancel").clicked() {
                    self.cancel_flag.store(true, Ordering::Relaxed);
                }
            });

            ui.add_space(10.0);
            self.show_progress(ui);
        });

        if self.events.is_some() {
            ctx.request_repaint();
        }
    }
}

impl MassWebpApp {
    fn drain_events(&mut self) {
        let Some(events) = &self.events else {
            return;
        };
        // Checked before draining so every event sent by a finished worker is seen.
        let worker_done = self.worker.as_ref().is_none_or(|worker| worker.is_finished());
        for event in events.try_iter() {
            self.view.apply(event);
        }
        if !self.view.finished && worker_done {
            self.view.worker_stopped();
        }
        if self.view.finished {
            self.events = None;
            if let Some(worker) = self.worker.take() {
                if worker.join().is_err() {
                    log::error!("Conversion worker panicked");
                }
            }
        }
    }

    fn show_progress(&self, ui: &mut egui::Ui) {
        let view = &self.view;
        match &view.status {
            Status::Ready => {
                ui.label("Ready");
            }
            Status::Working => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.colored_label(egui::Color32::LIGHT_BLUE, "Processing...");
                });
            }
            Status::Done(message) => {
                ui.colored_label(egui::Color32::GREEN, message);
            }
            Status::Error(message) => {
                ui.colored_label(egui::Color32::RED, message);
            }
        }

        if view.total_images == 0 {
            return;
        }

        ui.add(egui::ProgressBar::new(view.fraction()).text(format!(
            "{}/{} images",
            view.processed + view.failed,
            view.total_images
        )));
        let before = match &view.summary {
            Some(summary) if summary.cancelled => summary.attempted_source_bytes,
            _ => view.source_bytes,
        };
        ui.label(format!("Before: {}", format_bytes(before)));
        ui.label(format!("After: {}", format_bytes(view.dest_bytes)));

        if let Some(summary) = &view.summary {
            ui.label(format!(
                "Saved: {} ({:.1}%)",
                format_bytes(summary.saved_bytes.max(0) as u64),
                summary.saved_percent
            ));
            if summary.cancelled {
                ui.colored_label(egui::Color32::YELLOW, "Cancelled before the last image");
            }
        }

        if !view.log.is_empty() {
            egui::ScrollArea::vertical()
                .max_height(120.0)
                .show(ui, |ui| {
                    for entry in &view.log {
                        ui.label(entry);
                    }
                });
        }
    }

    fn start_conversion(&mut self) {
        let request = ConversionRequest::new(self.source_dir.clone(), self.dest_dir.clone())
            .with_quality(self.quality.clone())
            .with_optimize(self.optimize);

        self.view = RunView::default();
        if let Err(e) = request.validate() {
            self.view.status = Status::Error(e.to_string());
            return;
        }

        self.view.status = Status::Working;
        self.cancel_flag = Arc::new(AtomicBool::new(false));

        let (sender, receiver) = crossbeam_channel::unbounded();
        self.events = Some(receiver);
        let converter = BatchConverter::new().with_cancel_flag(Arc::clone(&self.cancel_flag));

        // Start conversion in background thread
        self.worker = Some(thread::spawn(move || {
            let reporter = ChannelProgressReporter::new(sender);
            if let Err(e) = converter.run(&request, &reporter) {
                log::debug!("Conversion stopped: {e}");
            }
        }));
    }
}

fn main() -> Result<(), eframe::Error> {
    env_logger::init(); // Log to stderr (if you want to see logs)

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([500.0, 420.0])
            .with_min_inner_size([420.0, 320.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Mass WebP Converter",
        options,
        Box::new(|_cc| Ok(Box::new(MassWebpApp::default()))),
    )
}
