use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use walkdir::WalkDir;

use crate::{
    config::{ConversionRequest, ValidatedRequest},
    converter::ImageConverter,
    error::{BatchError, ConvertError},
    progress::{BatchEvent, ProgressReporter},
    stats::{BatchSummary, ConversionResult},
    utils::{has_supported_extension, webp_file_name},
};

/// An eligible image found in the source directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFileEntry {
    pub name: String,
    pub size_bytes: u64,
}

/// How a run ended when it was not stopped by an error
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    NoImagesFound,
    Completed(BatchSummary),
}

/// Scans a source folder and converts every supported image to WebP
#[derive(Default)]
pub struct BatchConverter {
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl BatchConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the run before the next file once `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    pub fn validate(request: &ConversionRequest) -> Result<ValidatedRequest, BatchError> {
        request.validate()
    }

    /// List the supported images directly inside `source_dir`, in directory order
    pub fn scan(source_dir: &Path) -> Result<Vec<ImageFileEntry>, BatchError> {
        let not_found = |source: std::io::Error| BatchError::DirectoryNotFound {
            path: source_dir.to_path_buf(),
            source,
        };

        let metadata = std::fs::metadata(source_dir).map_err(not_found)?;
        if !metadata.is_dir() {
            return Err(not_found(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                "not a directory",
            )));
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(source_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
        {
            let entry = match entry {
                Ok(entry) => entry,
                // Depth 0 is the source directory itself.
                Err(e) if e.depth() == 0 => return Err(not_found(e.into())),
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {e}");
                    continue;
                }
            };
            if !has_supported_extension(entry.path()) {
                continue;
            }

            let Some(name) = entry.file_name().to_str() else {
                log::warn!("Skipping non UTF-8 file name: {}", entry.path().display());
                continue;
            };

            // Resolves symlinks, so a link to an image counts as that image.
            let metadata = match std::fs::metadata(entry.path()) {
                Ok(metadata) => metadata,
                Err(e) => {
                    log::warn!("Skipping {}: {e}", entry.path().display());
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            entries.push(ImageFileEntry {
                name: name.to_string(),
                size_bytes: metadata.len(),
            });
        }

        Ok(entries)
    }

    pub fn ensure_destination(dest_dir: &Path) -> Result<(), BatchError> {
        std::fs::create_dir_all(dest_dir).map_err(|source| BatchError::DestinationUnwritable {
            path: dest_dir.to_path_buf(),
            source,
        })
    }

    /// Convert one entry and return the size of the written `.webp`
    pub fn convert_one(
        entry: &ImageFileEntry,
        source_dir: &Path,
        dest_dir: &Path,
        quality: u8,
        optimize: bool,
    ) -> Result<u64, ConvertError> {
        let input_path = source_dir.join(&entry.name);
        let output_path = dest_dir.join(webp_file_name(&entry.name));

        ImageConverter::new(quality, optimize)
            .convert_to_webp(&input_path, &output_path)
            .map_err(|e| ConvertError::new(&entry.name, &e))
    }

    /// Run the complete conversion process
    pub fn run(
        &self,
        request: &ConversionRequest,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunOutcome, BatchError> {
        let outcome = self.run_inner(request, reporter);
        if let Err(e) = &outcome {
            reporter.on_event(BatchEvent::Failed {
                message: e.to_string(),
            });
        }
        outcome
    }

    fn run_inner(
        &self,
        request: &ConversionRequest,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunOutcome, BatchError> {
        let request = Self::validate(request)?;

        let entries = Self::scan(&request.source_dir)?;
        if entries.is_empty() {
            log::info!(
                "No supported images found in {}",
                request.source_dir.display()
            );
            reporter.on_event(BatchEvent::NoImagesFound);
            return Ok(RunOutcome::NoImagesFound);
        }

        let total_source_bytes = entries.iter().map(|entry| entry.size_bytes).sum();
        let mut result = ConversionResult::new(entries.len() as u64, total_source_bytes);
        log::info!(
            "Converting {} images from {} to {} at quality {}",
            result.total_images,
            request.source_dir.display(),
            request.dest_dir.display(),
            request.quality
        );
        reporter.on_event(BatchEvent::ScanComplete {
            total_images: result.total_images,
            total_source_bytes,
        });

        Self::ensure_destination(&request.dest_dir)?;

        let mut cancelled = false;
        for entry in &entries {
            if self.is_cancelled() {
                log::warn!("Conversion cancelled after {} images", result.processed_count);
                cancelled = true;
                break;
            }

            result.record_attempt(entry.size_bytes);
            match Self::convert_one(
                entry,
                &request.source_dir,
                &request.dest_dir,
                request.quality,
                request.optimize,
            ) {
                Ok(dest_size) => {
                    log::debug!("Converted {} ({} -> {} bytes)", entry.name, entry.size_bytes, dest_size);
                    result.record_success(dest_size);
                    reporter.on_event(BatchEvent::Progress {
                        processed_count: result.processed_count,
                        total_images: result.total_images,
                        total_dest_bytes: result.total_dest_bytes,
                    });
                }
                Err(e) => {
                    log::error!("{e}");
                    result.record_error(&e);
                    reporter.on_event(BatchEvent::FileFailed {
                        filename: e.filename,
                        cause: e.cause,
                    });
                }
            }
        }

        let summary = result.finish(cancelled);
        log::info!(
            "Converted {}/{} images, saved {:.1}%",
            summary.processed_count,
            summary.total_images,
            summary.saved_percent
        );
        reporter.on_event(BatchEvent::BatchComplete(summary.clone()));
        Ok(RunOutcome::Completed(summary))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_sized(dir: &Path, name: &str, len: usize) {
        fs::write(dir.join(name), vec![0u8; len]).unwrap();
    }

    #[test]
    fn scan_filters_by_extension_and_sizes_entries() {
        let dir = TempDir::new().unwrap();
        write_sized(dir.path(), "a.png", 1_048_576);
        write_sized(dir.path(), "b.jpg", 2_097_152);
        write_sized(dir.path(), "c.txt", 500);

        let mut entries = BatchConverter::scan(dir.path()).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(
            entries,
            vec![
                ImageFileEntry { name: "a.png".into(), size_bytes: 1_048_576 },
                ImageFileEntry { name: "b.jpg".into(), size_bytes: 2_097_152 },
            ]
        );
        let total: u64 = entries.iter().map(|e| e.size_bytes).sum();
        assert_eq!(total, 3_145_728);
    }

    #[test]
    fn scan_is_case_insensitive_and_not_recursive() {
        let dir = TempDir::new().unwrap();
        write_sized(dir.path(), "PHOTO.JPG", 10);
        write_sized(dir.path(), "scan.TIFF", 10);
        write_sized(dir.path(), "setup.exe", 10);
        fs::create_dir(dir.path().join("nested")).unwrap();
        write_sized(&dir.path().join("nested"), "inner.png", 10);
        fs::create_dir(dir.path().join("folder.png")).unwrap();

        let mut names: Vec<_> = BatchConverter::scan(dir.path())
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        names.sort();

        assert_eq!(names, vec!["PHOTO.JPG", "scan.TIFF"]);
    }

    #[cfg(unix)]
    #[test]
    fn scan_skips_dangling_links() {
        let dir = TempDir::new().unwrap();
        write_sized(dir.path(), "a.png", 10);
        std::os::unix::fs::symlink(dir.path().join("missing.png"), dir.path().join("x.png")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("missing.txt"), dir.path().join("notes.txt"))
            .unwrap();

        let entries = BatchConverter::scan(dir.path()).unwrap();
        assert_eq!(entries, vec![ImageFileEntry { name: "a.png".into(), size_bytes: 10 }]);
    }

    #[test]
    fn scan_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            BatchConverter::scan(&missing),
            Err(BatchError::DirectoryNotFound { .. })
        ));
    }

    #[test]
    fn scan_rejects_a_file_path() {
        let dir = TempDir::new().unwrap();
        write_sized(dir.path(), "a.png", 1);
        assert!(matches!(
            BatchConverter::scan(&dir.path().join("a.png")),
            Err(BatchError::DirectoryNotFound { .. })
        ));
    }

    #[test]
    fn ensure_destination_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out").join("deeper");
        BatchConverter::ensure_destination(&dest).unwrap();
        BatchConverter::ensure_destination(&dest).unwrap();
        assert!(dest.is_dir());
    }

    #[test]
    fn ensure_destination_fails_on_file() {
        let dir = TempDir::new().unwrap();
        write_sized(dir.path(), "blocker", 1);
        assert!(matches!(
            BatchConverter::ensure_destination(&dir.path().join("blocker")),
            Err(BatchError::DestinationUnwritable { .. })
        ));
    }

    #[test]
    fn convert_one_reports_filename_on_failure() {
        let dir = TempDir::new().unwrap();
        write_sized(dir.path(), "zero.bmp", 4);
        let entry = ImageFileEntry { name: "zero.bmp".into(), size_bytes: 4 };

        let err = BatchConverter::convert_one(&entry, dir.path(), dir.path(), 80, true)
            .unwrap_err();
        assert_eq!(err.filename, "zero.bmp");
        assert!(!err.cause.is_empty());
    }
}
