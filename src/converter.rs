use anyhow::{Context, Result, anyhow};
use image::DynamicImage;
use std::path::Path;
use webp::{Encoder, WebPConfig, WebPMemory};

/// libwebp's slowest, most thorough compression method
const OPTIMIZED_METHOD: i32 = 6;
/// libwebp's default method
const DEFAULT_METHOD: i32 = 4;

/// Lossy WebP encoder for a single file
pub struct ImageConverter {
    quality: f32,
    optimize: bool,
}

impl ImageConverter {
    pub fn new(quality: u8, optimize: bool) -> Self {
        Self {
            quality: quality as f32,
            optimize,
        }
    }

    /// Decode `input_path`, encode it to WebP and write it to `output_path`.
    /// Returns the size of the written file.
    pub fn convert_to_webp(&self, input_path: &Path, output_path: &Path) -> Result<u64> {
        let img = image::open(input_path)
            .with_context(|| format!("Failed to read image: {}", input_path.display()))?;

        let webp_data = self.encode(&img)?;
        self.save_webp_data(&webp_data, output_path)?;

        let written = std::fs::metadata(output_path)
            .with_context(|| format!("Failed to stat WebP file: {}", output_path.display()))?;
        Ok(written.len())
    }

    pub fn encode(&self, img: &DynamicImage) -> Result<WebPMemory> {
        let img = normalize_layout(img);
        let encoder = Encoder::from_image(&img)
            .map_err(|e| anyhow!("Failed to create encoder: {}", e))?;

        let mut config =
            WebPConfig::new().map_err(|_| anyhow!("Failed to initialize WebP config"))?;
        config.lossless = 0;
        config.quality = self.quality;
        config.method = if self.optimize {
            OPTIMIZED_METHOD
        } else {
            DEFAULT_METHOD
        };

        encoder
            .encode_advanced(&config)
            .map_err(|e| anyhow!("WebP encoding failed: {:?}", e))
    }

    fn save_webp_data(&self, webp_data: &WebPMemory, output_path: &Path) -> Result<()> {
        std::fs::write(output_path, &**webp_data)
            .with_context(|| format!("Failed to save WebP file: {}", output_path.display()))?;
        Ok(())
    }
}

/// The encoder only takes 8-bit RGB or RGBA buffers
fn normalize_layout(img: &DynamicImage) -> std::borrow::Cow<'_, DynamicImage> {
    use std::borrow::Cow;

    match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => Cow::Borrowed(img),
        other if other.color().has_alpha() => {
            Cow::Owned(DynamicImage::ImageRgba8(other.to_rgba8()))
        }
        other => Cow::Owned(DynamicImage::ImageRgb8(other.to_rgb8())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Rgb, RgbImage, Rgba, RgbaImage};
    use tempfile::TempDir;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x * 7) as u8, (y * 5) as u8, 128]))
    }

    #[test]
    fn converts_png_and_reports_written_size() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.png");
        let output = dir.path().join("a.webp");
        gradient(32, 24).save(&input).unwrap();

        let size = ImageConverter::new(80, true)
            .convert_to_webp(&input, &output)
            .unwrap();

        assert!(size > 0);
        assert_eq!(size, std::fs::metadata(&output).unwrap().len());
        let bytes = std::fs::read(&output).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");
    }

    #[test]
    fn encodes_grayscale_and_alpha_images() {
        let converter = ImageConverter::new(50, false);

        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, image::Luma([90])));
        assert!(!converter.encode(&gray).unwrap().is_empty());

        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 100])));
        assert!(!converter.encode(&rgba).unwrap().is_empty());
    }

    #[test]
    fn corrupt_input_is_an_error() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("broken.png");
        std::fs::write(&input, b"definitely not a png").unwrap();

        let err = ImageConverter::new(80, true)
            .convert_to_webp(&input, &dir.path().join("broken.webp"))
            .unwrap_err();

        assert!(format!("{err:#}").contains("Failed to read image"));
        assert!(!dir.path().join("broken.webp").exists());
    }

    #[test]
    fn lower_quality_does_not_grow_output() {
        let img = DynamicImage::ImageRgb8(gradient(64, 64));
        let high = ImageConverter::new(100, true).encode(&img).unwrap().len();
        let low = ImageConverter::new(5, true).encode(&img).unwrap().len();
        assert!(low <= high);
    }
}
