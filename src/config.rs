use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::BatchError;

pub const DEFAULT_QUALITY: u8 = 80;
pub const MIN_QUALITY: i64 = 1;
pub const MAX_QUALITY: i64 = 100;

/// Configuration file contents, usually `~/.config/masswebp/config.toml`
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    pub general: Option<GeneralConfig>,
    pub compression: Option<CompressionConfig>,
}

/// Directory defaults
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct GeneralConfig {
    pub source_dir: Option<String>,
    pub dest_dir: Option<String>,
}

/// Encoder defaults
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct CompressionConfig {
    pub quality: Option<u8>,
    pub optimize: Option<bool>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("masswebp").join("config.toml"))
    }

    /// Load the per-user config if one exists
    pub fn load_default() -> Result<Option<Self>> {
        match Self::default_path() {
            Some(path) if path.is_file() => {
                log::debug!("Loading config from {}", path.display());
                Self::load(&path).map(Some)
            }
            _ => Ok(None),
        }
    }
}

/// A conversion run as entered by the user, before validation.
///
/// Fields are kept as text because that is what a form or command line
/// hands over; [`ConversionRequest::validate`] turns them into typed values.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub source_dir: String,
    pub dest_dir: String,
    pub quality: String,
    pub optimize: bool,
}

impl Default for ConversionRequest {
    fn default() -> Self {
        Self {
            source_dir: String::new(),
            dest_dir: String::new(),
            quality: DEFAULT_QUALITY.to_string(),
            optimize: true,
        }
    }
}

impl ConversionRequest {
    pub fn new(source_dir: impl Into<String>, dest_dir: impl Into<String>) -> Self {
        Self {
            source_dir: source_dir.into(),
            dest_dir: dest_dir.into(),
            ..Default::default()
        }
    }

    /// Start from the values of a config file
    pub fn from_config(config: &Config) -> Self {
        let mut request = Self::default();
        if let Some(general) = &config.general {
            if let Some(source) = &general.source_dir {
                request.source_dir = source.clone();
            }
            if let Some(dest) = &general.dest_dir {
                request.dest_dir = dest.clone();
            }
        }
        if let Some(compression) = &config.compression {
            if let Some(quality) = compression.quality {
                request.quality = quality.to_string();
            }
            if let Some(optimize) = compression.optimize {
                request.optimize = optimize;
            }
        }
        request
    }

    /// Builder pattern for setting the source directory
    pub fn with_source_dir(mut self, source_dir: impl Into<String>) -> Self {
        self.source_dir = source_dir.into();
        self
    }

    /// Builder pattern for setting the destination directory
    pub fn with_dest_dir(mut self, dest_dir: impl Into<String>) -> Self {
        self.dest_dir = dest_dir.into();
        self
    }

    /// Builder pattern for setting quality
    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = quality.into();
        self
    }

    /// Builder pattern for toggling encoder optimization
    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    pub fn validate(&self) -> Result<ValidatedRequest, BatchError> {
        let source_dir = self.source_dir.trim();
        let dest_dir = self.dest_dir.trim();
        if source_dir.is_empty() || dest_dir.is_empty() {
            return Err(BatchError::MissingDirectory);
        }

        let quality = self
            .quality
            .trim()
            .parse::<i64>()
            .map_err(|_| BatchError::InvalidQuality(self.quality.clone()))?;
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
            return Err(BatchError::InvalidQuality(self.quality.clone()));
        }

        Ok(ValidatedRequest {
            source_dir: PathBuf::from(source_dir),
            dest_dir: PathBuf::from(dest_dir),
            quality: quality as u8,
            optimize: self.optimize,
        })
    }
}

/// A request whose fields have been checked
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
    pub quality: u8,
    pub optimize: bool,
}
