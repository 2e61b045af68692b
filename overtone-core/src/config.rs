//! # Analyzer Configuration
//!
//! Fixed per-session settings for block analysis. Every field has a default,
//! so a JSON file only needs to name the values it changes:
//!
//! ```json
//! { "block_size": 8192, "max_freq": 1200.0 }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::fundamental::{DEFAULT_MAX_FREQ, DEFAULT_MIN_FREQ};
use crate::harmonics::DEFAULT_HARMONIC_COUNT;

/// Sample rate requested from capture devices and used for synthetic tones.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Samples per analysis block (about 93 ms at 44.1 kHz).
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Fundamental magnitude a block must exceed to count as a played note.
pub const DEFAULT_MAGNITUDE_THRESHOLD: f32 = 9.0;

/// Errors produced while loading or validating an [`AnalyzerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The sample rate was zero.
    #[error("sample rate must be positive")]
    ZeroSampleRate,
    /// The block is too short for three-point interpolation.
    #[error("block size must be at least 3 samples, got {0}")]
    BlockTooSmall(usize),
    /// A band edge was zero, negative, or not finite.
    #[error("frequency band edges must be positive and finite, got [{min}, {max}]")]
    InvalidBandEdge {
        /// Configured lower edge.
        min: f32,
        /// Configured upper edge.
        max: f32,
    },
    /// The band is empty or inverted.
    #[error("min_freq ({min}) must be below max_freq ({max})")]
    EmptyBand {
        /// Configured lower edge.
        min: f32,
        /// Configured upper edge.
        max: f32,
    },
    /// The audibility threshold was negative or not finite.
    #[error("magnitude threshold must be a non-negative number, got {0}")]
    InvalidThreshold(f32),
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration file is not valid JSON for this structure.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings shared by every stage of block analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Sample rate of incoming blocks in Hz.
    pub sample_rate: u32,
    /// Number of samples per analysis block.
    pub block_size: usize,
    /// Lower edge of the fundamental search band in Hz.
    pub min_freq: f32,
    /// Upper edge of the fundamental search band in Hz.
    pub max_freq: f32,
    /// Number of harmonics to locate, including the fundamental.
    pub harmonic_count: usize,
    /// Minimum fundamental magnitude for a block to be reported.
    pub magnitude_threshold: f32,
    /// Subtract the block mean before windowing.
    pub remove_dc_offset: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
            min_freq: DEFAULT_MIN_FREQ,
            max_freq: DEFAULT_MAX_FREQ,
            harmonic_count: DEFAULT_HARMONIC_COUNT,
            magnitude_threshold: DEFAULT_MAGNITUDE_THRESHOLD,
            remove_dc_offset: false,
        }
    }
}

impl AnalyzerConfig {
    /// Parses a configuration from JSON and validates it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path.as_ref())?;
        log::debug!("loaded config from {}", path.as_ref().display());
        Self::from_json_str(&data)
    }

    /// Checks that the settings describe a usable analysis.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if self.block_size < 3 {
            return Err(ConfigError::BlockTooSmall(self.block_size));
        }
        let (min, max) = (self.min_freq, self.max_freq);
        if !min.is_finite() || !max.is_finite() || min <= 0.0 || max <= 0.0 {
            return Err(ConfigError::InvalidBandEdge { min, max });
        }
        if min >= max {
            return Err(ConfigError::EmptyBand { min, max });
        }
        if !self.magnitude_threshold.is_finite() || self.magnitude_threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(self.magnitude_threshold));
        }
        Ok(())
    }

    /// Frequency spacing between spectrum bins for this block size.
    pub fn bin_width(&self) -> f32 {
        self.sample_rate as f32 / self.block_size as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AnalyzerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.harmonic_count, 5);
        assert_eq!(config.min_freq, 50.0);
        assert_eq!(config.max_freq, 2000.0);
        assert!((config.bin_width() - 10.766).abs() < 1e-3);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{ "block_size": 8192, "max_freq": 1200.0 }"#;
        let config = AnalyzerConfig::from_json_str(json).unwrap();
        assert_eq!(config.block_size, 8192);
        assert_eq!(config.max_freq, 1200.0);
        assert_eq!(config.sample_rate, DEFAULT_SAMPLE_RATE);
        assert!(!config.remove_dc_offset);
    }

    #[test]
    fn rejects_invalid_settings() {
        let cases = [
            r#"{ "sample_rate": 0 }"#,
            r#"{ "block_size": 2 }"#,
            r#"{ "min_freq": -5.0 }"#,
            r#"{ "min_freq": 3000.0 }"#,
            r#"{ "min_freq": 100.0, "max_freq": 100.0 }"#,
            r#"{ "magnitude_threshold": -1.0 }"#,
        ];
        for json in cases {
            assert!(AnalyzerConfig::from_json_str(json).is_err(), "{}", json);
        }
    }

    #[test]
    fn error_kinds_are_specific() {
        let config = AnalyzerConfig { block_size: 1, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::BlockTooSmall(1))));

        let config = AnalyzerConfig { min_freq: 500.0, max_freq: 100.0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyBand { .. })));

        assert!(matches!(
            AnalyzerConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overtone.json");
        std::fs::write(&path, r#"{ "harmonic_count": 8, "remove_dc_offset": true }"#).unwrap();
        let config = AnalyzerConfig::from_json_file(&path).unwrap();
        assert_eq!(config.harmonic_count, 8);
        assert!(config.remove_dc_offset);

        let missing = AnalyzerConfig::from_json_file(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }

    #[test]
    fn serializes_all_fields() {
        let json = serde_json::to_string(&AnalyzerConfig::default()).unwrap();
        let back = AnalyzerConfig::from_json_str(&json).unwrap();
        assert_eq!(back, AnalyzerConfig::default());
    }
}
