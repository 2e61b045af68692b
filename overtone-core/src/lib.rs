// overtone-core/src/lib.rs

//! The core logic for the Overtone instrument tuner.
//! This crate is responsible for spectral estimation, fundamental detection,
//! harmonic lookup and note naming, plus the capture sources that feed it.
//! It is completely headless and contains no presentation code.
//!
//! The four analysis stages are plain functions and can be used on their own:
//!
//! ```
//! use overtone_core::{fundamental, harmonics, note, spectrum};
//!
//! let sample_rate = 44_100.0;
//! let block: Vec<f32> = (0..8192)
//!     .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sample_rate).sin())
//!     .collect();
//!
//! let spectrum = spectrum::compute_spectrum(&block, sample_rate);
//! let f0 = fundamental::find_fundamental(&spectrum, 50.0, 2000.0);
//! let series = harmonics::find_harmonics(&spectrum, f0, 5);
//!
//! assert_eq!(note::frequency_to_note(f0), "A4");
//! assert_eq!(series.len(), 5);
//! ```

pub mod audio;
pub mod config;
pub mod fundamental;
pub mod harmonics;
pub mod note;
pub mod spectrum;
pub mod wav;

use serde::Serialize;

pub use config::{AnalyzerConfig, ConfigError};
pub use harmonics::Harmonic;
pub use spectrum::{Spectrum, SpectrumError};

/// Represents the result of analysing a single block of audio.
///
/// A snapshot owned by whoever receives it; nothing borrows from the block
/// that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    /// The detected fundamental in Hz, 0 when no peak was found in band.
    pub fundamental: f32,
    /// The fundamental as an option, `None` for the 0 Hz sentinel.
    pub detected_frequency: Option<f32>,
    /// Name of the nearest note, "N/A" when there is no fundamental.
    pub note_name: String,
    /// The deviation from the nearest equal-tempered note in cents.
    pub cents_deviation: Option<f32>,
    /// Magnitude of the spectrum bin nearest the fundamental.
    pub fundamental_magnitude: f32,
    /// The located harmonic series, fundamental first.
    pub harmonics: Vec<Harmonic>,
    /// The spectrum the estimate was taken from.
    #[serde(skip)]
    pub spectrum: Spectrum,
}

impl AnalysisResult {
    /// True when a fundamental was found and its bin is louder than `threshold`.
    pub fn is_audible(&self, threshold: f32) -> bool {
        self.detected_frequency.is_some() && self.fundamental_magnitude > threshold
    }
}

/// Runs the full estimator, detector, locator and mapper chain on blocks.
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    /// Creates an analyzer after validating `config`.
    pub fn new(config: AnalyzerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The settings this analyzer was built with.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Performs a full analysis on a single block of audio data.
    ///
    /// 1. Windowed FFT to get the magnitude spectrum
    /// 2. Strongest in-band peak, refined by parabolic interpolation
    /// 3. Nearest note name and cents deviation
    /// 4. Nearest bins to the first harmonics
    ///
    /// Blocks of any length are accepted; the configured block size only
    /// governs how capture sources cut their streams.
    pub fn analyze(&self, samples: &[f32]) -> AnalysisResult {
        let options = spectrum::SpectrumOptions {
            remove_dc_offset: self.config.remove_dc_offset,
        };
        let sample_rate = self.config.sample_rate as f32;
        let spectrum = spectrum::compute_spectrum_with(samples, sample_rate, options);
        let fundamental =
            fundamental::find_fundamental(&spectrum, self.config.min_freq, self.config.max_freq);

        let detected_frequency = (fundamental > 0.0).then_some(fundamental);
        let note_name = note::frequency_to_note(fundamental);
        let cents_deviation = note::nearest_note(fundamental)
            .map(|(_, target)| note::cents_deviation(fundamental, target));

        let fundamental_magnitude = spectrum.magnitudes()[spectrum.nearest_bin(fundamental)];
        let harmonics =
            harmonics::find_harmonics(&spectrum, fundamental, self.config.harmonic_count);

        log::debug!(
            "block of {} samples: {:.2} Hz ({}) magnitude {:.1}",
            samples.len(),
            fundamental,
            note_name,
            fundamental_magnitude
        );

        AnalysisResult {
            fundamental,
            detected_frequency,
            note_name,
            cents_deviation,
            fundamental_magnitude,
            harmonics,
            spectrum,
        }
    }
}
