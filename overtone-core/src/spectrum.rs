//! # Windowed Spectral Estimator
//!
//! Turns one block of real-valued samples into a one-sided magnitude
//! spectrum. The block is tapered with a Hann window, transformed with
//! RustFFT and reduced to the `N / 2 + 1` non-negative frequency bins.
//!
//! ## Features
//! - Symmetric Hann windowing for reduced spectral leakage
//! - Optional DC offset removal
//! - Never fails, even for degenerate block lengths

use rustfft::{num_complex::Complex, FftPlanner};
use thiserror::Error;

/// Errors raised when assembling a [`Spectrum`] from caller-provided arrays.
#[derive(Debug, Error, PartialEq)]
pub enum SpectrumError {
    /// The frequency and magnitude arrays differ in length.
    #[error("frequency and magnitude arrays differ in length ({frequencies} vs {magnitudes})")]
    LengthMismatch {
        /// Length of the frequency array.
        frequencies: usize,
        /// Length of the magnitude array.
        magnitudes: usize,
    },
    /// A spectrum needs at least one bin.
    #[error("spectrum must contain at least one bin")]
    Empty,
    /// Bin frequencies must be finite and strictly increasing.
    #[error("bin frequencies are not strictly increasing at index {index}")]
    NotIncreasing {
        /// First bin that is not above its predecessor.
        index: usize,
    },
}

/// A one-sided magnitude spectrum.
///
/// `frequencies` starts at 0 Hz and is uniformly spaced by
/// `sample_rate / N`; `magnitudes[i]` is the linear magnitude of bin `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    frequencies: Vec<f32>,
    magnitudes: Vec<f32>,
}

impl Spectrum {
    /// Builds a spectrum from parallel frequency and magnitude arrays.
    ///
    /// # Arguments
    /// * `frequencies` - Bin centre frequencies in Hz, finite and strictly increasing
    /// * `magnitudes` - Linear magnitude of each bin
    ///
    /// # Returns
    /// * `Ok(spectrum)` - The validated spectrum
    /// * `Err(e)` - If the arrays differ in length, are empty, or the
    ///   frequencies do not strictly increase
    pub fn from_parts(
        frequencies: Vec<f32>,
        magnitudes: Vec<f32>,
    ) -> Result<Self, SpectrumError> {
        if frequencies.len() != magnitudes.len() {
            return Err(SpectrumError::LengthMismatch {
                frequencies: frequencies.len(),
                magnitudes: magnitudes.len(),
            });
        }
        if frequencies.is_empty() {
            return Err(SpectrumError::Empty);
        }
        if let Some(index) = frequencies.iter().position(|f| !f.is_finite()) {
            return Err(SpectrumError::NotIncreasing { index });
        }
        if let Some(offset) = frequencies.windows(2).position(|pair| pair[1] <= pair[0]) {
            return Err(SpectrumError::NotIncreasing { index: offset + 1 });
        }
        Ok(Self { frequencies, magnitudes })
    }

    /// Bin centre frequencies in Hz.
    pub fn frequencies(&self) -> &[f32] {
        &self.frequencies
    }

    /// Linear bin magnitudes.
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// Always false for spectra produced by this crate.
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Uniform bin spacing taken from the first two bins, if there are two.
    pub fn bin_spacing(&self) -> Option<f32> {
        match self.frequencies.as_slice() {
            [first, second, ..] => Some(second - first),
            _ => None,
        }
    }

    /// Index of the bin whose frequency is closest to `target`.
    ///
    /// Ties resolve to the lowest index.
    pub fn nearest_bin(&self, target: f32) -> usize {
        let mut best = 0;
        let mut best_diff = f32::INFINITY;
        for (i, &freq) in self.frequencies.iter().enumerate() {
            let diff = (freq - target).abs();
            if diff < best_diff {
                best_diff = diff;
                best = i;
            }
        }
        best
    }

    /// Consumes the spectrum, returning `(frequencies, magnitudes)`.
    pub fn into_parts(self) -> (Vec<f32>, Vec<f32>) {
        (self.frequencies, self.magnitudes)
    }
}

/// Pre-processing switches for [`compute_spectrum_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpectrumOptions {
    /// Subtract the block mean before windowing.
    pub remove_dc_offset: bool,
}

/// Removes the DC offset from a signal by making its average value zero.
fn remove_dc_offset(signal: &mut [f32]) {
    let len = signal.len();
    if len == 0 {
        return;
    }
    let avg = signal.iter().sum::<f32>() / len as f32;
    if avg.abs() > 1e-6 {
        for sample in signal.iter_mut() {
            *sample -= avg;
        }
    }
}

/// Applies a symmetric Hann window in place.
///
/// A single sample is left untouched, matching the usual `[1.0]` window of
/// length one.
fn apply_hann_window(buffer: &mut [f32]) {
    let n = buffer.len();
    if n < 2 {
        return;
    }
    let n_minus_1 = (n - 1) as f32;
    for (i, sample) in buffer.iter_mut().enumerate() {
        let multiplier = 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n_minus_1).cos());
        *sample *= multiplier;
    }
}

/// Computes the windowed magnitude spectrum of `samples`.
///
/// An empty block yields a single silent bin at 0 Hz.
///
/// # Arguments
/// * `samples` - One block of real-valued samples
/// * `sample_rate` - Sample rate in Hz
///
/// # Returns
/// `floor(N / 2) + 1` bins, where bin `i` sits at `i * sample_rate / N`
pub fn compute_spectrum(samples: &[f32], sample_rate: f32) -> Spectrum {
    compute_spectrum_with(samples, sample_rate, SpectrumOptions::default())
}

/// [`compute_spectrum`] with explicit pre-processing options.
pub fn compute_spectrum_with(
    samples: &[f32],
    sample_rate: f32,
    options: SpectrumOptions,
) -> Spectrum {
    let n = samples.len();
    if n == 0 {
        return Spectrum {
            frequencies: vec![0.0],
            magnitudes: vec![0.0],
        };
    }

    let mut processed_signal = samples.to_vec();
    if options.remove_dc_offset {
        remove_dc_offset(&mut processed_signal);
    }
    apply_hann_window(&mut processed_signal);

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);

    let mut buffer: Vec<Complex<f32>> = processed_signal
        .into_iter()
        .map(|sample| Complex { re: sample, im: 0.0 })
        .collect();

    fft.process(&mut buffer);

    let bins = n / 2 + 1;
    let bin_width = sample_rate / n as f32;
    let magnitudes: Vec<f32> = buffer.iter().take(bins).map(|c| c.norm()).collect();
    let frequencies: Vec<f32> = (0..bins).map(|i| i as f32 * bin_width).collect();

    log::trace!("computed {} bins at {:.3} Hz spacing", bins, bin_width);

    Spectrum { frequencies, magnitudes }
}
