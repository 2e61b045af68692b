//! # Fundamental Frequency Detection
//!
//! Picks the strongest spectral peak inside a frequency band and refines it
//! to sub-bin accuracy with three-point parabolic interpolation.
//!
//! The strongest bin is not always the fundamental. Notes whose second
//! harmonic carries more energy than the fundamental will be reported an
//! octave high; callers that need octave-robust detection must look elsewhere.

use crate::spectrum::Spectrum;

/// Lower edge of the default search band in Hz.
pub const DEFAULT_MIN_FREQ: f32 = 50.0;
/// Upper edge of the default search band in Hz.
pub const DEFAULT_MAX_FREQ: f32 = 2000.0;

/// Denominators at or below this magnitude are treated as a flat parabola.
const PARABOLA_EPSILON: f32 = 1e-10;

/// Offset of a parabola's vertex relative to the centre of three samples.
///
/// `alpha`, `beta` and `gamma` are the magnitudes at bins `k - 1`, `k` and
/// `k + 1`. The result is in bins and clamped to `[-0.5, 0.5]`. Returns `None`
/// when the three points are (nearly) collinear.
pub fn parabolic_offset(alpha: f32, beta: f32, gamma: f32) -> Option<f32> {
    let denom = alpha - 2.0 * beta + gamma;
    if denom.is_nan() || denom.abs() <= PARABOLA_EPSILON {
        return None;
    }
    let delta = 0.5 * (alpha - gamma) / denom;
    if delta.is_nan() {
        return None;
    }
    Some(delta.clamp(-0.5, 0.5))
}

/// Finds the fundamental frequency within `[min_freq, max_freq]`.
///
/// The strongest bin in the band wins, the first one on ties. It is shifted
/// by the parabolic offset when it has a neighbour on both sides inside the
/// band.
///
/// # Arguments
/// * `spectrum` - Magnitude spectrum to search
/// * `min_freq` - Lower edge of the band in Hz, inclusive
/// * `max_freq` - Upper edge of the band in Hz, inclusive
///
/// # Returns
/// The estimated fundamental in Hz, or `0.0` when no bin falls inside the band
pub fn find_fundamental(spectrum: &Spectrum, min_freq: f32, max_freq: f32) -> f32 {
    let frequencies = spectrum.frequencies();
    let magnitudes = spectrum.magnitudes();

    // Frequencies are increasing, so the band is one contiguous run of bins.
    let Some(start) = frequencies.iter().position(|&f| f >= min_freq && f <= max_freq) else {
        return 0.0;
    };
    let end = frequencies[start..]
        .iter()
        .position(|&f| f > max_freq)
        .map_or(frequencies.len(), |offset| start + offset);

    let band = &magnitudes[start..end];
    let mut peak = 0;
    for (i, &magnitude) in band.iter().enumerate() {
        if magnitude > band[peak] {
            peak = i;
        }
    }

    let raw = frequencies[start + peak];
    if peak == 0 || peak + 1 >= band.len() {
        return raw;
    }

    let Some(spacing) = spectrum.bin_spacing() else {
        return raw;
    };

    match parabolic_offset(band[peak - 1], band[peak], band[peak + 1]) {
        Some(delta) => {
            log::trace!("peak at {:.2} Hz refined by {:+.3} bins", raw, delta);
            raw + delta * spacing
        }
        None => raw,
    }
}

/// [`find_fundamental`] over the default 50 Hz to 2000 Hz band.
pub fn find_fundamental_default(spectrum: &Spectrum) -> f32 {
    find_fundamental(spectrum, DEFAULT_MIN_FREQ, DEFAULT_MAX_FREQ)
}
