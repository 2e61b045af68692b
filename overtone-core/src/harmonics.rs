//! Harmonic series lookup.

use serde::{Deserialize, Serialize};

use crate::spectrum::Spectrum;

/// Number of harmonics located when the caller has no preference.
pub const DEFAULT_HARMONIC_COUNT: usize = 5;

/// One measured member of a harmonic series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Harmonic {
    /// Harmonic number, 1 being the fundamental itself.
    pub number: u32,
    /// Frequency of the nearest spectral bin in Hz.
    pub frequency: f32,
    /// Linear magnitude of that bin.
    pub magnitude: f32,
}

/// Locates the bins nearest to the first `count` multiples of `fundamental`.
///
/// A zero fundamental places every entry on bin 0.
///
/// # Arguments
/// * `spectrum` - Magnitude spectrum to read from
/// * `fundamental` - Fundamental frequency in Hz
/// * `count` - Number of harmonics to locate
///
/// # Returns
/// Exactly `count` entries numbered `1..=count`, each holding the frequency
/// and magnitude of the nearest bin (the lower bin on ties)
pub fn find_harmonics(spectrum: &Spectrum, fundamental: f32, count: usize) -> Vec<Harmonic> {
    (1..=count)
        .map(|n| {
            let expected = fundamental * n as f32;
            let bin = spectrum.nearest_bin(expected);
            Harmonic {
                number: n as u32,
                frequency: spectrum.frequencies()[bin],
                magnitude: spectrum.magnitudes()[bin],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(bins: usize, step: f32) -> Spectrum {
        let frequencies = (0..bins).map(|i| i as f32 * step).collect();
        let magnitudes = (0..bins).map(|i| i as f32).collect();
        Spectrum::from_parts(frequencies, magnitudes).unwrap()
    }

    #[test]
    fn returns_requested_count_in_order() {
        let spectrum = ramp(200, 10.0);
        for count in [0, 1, 5, 12] {
            let harmonics = find_harmonics(&spectrum, 100.0, count);
            assert_eq!(harmonics.len(), count);
            for (i, h) in harmonics.iter().enumerate() {
                assert_eq!(h.number, i as u32 + 1);
            }
        }
    }

    #[test]
    fn snaps_to_nearest_bin() {
        let spectrum = ramp(200, 10.0);
        let harmonics = find_harmonics(&spectrum, 101.0, 3);
        let frequencies: Vec<f32> = harmonics.iter().map(|h| h.frequency).collect();
        assert_eq!(frequencies, vec![100.0, 200.0, 300.0]);
        assert_eq!(harmonics[2].magnitude, 30.0);
    }

    #[test]
    fn ties_go_to_lower_bin() {
        let spectrum = ramp(20, 10.0);
        let harmonics = find_harmonics(&spectrum, 15.0, 1);
        assert_eq!(harmonics[0].frequency, 10.0);
    }

    #[test]
    fn zero_fundamental_collapses_to_bin_zero() {
        let spectrum = ramp(50, 10.0);
        let harmonics = find_harmonics(&spectrum, 0.0, 5);
        assert_eq!(harmonics.len(), 5);
        for (i, h) in harmonics.iter().enumerate() {
            assert_eq!(h.number, i as u32 + 1);
            assert_eq!(h.frequency, 0.0);
            assert_eq!(h.magnitude, 0.0);
        }
    }

    #[test]
    fn multiples_beyond_nyquist_clamp_to_last_bin() {
        let spectrum = ramp(11, 10.0);
        let harmonics = find_harmonics(&spectrum, 40.0, 4);
        assert_eq!(harmonics[3].frequency, 100.0);
        assert_eq!(harmonics[2].frequency, 100.0);
    }
}
