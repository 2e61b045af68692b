//! WAV file input, for analysing recordings instead of a live device.

use anyhow::{Context, Result};
use std::path::Path;

use crate::audio::downmix_to_mono;

/// A decoded recording as mono samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct Recording {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Mono samples.
    pub samples: Vec<f32>,
}

impl Recording {
    /// Consecutive full blocks of `block_size` samples; the tail is dropped.
    pub fn blocks(&self, block_size: usize) -> impl Iterator<Item = &[f32]> {
        self.samples.chunks_exact(block_size.max(1))
    }

    /// Start time in seconds of block number `index`.
    pub fn block_offset(&self, index: usize, block_size: usize) -> f32 {
        (index * block_size) as f32 / self.sample_rate as f32
    }

    /// Length of the recording in seconds.
    pub fn duration(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Reads a WAV file, normalising integer samples and averaging channels.
pub fn read_wav(path: impl AsRef<Path>) -> Result<Recording> {
    let path = path.as_ref();
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let samples = downmix_to_mono(&interleaved, spec.channels as usize);
    log::debug!(
        "read {}: {} Hz, {} channel(s), {} samples",
        path.display(),
        spec.sample_rate,
        spec.channels,
        samples.len()
    );

    Ok(Recording {
        sample_rate: spec.sample_rate,
        samples,
    })
}
