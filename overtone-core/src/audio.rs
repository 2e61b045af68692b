//! # Audio Capture Module
//!
//! This module handles real-time audio capture using CPAL (Cross-Platform Audio Library).
//! It selects an input device and stream format, converts whatever the device
//! delivers into mono `f32` blocks of a fixed size, and hands each block to the
//! analysis side over a channel.
//!
//! ## Features
//! - Automatic default input device selection
//! - `f32` and `i16` sample formats (`i16` is scaled by 1/32768)
//! - Multi-channel input averaged down to mono
//! - Fixed-size block assembly independent of the device callback size

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SupportedStreamConfig, SupportedStreamConfigRange};
use crossbeam_channel::{Sender, TrySendError};

use crate::config::AnalyzerConfig;

/// Scale from signed 16-bit PCM to `[-1.0, 1.0)`.
const I16_SCALE: f32 = 32768.0;

/// Converts signed 16-bit PCM samples to floats in `[-1.0, 1.0)`.
pub fn normalize_i16(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / I16_SCALE).collect()
}

/// Averages interleaved frames of `channels` samples down to one channel.
///
/// A trailing incomplete frame is dropped.
pub fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Accumulates device callback data and cuts it into fixed-size mono blocks.
#[derive(Debug)]
pub struct BlockAssembler {
    block_size: usize,
    channels: usize,
    buffer: Vec<f32>,
    /// Interleaved samples of a frame split across two callbacks.
    partial_frame: Vec<f32>,
}

impl BlockAssembler {
    /// Creates an assembler emitting blocks of `block_size` mono samples from
    /// interleaved input with `channels` channels.
    pub fn new(block_size: usize, channels: usize) -> Self {
        Self {
            block_size: block_size.max(1),
            channels: channels.max(1),
            buffer: Vec::with_capacity(block_size * 2),
            partial_frame: Vec::new(),
        }
    }

    /// Appends interleaved samples and calls `emit` for each completed block.
    ///
    /// Samples of an incomplete trailing frame are held back and completed by
    /// the next call, so channels stay aligned across callbacks.
    pub fn push(&mut self, interleaved: &[f32], mut emit: impl FnMut(Vec<f32>)) {
        if self.partial_frame.is_empty() {
            let whole = interleaved.len() - interleaved.len() % self.channels;
            self.buffer.extend(downmix_to_mono(&interleaved[..whole], self.channels));
            self.partial_frame.extend_from_slice(&interleaved[whole..]);
        } else {
            self.partial_frame.extend_from_slice(interleaved);
            let whole = self.partial_frame.len() - self.partial_frame.len() % self.channels;
            self.buffer.extend(downmix_to_mono(&self.partial_frame[..whole], self.channels));
            self.partial_frame.drain(..whole);
        }

        // While we have enough data for a full block, hand it over.
        while self.buffer.len() >= self.block_size {
            let block: Vec<f32> = self.buffer.drain(..self.block_size).collect();
            emit(block);
        }
    }

    /// Samples waiting for the next block.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Sends a block without blocking the audio callback.
///
/// Blocks are dropped while the consumer is behind.
fn forward_block(sender: &Sender<Vec<f32>>, block: Vec<f32>) {
    match sender.try_send(block) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => log::debug!("analysis is behind, dropping block"),
        Err(TrySendError::Disconnected(_)) => log::trace!("block receiver is gone"),
    }
}

/// Starts audio capture from the default input device.
///
/// Blocks of `config.block_size` mono samples are pushed into `sender`. The
/// device may not support `config.sample_rate` exactly; the rate actually in
/// use is returned next to the stream and must be used for analysis.
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Audio stream handle and sample rate
/// * `Err(e)` - Error if no device or usable format is available
pub fn start_audio_capture(
    sender: Sender<Vec<f32>>,
    config: &AnalyzerConfig,
) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    log::info!("Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, config.sample_rate)
        .ok_or_else(|| anyhow!("No f32 or i16 input format found"))?;

    let sample_rate = supported_config.sample_rate().0;
    let channels = supported_config.channels() as usize;
    let sample_format = supported_config.sample_format();
    let stream_config: cpal::StreamConfig = supported_config.into();

    log::info!(
        "Selected {} Hz, {} channel(s), {:?}",
        sample_rate,
        channels,
        sample_format
    );

    let err_fn =
        |err: cpal::StreamError| log::warn!("An error occurred on the audio stream: {}", err);
    let mut assembler = BlockAssembler::new(config.block_size, channels);

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                assembler.push(data, |block| forward_block(&sender, block));
            },
            err_fn,
            None,
        )?,
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                assembler.push(&normalize_i16(data), |block| forward_block(&sender, block));
            },
            err_fn,
            None,
        )?,
        other => return Err(anyhow!("Unsupported sample format {:?}", other)),
    };

    stream.play()?;

    Ok((stream, sample_rate))
}

/// Distance from `target` to the closed range `[min, max]`.
fn rate_distance(min: u32, max: u32, target: u32) -> u32 {
    if target < min {
        min - target
    } else if target > max {
        target - max
    } else {
        0
    }
}

/// Finds the best supported audio configuration for the target sample rate.
///
/// Only `f32` and `i16` formats are considered. Among those, the closest
/// sample rate wins, then fewer channels, then `f32` over `i16`. The chosen
/// range is pinned to the rate within it nearest to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfig> {
    configs
        .into_iter()
        .filter(|c| matches!(c.sample_format(), SampleFormat::F32 | SampleFormat::I16))
        .min_by_key(|c| {
            (
                rate_distance(c.min_sample_rate().0, c.max_sample_rate().0, target_rate),
                c.channels(),
                c.sample_format() != SampleFormat::F32,
            )
        })
        .map(|c| {
            let rate = target_rate.clamp(c.min_sample_rate().0, c.max_sample_rate().0);
            c.with_sample_rate(cpal::SampleRate(rate))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i16_is_scaled_into_unit_range() {
        let out = normalize_i16(&[0, i16::MAX, i16::MIN, 16384]);
        assert_eq!(out[0], 0.0);
        assert!(out[1] < 1.0 && out[1] > 0.9999);
        assert_eq!(out[2], -1.0);
        assert_eq!(out[3], 0.5);
    }

    #[test]
    fn stereo_is_averaged() {
        let mono = downmix_to_mono(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0, 0.25], 2);
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
        assert_eq!(downmix_to_mono(&[0.1, 0.2], 1), vec![0.1, 0.2]);
    }

    #[test]
    fn assembler_emits_fixed_blocks() {
        let mut assembler = BlockAssembler::new(4, 1);
        let mut blocks = Vec::new();
        assembler.push(&[1.0, 2.0, 3.0], |b| blocks.push(b));
        assert!(blocks.is_empty());
        assert_eq!(assembler.pending(), 3);

        assembler.push(&[4.0, 5.0, 6.0, 7.0, 8.0, 9.0], |b| blocks.push(b));
        assert_eq!(blocks, vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 6.0, 7.0, 8.0]]);
        assert_eq!(assembler.pending(), 1);
    }

    #[test]
    fn assembler_downmixes_before_counting() {
        let mut assembler = BlockAssembler::new(2, 2);
        let mut blocks = Vec::new();
        assembler.push(&[1.0, 1.0, 0.0, 1.0, 0.5], |b| blocks.push(b));
        assert_eq!(blocks, vec![vec![1.0, 0.5]]);
        // The lone trailing sample is held, not counted as a frame.
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn split_frames_stay_aligned_across_callbacks() {
        let mut assembler = BlockAssembler::new(3, 2);
        let mut blocks = Vec::new();
        // Left channel is always 1.0, right channel always 0.0.
        assembler.push(&[1.0, 0.0, 1.0], |b| blocks.push(b));
        assert_eq!(assembler.pending(), 1);
        assembler.push(&[0.0, 1.0], |b| blocks.push(b));
        assert_eq!(assembler.pending(), 2);
        assembler.push(&[0.0, 1.0, 0.0, 1.0, 0.0], |b| blocks.push(b));
        assert_eq!(blocks, vec![vec![0.5, 0.5, 0.5]]);
        assert_eq!(assembler.pending(), 2);
    }

    #[test]
    fn full_channel_drops_blocks_without_blocking() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        forward_block(&tx, vec![1.0]);
        forward_block(&tx, vec![2.0]);
        assert_eq!(rx.try_recv().unwrap(), vec![1.0]);
        assert!(rx.try_recv().is_err());
        drop(rx);
        forward_block(&tx, vec![3.0]);
    }

    #[test]
    fn rate_distance_is_zero_inside_range() {
        assert_eq!(rate_distance(8_000, 48_000, 44_100), 0);
        assert_eq!(rate_distance(48_000, 96_000, 44_100), 3_900);
        assert_eq!(rate_distance(8_000, 22_050, 44_100), 22_050);
    }
}
