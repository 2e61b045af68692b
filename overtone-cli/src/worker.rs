//! Audio worker thread management.
//!
//! Owns the capture stream and a dedicated analysis thread. Raw blocks flow
//! from the CPAL callback to the thread; finished [`AnalysisResult`]s flow
//! back to the caller.

use anyhow::Result;
use cpal::traits::StreamTrait;
use crossbeam_channel::{Receiver, Sender};
use overtone_core::{audio, AnalysisResult, Analyzer, AnalyzerConfig};
use std::thread::{self, JoinHandle};

/// Raw blocks buffered between the callback and the analysis thread.
const BLOCK_QUEUE: usize = 8;

/// Handle to a running capture and analysis pipeline.
pub struct AnalysisWorker {
    shutdown_tx: Sender<()>,
    results_rx: Receiver<AnalysisResult>,
    thread_handle: Option<JoinHandle<()>>,
    stream: Option<cpal::Stream>,
    sample_rate: u32,
}

impl AnalysisWorker {
    /// Opens the default input device and starts analysing its blocks.
    pub fn start(mut config: AnalyzerConfig) -> Result<Self> {
        let (raw_audio_tx, raw_audio_rx) = crossbeam_channel::bounded::<Vec<f32>>(BLOCK_QUEUE);
        let (stream, sample_rate) = audio::start_audio_capture(raw_audio_tx, &config)?;
        log::info!("audio capture started");

        if sample_rate != config.sample_rate {
            log::warn!(
                "device runs at {} Hz instead of {} Hz",
                sample_rate,
                config.sample_rate
            );
            config.sample_rate = sample_rate;
        }
        let analyzer = Analyzer::new(config)?;

        let (results_tx, results_rx) = crossbeam_channel::unbounded();
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);

        let thread_handle = thread::spawn(move || {
            log::debug!("analysis thread running");
            analysis_loop(&analyzer, &raw_audio_rx, &shutdown_rx, &results_tx);
            log::debug!("analysis thread finished");
        });

        Ok(Self {
            shutdown_tx,
            results_rx,
            thread_handle: Some(thread_handle),
            stream: Some(stream),
            sample_rate,
        })
    }

    /// Sample rate the device is actually running at.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Results in the order their blocks were captured.
    pub fn results(&self) -> &Receiver<AnalysisResult> {
        &self.results_rx
    }

    /// Stops the stream and joins the analysis thread.
    pub fn shutdown(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::warn!("error pausing stream: {}", e);
            }
            drop(stream);
        }
        let _ = self.shutdown_tx.try_send(());
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::warn!("analysis thread panicked");
            }
        }
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Analyses blocks until the block source closes, the result receiver goes
/// away, or a shutdown signal arrives.
fn analysis_loop(
    analyzer: &Analyzer,
    blocks: &Receiver<Vec<f32>>,
    shutdown: &Receiver<()>,
    results: &Sender<AnalysisResult>,
) {
    loop {
        crossbeam_channel::select! {
            recv(blocks) -> msg => match msg {
                Ok(block) => {
                    if results.send(analyzer.analyze(&block)).is_err() {
                        log::debug!("result receiver closed");
                        break;
                    }
                }
                Err(_) => {
                    log::debug!("audio channel closed");
                    break;
                }
            },
            recv(shutdown) -> _ => {
                log::debug!("received shutdown signal");
                break;
            },
        }
    }
}
