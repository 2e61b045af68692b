//! # Overtone - Console Tuner
//!
//! Command-line front end for the Overtone analysis engine. It feeds blocks
//! from a live input device, a WAV file, or a synthetic test tone through
//! [`overtone_core::Analyzer`] and prints what it hears.
//!
//! ## Architecture
//! - **Capture**: CPAL callback thread cuts the input into fixed-size blocks
//! - **Analysis Thread**: dedicated worker turns blocks into results
//! - **Main Thread**: prints results as they arrive
//! - **Communication**: Crossbeam channels, every result sent by value

mod report;
mod worker;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use overtone_core::{wav, Analyzer, AnalyzerConfig};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use report::Reporter;
use worker::AnalysisWorker;

#[derive(Parser)]
#[command(name = "overtone")]
#[command(
    about = "Real-time pitch, note and harmonic analysis for instrument tuning",
    long_about = None
)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

/// Analysis settings; flags override values from `--config`.
#[derive(Args)]
struct Settings {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Lower edge of the fundamental search band in Hz
    #[arg(long, global = true)]
    min_freq: Option<f32>,

    /// Upper edge of the fundamental search band in Hz
    #[arg(long, global = true)]
    max_freq: Option<f32>,

    /// Number of harmonics to report
    #[arg(long, global = true)]
    harmonics: Option<usize>,

    /// Samples per analysis block
    #[arg(long, global = true)]
    block_size: Option<usize>,

    /// Minimum fundamental magnitude for a block to be printed
    #[arg(long, global = true)]
    threshold: Option<f32>,

    /// Print one JSON object per result instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen to the default input device
    Listen {
        /// Stop after this many seconds (runs until interrupted otherwise)
        #[arg(long, value_parser = parse_seconds)]
        seconds: Option<f32>,
    },

    /// Analyse a WAV file block by block
    File {
        /// Path to the WAV file
        path: PathBuf,
    },

    /// Analyse a synthetic sine wave and print the full result
    Tone {
        /// Frequency of the test tone in Hz
        #[arg(long, default_value_t = 440.0)]
        frequency: f32,

        /// Length of the test tone in seconds
        #[arg(long, default_value_t = 1.0, value_parser = parse_seconds)]
        seconds: f32,
    },
}

/// Longest synthetic tone the self-test will generate.
const MAX_TONE_SECONDS: f32 = 600.0;

/// Accepts finite, non-negative durations in seconds.
fn parse_seconds(value: &str) -> std::result::Result<f32, String> {
    let seconds: f32 = value.parse().map_err(|e: std::num::ParseFloatError| e.to_string())?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("expected a finite, non-negative number of seconds, got {}", value));
    }
    Ok(seconds)
}

/// Point in time `seconds` after `now`, or `None` to run until interrupted.
fn listen_deadline(now: Instant, seconds: Option<f32>) -> Result<Option<Instant>> {
    let Some(seconds) = seconds else {
        return Ok(None);
    };
    let limit = Duration::try_from_secs_f32(seconds.max(0.0))
        .with_context(|| format!("invalid listening time {} s", seconds))?;
    now.checked_add(limit)
        .map(Some)
        .ok_or_else(|| anyhow!("listening time {} s is too long", seconds))
}

impl Settings {
    /// Loads the configuration file, if any, and applies flag overrides.
    fn resolve(&self) -> Result<AnalyzerConfig> {
        let mut config = match &self.config {
            Some(path) => AnalyzerConfig::from_json_file(path)
                .with_context(|| format!("invalid config file {}", path.display()))?,
            None => AnalyzerConfig::default(),
        };
        if let Some(min_freq) = self.min_freq {
            config.min_freq = min_freq;
        }
        if let Some(max_freq) = self.max_freq {
            config.max_freq = max_freq;
        }
        if let Some(harmonics) = self.harmonics {
            config.harmonic_count = harmonics;
        }
        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
        }
        if let Some(threshold) = self.threshold {
            config.magnitude_threshold = threshold;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = cli.settings.resolve()?;
    let reporter = Reporter::new(cli.settings.json);

    match cli.command {
        Commands::Listen { seconds } => listen(config, &reporter, seconds),
        Commands::File { path } => analyse_file(config, &reporter, &path),
        Commands::Tone { frequency, seconds } => {
            analyse_tone(config, &reporter, frequency, seconds)
        }
    }
}

/// Live monitor: prints every audible block until the deadline or Ctrl+C.
fn listen(config: AnalyzerConfig, reporter: &Reporter, seconds: Option<f32>) -> Result<()> {
    let threshold = config.magnitude_threshold;
    let deadline = listen_deadline(Instant::now(), seconds)?;
    let mut worker = AnalysisWorker::start(config)?;

    eprintln!("Listening at {} Hz. Press Ctrl+C to stop.", worker.sample_rate());

    loop {
        let timeout = match deadline {
            Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                Some(remaining) => remaining,
                None => break,
            },
            None => Duration::from_secs(1),
        };

        match worker.results().recv_timeout(timeout) {
            Ok(result) => {
                if result.is_audible(threshold) {
                    reporter.live(&result)?;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                log::warn!("analysis thread stopped");
                break;
            }
        }
    }

    worker.shutdown();
    Ok(())
}

/// Prints one line per audible block of a WAV recording.
fn analyse_file(mut config: AnalyzerConfig, reporter: &Reporter, path: &Path) -> Result<()> {
    let recording = wav::read_wav(path)?;
    config.sample_rate = recording.sample_rate;
    let analyzer = Analyzer::new(config)?;
    let block_size = analyzer.config().block_size;
    let threshold = analyzer.config().magnitude_threshold;

    log::info!(
        "{}: {:.2} s at {} Hz",
        path.display(),
        recording.duration(),
        recording.sample_rate
    );

    for (index, block) in recording.blocks(block_size).enumerate() {
        let result = analyzer.analyze(block);
        if result.is_audible(threshold) {
            reporter.timed(recording.block_offset(index, block_size), &result)?;
        }
    }
    Ok(())
}

/// Self-test: analyses a generated sine and prints the full result.
fn analyse_tone(
    config: AnalyzerConfig,
    reporter: &Reporter,
    frequency: f32,
    seconds: f32,
) -> Result<()> {
    if !(0.0..=MAX_TONE_SECONDS).contains(&seconds) {
        bail!("tone length must be between 0 and {} s, got {}", MAX_TONE_SECONDS, seconds);
    }
    let sample_rate = config.sample_rate as f32;
    let len = ((sample_rate * seconds).round() as usize).max(3);
    let signal: Vec<f32> = (0..len)
        .map(|i| (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate).sin())
        .collect();

    let analyzer = Analyzer::new(config)?;
    let result = analyzer.analyze(&signal);
    reporter.detailed(frequency, &result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_must_be_finite_and_non_negative() {
        assert_eq!(parse_seconds("2.5"), Ok(2.5));
        assert_eq!(parse_seconds("0"), Ok(0.0));
        assert!(parse_seconds("inf").is_err());
        assert!(parse_seconds("NaN").is_err());
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("soon").is_err());
    }

    #[test]
    fn listen_deadline_rejects_unrepresentable_times() {
        let now = Instant::now();
        assert!(listen_deadline(now, None).unwrap().is_none());
        assert_eq!(
            listen_deadline(now, Some(1.5)).unwrap(),
            Some(now + Duration::from_millis(1500))
        );
        assert!(listen_deadline(now, Some(f32::INFINITY)).is_err());
        assert!(listen_deadline(now, Some(f32::MAX)).is_err());
    }

    #[test]
    fn infinite_tone_is_refused() {
        let reporter = Reporter::new(true);
        let config = AnalyzerConfig::default();
        assert!(analyse_tone(config.clone(), &reporter, 440.0, f32::INFINITY).is_err());
        assert!(analyse_tone(config, &reporter, 440.0, MAX_TONE_SECONDS * 2.0).is_err());
    }
}
