//! Text and JSON rendering of analysis results.

use anyhow::Result;
use overtone_core::AnalysisResult;
use serde::Serialize;
use std::io::Write;

/// A result tagged with the time of its block within a recording.
#[derive(Serialize)]
struct TimedResult<'a> {
    time: f32,
    #[serde(flatten)]
    result: &'a AnalysisResult,
}

/// A self-test result next to the frequency that was generated.
#[derive(Serialize)]
struct ToneReport<'a> {
    generated_frequency: f32,
    #[serde(flatten)]
    result: &'a AnalysisResult,
}

/// Writes results to stdout as text lines or JSON lines.
pub struct Reporter {
    json: bool,
}

impl Reporter {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// One line per live block.
    pub fn live(&self, result: &AnalysisResult) -> Result<()> {
        let line = if self.json {
            serde_json::to_string(result)?
        } else {
            live_line(result)
        };
        emit(&line)
    }

    /// One line per recording block, prefixed with its start time.
    pub fn timed(&self, time: f32, result: &AnalysisResult) -> Result<()> {
        let line = if self.json {
            serde_json::to_string(&TimedResult { time, result })?
        } else {
            format!("{:8.2}s  {}", time, live_line(result))
        };
        emit(&line)
    }

    /// The full breakdown printed by the `tone` self-test.
    pub fn detailed(&self, generated_frequency: f32, result: &AnalysisResult) -> Result<()> {
        let text = if self.json {
            serde_json::to_string_pretty(&ToneReport { generated_frequency, result })?
        } else {
            detailed_text(generated_frequency, result)
        };
        emit(&text)
    }
}

fn emit(text: &str) -> Result<()> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", text)?;
    out.flush()?;
    Ok(())
}

fn live_line(result: &AnalysisResult) -> String {
    let cents = match result.cents_deviation {
        Some(cents) => format!("{:+6.1} cents", cents),
        None => "   --- cents".to_string(),
    };
    format!(
        "Note: {:4} | Frequency: {:7.2} Hz | {} | Mag: {:.0}",
        result.note_name, result.fundamental, cents, result.fundamental_magnitude
    )
}

fn detailed_text(generated_frequency: f32, result: &AnalysisResult) -> String {
    let mut text = format!(
        "Generated frequency: {} Hz\nDetected frequency: {:.2} Hz\nDetected note: {}\n\nHarmonics:",
        generated_frequency, result.fundamental, result.note_name
    );
    for h in &result.harmonics {
        text.push_str(&format!(
            "\n  Harmonic {}: {:.2} Hz (magnitude: {:.2})",
            h.number, h.frequency, h.magnitude
        ));
    }
    text
}
