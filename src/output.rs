//! Run reports printed after the summary line.

use std::time::Duration;

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::console::Tone;
use crate::orchestrator::{FileOutcome, RunOutcome};

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    outcome: &'a RunOutcome,
    exit_code: i32,
}

/// Formats a [`RunOutcome`] for the configured [`OutputFormat`]
pub struct Output {
    format: OutputFormat,
    verbose: bool,
    show_colors: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbose: bool, show_colors: bool) -> Self {
        Self {
            format,
            verbose,
            show_colors,
        }
    }

    fn colorize(&self, text: &str, tone: Tone) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", tone.code(), text)
        } else {
            text.to_string()
        }
    }

    /// Report to print after the run, if the format calls for one
    pub fn render(&self, outcome: &RunOutcome) -> Option<String> {
        match self.format {
            OutputFormat::Json => Some(self.format_json(outcome)),
            OutputFormat::Human if self.verbose && !outcome.usage_shown => {
                Some(self.format_details(outcome))
            }
            OutputFormat::Human => None,
        }
    }

    pub fn format_json(&self, outcome: &RunOutcome) -> String {
        let report = JsonReport {
            outcome,
            exit_code: outcome.exit_code(),
        };
        serde_json::to_string_pretty(&report).unwrap_or_else(|e| {
            tracing::warn!("Unable to serialise run report: {}", e);
            "{}".to_string()
        })
    }

    pub fn format_file_result(&self, result: &FileOutcome) -> String {
        let mut line = if result.valid {
            format!("{}  {}", self.colorize("✓ VALID", Tone::Green), result.path.display())
        } else {
            format!("{}  {}", self.colorize("✗ INVALID", Tone::Red), result.path.display())
        };

        if let Some(log) = &result.debug_log {
            line.push_str(&format!(" (debug log: {})", log.display()));
        }
        line
    }

    fn format_details(&self, outcome: &RunOutcome) -> String {
        let mut output = String::new();
        for result in &outcome.files {
            output.push_str(&self.format_file_result(result));
            output.push('\n');
        }
        output.push_str(&format!(
            "Duration: {}",
            format_duration(Duration::from_millis(outcome.duration_ms))
        ));
        output
    }
}

pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}
