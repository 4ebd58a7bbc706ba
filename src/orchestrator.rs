//! Sequential validation of a resolved file list.

use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;

use crate::console::Console;
use crate::logging::DebugCapture;
use crate::resolver::FileList;
use crate::validator::XmlValidator;

/// Suffix appended to a file's path to name its debug log
pub const DEFAULT_LOG_SUFFIX: &str = "-sysout.log";

/// Result for one validated file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_log: Option<PathBuf>,
}

/// Aggregate result of one orchestrator run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub processed: usize,
    pub errors: usize,
    pub files: Vec<FileOutcome>,
    /// Set when the list was empty and usage was shown instead
    pub usage_shown: bool,
    pub duration_ms: u64,
}

impl RunOutcome {
    pub fn errors_found(&self) -> bool {
        self.errors > 0
    }

    /// Process exit code: 1 if any file failed, else 0
    pub fn exit_code(&self) -> i32 {
        if self.errors_found() { 1 } else { 0 }
    }

    pub fn summary_line(&self) -> String {
        format!(
            "Processed {} files, of which {} had errors.",
            self.processed, self.errors
        )
    }
}

/// Runs the validator over every file in order and tallies the failures
pub struct ValidationOrchestrator<V: XmlValidator> {
    validator: V,
    capture: Option<DebugCapture>,
    log_suffix: String,
}

impl<V: XmlValidator> ValidationOrchestrator<V> {
    pub fn new(validator: V) -> Self {
        Self {
            validator,
            capture: None,
            log_suffix: DEFAULT_LOG_SUFFIX.to_string(),
        }
    }

    /// Enable debug mode: each file's diagnostics go to `<file><suffix>`
    pub fn with_debug_capture(mut self, capture: DebugCapture, suffix: impl Into<String>) -> Self {
        self.capture = Some(capture);
        self.log_suffix = suffix.into();
        self
    }

    pub fn debug_mode(&self) -> bool {
        self.capture.is_some()
    }

    pub async fn run<W: Write>(
        &self,
        files: &FileList,
        version_info: &str,
        console: &mut Console<W>,
    ) -> RunOutcome {
        let start = Instant::now();
        let mut outcome = RunOutcome::default();

        if files.is_empty() {
            console.usage();
            outcome.usage_shown = true;
            return outcome;
        }

        for file in files {
            console.println(format!("Validating {}", file.path.display()));
            console.flush();

            let debug_log = self.attach_capture(&file.path);

            let valid = self.validator.validate(&file.path, version_info).await;

            if let Some(capture) = &self.capture {
                capture.detach();
            }

            outcome.processed += 1;
            if !valid {
                outcome.errors += 1;
            }
            outcome.files.push(FileOutcome {
                path: file.path.clone(),
                valid,
                debug_log,
            });
        }

        console.println(outcome.summary_line());
        outcome.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        tracing::info!(
            processed = outcome.processed,
            errors = outcome.errors,
            "Validation run complete"
        );
        outcome
    }

    /// Point the debug capture at the file's log. A log that cannot be
    /// created is reported and the file is validated without one.
    fn attach_capture(&self, file: &std::path::Path) -> Option<PathBuf> {
        let capture = self.capture.as_ref()?;

        let mut log_path = file.as_os_str().to_os_string();
        log_path.push(&self.log_suffix);
        let log_path = PathBuf::from(log_path);

        match capture.attach(&log_path) {
            Ok(()) => {
                tracing::debug!(file = %file.display(), "Debug capture started");
                Some(log_path)
            }
            Err(e) => {
                tracing::warn!("Unable to create debug log {}: {}", log_path.display(), e);
                None
            }
        }
    }
}
