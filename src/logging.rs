use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter applied to the per-file debug log: everything from this crate plus
/// the HTTP client's connection tracing.
pub const DEBUG_DIRECTIVES: &str = "debug,reqwest=trace,hyper_util=trace";

/// Console filter for the given verbosity, unless `RUST_LOG` is set.
pub fn console_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let level = if verbose {
        "info"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    EnvFilter::new(level)
}

/// Setup logging to stderr, plus the per-file debug capture when `debug` is set.
///
/// The returned [`DebugCapture`] is detached until the orchestrator points it
/// at a file; with `debug` off nothing is ever written to it.
pub fn setup_logging(verbose: bool, quiet: bool, debug: bool) -> Result<DebugCapture> {
    let capture = DebugCapture::new();

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .with_filter(console_filter(verbose, quiet));

    let capture_layer = debug.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(capture.clone())
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_filter(EnvFilter::new(DEBUG_DIRECTIVES))
    });

    tracing_subscriber::registry()
        .with(console_layer)
        .with(capture_layer)
        .try_init()
        .context("Failed to initialise logging")?;

    let debug_mode = debug;
    tracing::debug!(verbose, quiet, debug_mode, "Logging initialized");

    Ok(capture)
}

/// Redirectable log sink for debug mode.
///
/// Clones share one target. While detached, writes are discarded.
#[derive(Debug, Clone, Default)]
pub struct DebugCapture {
    target: Arc<Mutex<Option<CaptureTarget>>>,
}

#[derive(Debug)]
struct CaptureTarget {
    path: PathBuf,
    file: File,
}

impl DebugCapture {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<CaptureTarget>> {
        self.target.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start writing to `path`, truncating it. Any previous target is closed.
    pub fn attach(&self, path: &Path) -> io::Result<()> {
        let mut file = File::create(path)?;
        writeln!(
            file,
            "# Debug log for {} started {}",
            path.display(),
            chrono::Local::now().to_rfc3339()
        )?;

        let previous = self.lock().replace(CaptureTarget {
            path: path.to_path_buf(),
            file,
        });
        if let Some(mut previous) = previous {
            let _ = previous.file.flush();
        }
        Ok(())
    }

    /// Stop capturing; returns the path that was being written
    pub fn detach(&self) -> Option<PathBuf> {
        self.lock().take().map(|mut target| {
            let _ = target.file.flush();
            target.path
        })
    }

    pub fn current_path(&self) -> Option<PathBuf> {
        self.lock().as_ref().map(|target| target.path.clone())
    }
}

/// Writer handed out per event by [`DebugCapture`]
pub struct CaptureWriter {
    target: Arc<Mutex<Option<CaptureTarget>>>,
}

impl Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.target.lock().unwrap_or_else(|p| p.into_inner());
        match guard.as_mut() {
            Some(target) => target.file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self.target.lock().unwrap_or_else(|p| p.into_inner());
        match guard.as_mut() {
            Some(target) => target.file.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for DebugCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter {
            target: Arc::clone(&self.target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detached_capture_discards_writes() {
        let capture = DebugCapture::new();
        let mut writer = capture.make_writer();
        assert_eq!(writer.write(b"dropped").unwrap(), 7);
        assert_eq!(capture.current_path(), None);
    }

    #[test]
    fn test_attach_writes_until_detached() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("a.xml-sysout.log");
        let second = temp_dir.path().join("b.xml-sysout.log");
        let capture = DebugCapture::new();

        capture.attach(&first).unwrap();
        capture.make_writer().write_all(b"first line\n").unwrap();
        assert_eq!(capture.current_path(), Some(first.clone()));

        capture.attach(&second).unwrap();
        capture.make_writer().write_all(b"second line\n").unwrap();
        assert_eq!(capture.detach(), Some(second.clone()));

        capture.make_writer().write_all(b"after detach\n").unwrap();

        let first_text = std::fs::read_to_string(&first).unwrap();
        let second_text = std::fs::read_to_string(&second).unwrap();
        assert!(first_text.starts_with("# Debug log for"));
        assert!(first_text.contains("first line"));
        assert!(!first_text.contains("second line"));
        assert!(second_text.contains("second line"));
        assert!(!second_text.contains("after detach"));
    }

    #[test]
    fn test_attach_truncates_existing_log() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.xml-sysout.log");
        std::fs::write(&path, "stale content").unwrap();

        let capture = DebugCapture::new();
        capture.attach(&path).unwrap();
        capture.detach();

        assert!(!std::fs::read_to_string(&path).unwrap().contains("stale"));
    }

    #[test]
    fn test_attach_to_unwritable_path_fails() {
        let capture = DebugCapture::new();
        assert!(capture.attach(Path::new("/definitely/missing/dir/x.log")).is_err());
        assert_eq!(capture.current_path(), None);
    }

    #[test]
    fn test_clones_share_target() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("shared.log");
        let capture = DebugCapture::new();
        let clone = capture.clone();

        capture.attach(&path).unwrap();
        assert_eq!(clone.detach(), Some(path));
        assert_eq!(capture.current_path(), None);
    }

    #[test]
    fn test_debug_directives_only_name_linked_crates() {
        assert!(EnvFilter::try_new(DEBUG_DIRECTIVES).is_ok());
        for directive in DEBUG_DIRECTIVES.split(',').skip(1) {
            let target = directive.split('=').next().unwrap();
            assert!(["reqwest", "hyper_util"].contains(&target), "{}", target);
        }
    }

    #[test]
    fn test_setup_logging_routes_debug_events_into_capture() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("run.xml-sysout.log");

        let capture = setup_logging(false, false, true).unwrap();
        capture.attach(&path).unwrap();
        let debug_mode = true;
        tracing::debug!(debug_mode, "captured after setup");
        capture.detach();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("captured after setup"));
        assert!(text.contains("debug_mode=true"));

        assert!(setup_logging(false, false, false).is_err());
    }
}
