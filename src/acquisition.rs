//! Interactive acquisition of paths when none were given on the command line.
//!
//! [`AcquisitionLoop`] keeps asking the active [`InputSource`] until at least
//! one existing, readable path is supplied or the user cancels. The sources
//! differ only in how raw tokens are produced: [`LineInput`] reads a line of
//! text, [`DialogInput`] opens the native picker through a [`PathPicker`].

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use rfd::{FileDialog, MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};

use crate::console::Console;
use crate::preferences::PreferenceStore;

pub const LINE_PROMPT: &str = "Enter files and/or folders to validate:";
pub const ACCESS_ERROR: &str = "Unable to access file(s) or directory.";
pub const DIALOG_TITLE: &str = "XML Conformance Checker";

/// Raw input produced by one prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquired {
    Tokens(Vec<PathBuf>),
    Cancelled,
}

/// Final state of the acquisition loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionOutcome {
    /// Validated candidates in the order given
    Selected(Vec<PathBuf>),
    /// The user abandoned the prompt
    Cancelled,
}

impl AcquisitionOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AcquisitionOutcome::Cancelled)
    }

    pub fn into_candidates(self) -> Vec<PathBuf> {
        match self {
            AcquisitionOutcome::Selected(candidates) => candidates,
            AcquisitionOutcome::Cancelled => Vec::new(),
        }
    }
}

/// One interaction front-end
#[cfg_attr(test, mockall::automock)]
pub trait InputSource {
    /// Text prompt to show before acquiring, if the source uses one
    fn prompt(&self) -> Option<String>;

    fn acquire(&mut self) -> Acquired;
}

/// Native file/folder chooser
#[cfg_attr(test, mockall::automock)]
pub trait PathPicker {
    /// Returns `None` when the user cancels
    fn pick(&self, initial: Option<PathBuf>) -> Option<Vec<PathBuf>>;
}

/// Reads whitespace-separated paths, one line per attempt.
///
/// End of input counts as cancellation.
pub struct LineInput<R: BufRead> {
    reader: R,
}

impl<R: BufRead> LineInput<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> InputSource for LineInput<R> {
    fn prompt(&self) -> Option<String> {
        Some(LINE_PROMPT.to_string())
    }

    fn acquire(&mut self) -> Acquired {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => {
                tracing::debug!("End of input while waiting for paths");
                Acquired::Cancelled
            }
            Ok(_) => Acquired::Tokens(line.split_whitespace().map(PathBuf::from).collect()),
            Err(e) => {
                tracing::debug!("Unable to read paths: {}", e);
                Acquired::Cancelled
            }
        }
    }
}

/// Opens the picker, pre-populated with the last accepted selection
pub struct DialogInput<P: PathPicker, S: PreferenceStore> {
    picker: P,
    store: S,
}

impl<P: PathPicker, S: PreferenceStore> DialogInput<P, S> {
    pub fn new(picker: P, store: S) -> Self {
        Self { picker, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<P: PathPicker, S: PreferenceStore> InputSource for DialogInput<P, S> {
    fn prompt(&self) -> Option<String> {
        None
    }

    fn acquire(&mut self) -> Acquired {
        let initial = self.store.last_selection();

        match self.picker.pick(initial) {
            Some(selection) => {
                if let Some(first) = selection.first() {
                    self.store.set_last_selection(first);
                    if let Err(e) = self.store.save() {
                        tracing::debug!("Unable to save last selection: {}", e);
                    }
                }
                Acquired::Tokens(selection)
            }
            None => Acquired::Cancelled,
        }
    }
}

/// [`PathPicker`] backed by the platform's native dialogs
pub struct NativePicker {
    title: String,
}

impl NativePicker {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

impl Default for NativePicker {
    fn default() -> Self {
        Self::new(DIALOG_TITLE)
    }
}

impl PathPicker for NativePicker {
    fn pick(&self, initial: Option<PathBuf>) -> Option<Vec<PathBuf>> {
        // The native pickers select either files or folders, never both.
        let choice = MessageDialog::new()
            .set_level(MessageLevel::Info)
            .set_title(&self.title)
            .set_description(
                "Select XML files to validate?\n\nChoose \"No\" to select a folder instead.",
            )
            .set_buttons(MessageButtons::YesNoCancel)
            .show();

        let start_dir = initial.as_deref().and_then(|p| {
            if p.is_dir() {
                Some(p.to_path_buf())
            } else {
                p.parent().map(Path::to_path_buf)
            }
        });

        match choice {
            MessageDialogResult::Yes => {
                let mut dialog = FileDialog::new()
                    .set_title(&self.title)
                    .add_filter("XML Files", &["xml"]);
                if let Some(dir) = &start_dir {
                    dialog = dialog.set_directory(dir);
                }
                if let Some(name) = initial
                    .as_deref()
                    .filter(|p| p.is_file())
                    .and_then(|p| p.file_name())
                {
                    dialog = dialog.set_file_name(name.to_string_lossy());
                }
                dialog.pick_files()
            }
            MessageDialogResult::No => {
                let mut dialog = FileDialog::new().set_title(&self.title);
                if let Some(dir) = initial.as_deref().filter(|p| p.is_dir()).or(start_dir.as_deref()) {
                    dialog = dialog.set_directory(dir);
                }
                dialog.pick_folder().map(|folder| vec![folder])
            }
            _ => None,
        }
    }
}

/// Whether `path` exists and can be read (opened, or listed for folders)
pub fn is_accessible(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => std::fs::read_dir(path).is_ok(),
        Ok(_) => std::fs::File::open(path).is_ok(),
        Err(_) => false,
    }
}

/// Prompt-until-valid state machine
pub struct AcquisitionLoop;

impl AcquisitionLoop {
    pub fn run<S, W>(source: &mut S, console: &mut Console<W>) -> AcquisitionOutcome
    where
        S: InputSource + ?Sized,
        W: Write,
    {
        let mut show_error = false;
        console.set_checkpoint();

        loop {
            if show_error {
                console.error(ACCESS_ERROR);
            }

            if let Some(prompt) = source.prompt() {
                console.prompt(&prompt);
            }

            let tokens = match source.acquire() {
                Acquired::Tokens(tokens) => tokens,
                Acquired::Cancelled => {
                    console.println("Cancelled");
                    return AcquisitionOutcome::Cancelled;
                }
            };

            let accepted: Vec<PathBuf> = tokens
                .into_iter()
                .filter(|token| !token.as_os_str().is_empty())
                .filter(|token| {
                    let ok = is_accessible(token);
                    if !ok {
                        tracing::debug!("Rejected candidate {}", token.display());
                    }
                    ok
                })
                .collect();

            if !accepted.is_empty() {
                return AcquisitionOutcome::Selected(accepted);
            }

            console.reset_to_checkpoint();
            show_error = true;
        }
    }
}
