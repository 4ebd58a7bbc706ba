//! Front-end text output.
//!
//! Every line the user sees goes through [`Console`], which owns colouring
//! and the prompt checkpoint used by the acquisition loop.

use std::io::{self, Write};

use crossterm::{
    cursor::{RestorePosition, SavePosition},
    queue,
    terminal::{Clear, ClearType},
};

const USAGE: &str = "Usage:
\tInput files and/or folders can be provided on the command line or entered when prompted.
\tProviding multiple files and/or folders is allowed.

\tE.g. xml-conformance <input.xml> OR <folder containing XML files>
";

/// ANSI colours used by the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Green,
    Red,
    Yellow,
    Cyan,
}

impl Tone {
    pub(crate) fn code(&self) -> &'static str {
        match self {
            Tone::Green => "32",
            Tone::Red => "31",
            Tone::Yellow => "33",
            Tone::Cyan => "36",
        }
    }
}

pub struct Console<W: Write> {
    out: W,
    show_colors: bool,
    checkpoints: bool,
    quiet: bool,
    usage_printed: bool,
}

impl Console<io::Stdout> {
    /// Console on stdout, styled only when stdout is a terminal
    pub fn stdout(quiet: bool) -> Self {
        let is_tty = atty::is(atty::Stream::Stdout);
        Self::new(io::stdout(), is_tty, is_tty).with_quiet(quiet)
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W, show_colors: bool, checkpoints: bool) -> Self {
        Self {
            out,
            show_colors,
            checkpoints,
            quiet: false,
            usage_printed: false,
        }
    }

    /// Suppress informational lines; errors and prompts are still written
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    fn colorize(&self, text: &str, tone: Tone) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", tone.code(), text)
        } else {
            text.to_string()
        }
    }

    /// Write a line unless the console is quiet.
    ///
    /// Console write failures (closed pipe, detached terminal) are ignored;
    /// there is nowhere left to report them.
    pub fn println(&mut self, line: impl AsRef<str>) {
        if !self.quiet {
            let _ = writeln!(self.out, "{}", line.as_ref());
        }
    }

    pub fn println_colored(&mut self, line: impl AsRef<str>, tone: Tone) {
        if !self.quiet {
            let text = self.colorize(line.as_ref(), tone);
            let _ = writeln!(self.out, "{}", text);
        }
    }

    /// Write a line even in quiet mode
    pub fn error(&mut self, line: impl AsRef<str>) {
        let text = self.colorize(line.as_ref(), Tone::Red);
        let _ = writeln!(self.out, "{}", text);
    }

    /// Write unstyled text even in quiet mode, for machine-readable reports
    pub fn emit(&mut self, text: impl AsRef<str>) {
        let _ = writeln!(self.out, "{}", text.as_ref());
        let _ = self.out.flush();
    }

    /// Write a prompt without a trailing newline and flush it
    pub fn prompt(&mut self, text: &str) {
        let _ = write!(self.out, "{} ", text);
        let _ = self.out.flush();
    }

    /// Print the usage text, at most once per console
    pub fn usage(&mut self) {
        if !self.usage_printed {
            let _ = writeln!(self.out, "{}", USAGE);
            self.usage_printed = true;
        }
    }

    pub fn usage_printed(&self) -> bool {
        self.usage_printed
    }

    /// Remember the current cursor position
    pub fn set_checkpoint(&mut self) {
        if self.checkpoints {
            let _ = queue!(self.out, SavePosition);
            let _ = self.out.flush();
        }
    }

    /// Return to the checkpoint and erase everything written since
    pub fn reset_to_checkpoint(&mut self) {
        if self.checkpoints {
            let _ = queue!(self.out, RestorePosition, Clear(ClearType::FromCursorDown));
            let _ = self.out.flush();
        }
    }

    pub fn flush(&mut self) {
        let _ = self.out.flush();
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
