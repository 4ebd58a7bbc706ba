use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::PathBuf;

/// Flag that enables debug capture. Matched case-insensitively as a
/// substring of any argument, so `-debugSSL` and `--DebugSsl` both count.
pub const DEBUG_FLAG: &str = "-debugssl";

/// Report format printed after the summary line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain console lines only
    #[default]
    Human,
    /// Console lines followed by a JSON run report
    Json,
}

/// Validate XML files and folders against the schemas they reference
#[derive(Parser, Debug, Clone)]
#[command(name = "xml-conformance")]
#[command(version)]
#[command(
    about = "Validate XML files and folders against the schemas they reference",
    long_about = "Validate XML files and folders against the schemas they reference.\n\n\
                  With no paths, prompts for them (or opens a file picker when a display is available).\n\
                  Add -debugSSL anywhere to write a per-file debug log next to each validated file."
)]
pub struct Cli {
    /// Files and/or folders to validate
    pub paths: Vec<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (TOML or JSON)
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(long = "format", value_enum)]
    pub format: Option<OutputFormat>,

    /// Skip the check for a newer release
    #[arg(long = "no-version-check")]
    pub no_version_check: bool,

    /// Override the release version endpoint
    #[arg(long = "version-url", value_name = "URL")]
    pub version_url: Option<String>,

    /// Do not wait for Enter before exiting in interactive modes
    #[arg(long = "no-pause")]
    pub no_pause: bool,
}

impl Cli {
    /// Parse the process arguments. Returns the CLI and whether debug mode was requested.
    pub fn parse_args() -> (Self, bool) {
        let (args, debug) = split_debug_flag(std::env::args_os());
        (Self::parse_from(args), debug)
    }

    pub fn has_paths(&self) -> bool {
        !self.paths.is_empty()
    }
}

/// Remove every debug-flag token from `args`. The program name is kept as-is.
pub fn split_debug_flag<I>(args: I) -> (Vec<OsString>, bool)
where
    I: IntoIterator<Item = OsString>,
{
    let mut debug = false;
    let mut kept = Vec::new();

    for (index, arg) in args.into_iter().enumerate() {
        if index > 0 && arg.to_string_lossy().to_lowercase().contains(DEBUG_FLAG) {
            debug = true;
            continue;
        }
        kept.push(arg);
    }

    (kept, debug)
}
