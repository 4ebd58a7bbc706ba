//! Local/remote version comparison.
//!
//! The bundled version text is matched against a fixed pattern and compared
//! with whatever the release endpoint reports. The check is advisory: a
//! missing local version, a network failure or an unparsable response all
//! end in "not outdated" and never touch the run's outcome.

use std::cmp::Ordering;
use std::fmt;
use std::future::Future;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Version text bundled with the build.
pub const BUNDLED_VERSION_TEXT: &str = include_str!("../version.txt");

static VERSION_REGEX: OnceLock<Regex> = OnceLock::new();

fn version_regex() -> &'static Regex {
    VERSION_REGEX.get_or_init(|| {
        Regex::new(r"([1-9])\.([1-9][0-9]?)\.([1-9][0-9]{0,2})")
            .expect("Failed to compile version regex")
    })
}

/// A `major.minor.patch` triple ordered lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionTriple {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl VersionTriple {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Extract the first version-like substring from `text`.
    ///
    /// Returns `None` unless the pattern matches with all three groups.
    pub fn find_in(text: &str) -> Option<Self> {
        let caps = version_regex().captures(text)?;
        if caps.len() != 4 {
            return None;
        }

        let major = caps.get(1)?.as_str().parse().ok()?;
        let minor = caps.get(2)?.as_str().parse().ok()?;
        let patch = caps.get(3)?.as_str().parse().ok()?;
        Some(Self::new(major, minor, patch))
    }
}

impl Ord for VersionTriple {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl PartialOrd for VersionTriple {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Outcome of a version check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionCheck {
    pub local: Option<VersionTriple>,
    pub remote: Option<VersionTriple>,
    pub outdated: bool,
}

impl VersionCheck {
    /// Compare two already-extracted triples.
    pub fn compare(local: Option<VersionTriple>, remote: Option<VersionTriple>) -> Self {
        let outdated = match (local, remote) {
            (Some(local), Some(remote)) => remote > local,
            _ => false,
        };

        Self {
            local,
            remote,
            outdated,
        }
    }
}

/// Runs the advisory version comparison.
pub struct VersionGate;

impl VersionGate {
    /// Compare `local_text` against the text produced by `fetch`.
    ///
    /// `fetch` is only awaited when the local version parses. Its failure
    /// leaves `remote` empty.
    pub async fn check<F, Fut>(local_text: &str, fetch: F) -> VersionCheck
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let Some(local) = VersionTriple::find_in(local_text) else {
            tracing::debug!("No version found in bundled version text");
            return VersionCheck::default();
        };

        let remote = match fetch().await {
            Ok(body) => {
                let remote = VersionTriple::find_in(&body);
                if remote.is_none() {
                    tracing::debug!("Remote version response did not contain a version");
                }
                remote
            }
            Err(e) => {
                tracing::debug!("Remote version check failed: {}", e);
                None
            }
        };

        let check = VersionCheck::compare(Some(local), remote);
        tracing::debug!(
            local = %local,
            remote = ?remote.map(|r| r.to_string()),
            outdated = check.outdated,
            "Version check complete"
        );
        check
    }
}
