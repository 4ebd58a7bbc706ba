//! Durable user preferences (last file-picker selection).
//!
//! Every failure here degrades silently: an unreadable store behaves as an
//! empty one and a store that cannot be written simply forgets.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConformanceError, Result};

const PREFERENCES_DIR: &str = ".xml-conformance";
const PREFERENCES_FILE: &str = "preferences.toml";

/// Key-value preferences used by the dialog front-end
#[cfg_attr(test, mockall::automock)]
pub trait PreferenceStore {
    fn last_selection(&self) -> Option<PathBuf>;
    fn set_last_selection(&mut self, path: &Path);
    fn save(&self) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_selection: Option<PathBuf>,
}

/// TOML-backed [`PreferenceStore`]
#[derive(Debug, Clone)]
pub struct PreferenceFile {
    /// `None` when no backing file could be established
    path: Option<PathBuf>,
    values: Preferences,
}

impl PreferenceFile {
    /// Default location: `<home>/.xml-conformance/preferences.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(PREFERENCES_DIR).join(PREFERENCES_FILE))
    }

    /// Open the store at `path` (or the default location), creating the
    /// file and its parent directory when missing.
    pub fn open(path: Option<PathBuf>) -> Self {
        let path = path.or_else(Self::default_path).and_then(|path| {
            match Self::ensure_exists(&path) {
                Ok(()) => Some(path),
                Err(e) => {
                    tracing::debug!("Preferences unavailable at {}: {}", path.display(), e);
                    None
                }
            }
        });

        let values = path
            .as_deref()
            .and_then(|path| match std::fs::read_to_string(path) {
                Ok(content) => toml::from_str(&content)
                    .map_err(|e| tracing::debug!("Ignoring malformed preferences: {}", e))
                    .ok(),
                Err(e) => {
                    tracing::debug!("Unable to read preferences: {}", e);
                    None
                }
            })
            .unwrap_or_default();

        Self { path, values }
    }

    /// A store that never touches the filesystem
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Preferences::default(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn ensure_exists(path: &Path) -> std::io::Result<()> {
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::File::create(path)?;
        Ok(())
    }
}

impl PreferenceStore for PreferenceFile {
    fn last_selection(&self) -> Option<PathBuf> {
        self.values.last_selection.clone()
    }

    fn set_last_selection(&mut self, path: &Path) {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        self.values.last_selection = Some(absolute);
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Err(ConformanceError::Preferences(
                "no preference file available".to_string(),
            ));
        };

        let content = toml::to_string(&self.values)
            .map_err(|e| ConformanceError::Preferences(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
