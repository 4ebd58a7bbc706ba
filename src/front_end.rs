use serde::{Deserialize, Serialize};

/// How the process talks to the user; fixed once selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    /// Paths came from the command line; no prompting
    Batch,
    /// Paths are typed at a line-oriented console prompt
    LineConsole,
    /// Paths are chosen with the native file picker
    NativeDialog,
}

impl InteractionMode {
    pub fn is_interactive(&self) -> bool {
        !matches!(self, InteractionMode::Batch)
    }
}

/// Chooses the [`InteractionMode`] for the process
pub struct FrontEndSelector;

impl FrontEndSelector {
    pub fn select(args_provided: bool, display_available: bool) -> InteractionMode {
        match (args_provided, display_available) {
            (true, _) => InteractionMode::Batch,
            (false, true) => InteractionMode::NativeDialog,
            (false, false) => InteractionMode::LineConsole,
        }
    }

    /// Check the real environment for a usable display.
    pub fn display_available() -> bool {
        Self::display_available_with(|key| std::env::var_os(key).map(|v| !v.is_empty()))
    }

    /// Display detection over an injectable environment lookup.
    ///
    /// Any failure or absence reads as "unavailable" so the text path is
    /// always the fallback.
    pub fn display_available_with<F>(env_has: F) -> bool
    where
        F: Fn(&str) -> Option<bool>,
    {
        if cfg!(any(target_os = "windows", target_os = "macos")) {
            return true;
        }

        ["WAYLAND_DISPLAY", "DISPLAY"]
            .iter()
            .any(|key| env_has(key).unwrap_or(false))
    }
}
