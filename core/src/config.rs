//! Session configuration
//!
//! Durations are written in human form (`"500ms"`, `"1s"`) when the
//! configuration is serialized.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default coalescing window for outgoing local edits
pub const DEFAULT_COALESCE_WINDOW: Duration = Duration::from_millis(500);

/// Per-session reconciliation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Local modifications inside this window collapse into one outgoing Edit
    #[serde(with = "humantime_serde")]
    pub coalesce_window: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            coalesce_window: DEFAULT_COALESCE_WINDOW,
        }
    }
}

impl SessionConfig {
    /// Create a config with the given coalescing window
    pub fn with_coalesce_window(window: Duration) -> Self {
        Self {
            coalesce_window: window,
        }
    }

    /// Parse a JSON configuration document
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
