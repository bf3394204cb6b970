//! Editor Configuration
//!
//! Configuration options for an edit session and the `permctl` front end.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::EditorResult;

/// Configuration for an EditSession
///
/// Use the builder pattern to configure the editor:
///
/// ```ignore
/// let config = EditorConfig::new()
///     .with_save_timeout(5_000)
///     .with_confirm_before_save(false)
///     .with_propagate_collection_edits(true);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// How long a save may wait for the store before it counts as rejected
    #[serde(default = "default_save_timeout_ms")]
    pub save_timeout_ms: u64,

    /// Ask "Save permissions?" before persisting
    #[serde(default = "default_true")]
    pub confirm_before_save: bool,

    /// Ask before an edit leaves a database with limited access
    #[serde(default = "default_true")]
    pub confirm_limited_access: bool,

    /// Ask before granting native query editing
    #[serde(default = "default_true")]
    pub confirm_native_grants: bool,

    /// Default for the "also change sub-collections" toggle
    #[serde(default)]
    pub propagate_collection_edits: bool,

    /// Directory for rolling log files (stderr only when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

fn default_save_timeout_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

impl EditorConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self {
            save_timeout_ms: default_save_timeout_ms(),
            confirm_before_save: true,
            confirm_limited_access: true,
            confirm_native_grants: true,
            propagate_collection_edits: false,
            log_dir: None,
        }
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> EditorResult<Self> {
        let file = File::open(path.as_ref())?;
        let config = serde_json::from_reader(BufReader::new(file))?;
        Ok(config)
    }

    /// Set the save timeout in milliseconds
    pub fn with_save_timeout(mut self, timeout_ms: u64) -> Self {
        self.save_timeout_ms = timeout_ms;
        self
    }

    pub fn with_confirm_before_save(mut self, enabled: bool) -> Self {
        self.confirm_before_save = enabled;
        self
    }

    pub fn with_confirm_limited_access(mut self, enabled: bool) -> Self {
        self.confirm_limited_access = enabled;
        self
    }

    pub fn with_confirm_native_grants(mut self, enabled: bool) -> Self {
        self.confirm_native_grants = enabled;
        self
    }

    pub fn with_propagate_collection_edits(mut self, enabled: bool) -> Self {
        self.propagate_collection_edits = enabled;
        self
    }

    /// Write logs to a rolling file in `dir`
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Get save timeout as Duration
    pub fn save_timeout(&self) -> Duration {
        Duration::from_millis(self.save_timeout_ms)
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self::new()
    }
}
