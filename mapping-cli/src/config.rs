//! YAML configuration for render defaults.
//!
//! ```yaml
//! escape: false
//! silent: true
//! max_foreach_iterations: 1000
//! ```
//!
//! Precedence: built-in defaults < config file < command-line flags.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mapping_renderer::RenderOptions;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub escape: Option<bool>,
    pub silent: Option<bool>,
    pub max_foreach_iterations: Option<usize>,
}

impl Config {
    /// `<config dir>/mapping-template/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mapping-template").join("config.yaml"))
    }

    /// Load `explicit` if given (it must exist), otherwise the default file
    /// when present.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load_from(&path),
            _ => Ok(Config::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        if text.trim().is_empty() {
            return Ok(Config::default());
        }
        let config = serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Overlay the values set in this file onto `options`.
    pub fn apply(&self, options: &mut RenderOptions) {
        if let Some(escape) = self.escape {
            options.escape = escape;
        }
        if let Some(silent) = self.silent {
            options.silent = silent;
        }
        if let Some(limit) = self.max_foreach_iterations {
            options.max_foreach_iterations = limit;
        }
    }
}
