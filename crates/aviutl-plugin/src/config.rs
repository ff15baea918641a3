//! Per-plugin settings file.
//!
//! `<name>.json` is looked up in the host's `plugins` directory first, then
//! next to `aviutl.exe`. A missing file means defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PluginResult;

/// Environment variable that overrides [`PluginConfig::log_level`].
pub const LOG_ENV: &str = "AVIUTL_PLUGIN_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// `EnvFilter` directive, e.g. `info` or `aviutl_plugin=debug`.
    pub log_level: String,
    /// Log file, relative paths resolve against the config file's directory.
    pub log_file: Option<PathBuf>,
    pub log_to_stderr: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
            log_to_stderr: false,
        }
    }
}

impl PluginConfig {
    /// Parse one config file.
    pub fn from_file(path: &Path) -> PluginResult<Self> {
        let text = fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&text)?;
        if let (Some(file), Some(dir)) = (&config.log_file, path.parent()) {
            if file.is_relative() {
                config.log_file = Some(dir.join(file));
            }
        }
        Ok(config)
    }

    /// Candidate files for plugin `name` under host directory `dir`, in
    /// lookup order.
    pub fn search_paths(dir: &Path, name: &str) -> [PathBuf; 2] {
        let file = format!("{name}.json");
        [dir.join("plugins").join(&file), dir.join(file)]
    }

    /// First existing candidate under `dir`, or defaults.
    pub fn load_from_dir(dir: &Path, name: &str) -> PluginResult<Self> {
        for path in Self::search_paths(dir, name) {
            if path.is_file() {
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load for plugin `name` from the running host's directory and apply
    /// [`LOG_ENV`].
    pub fn load(name: &str) -> PluginResult<Self> {
        let exe = std::env::current_exe()?;
        let config = match exe.parent() {
            Some(dir) => Self::load_from_dir(dir, name)?,
            None => Self::default(),
        };
        Ok(config.with_level_override(std::env::var(LOG_ENV).ok()))
    }

    /// Replace the level with a non-empty override.
    pub fn with_level_override(mut self, level: Option<String>) -> Self {
        if let Some(level) = level.filter(|l| !l.trim().is_empty()) {
            self.log_level = level;
        }
        self
    }
}
