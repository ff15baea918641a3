//! `tracing` subscriber setup for plugin DLLs.
//!
//! Several plugins built on this crate can share one host process, and the
//! global subscriber can only be set once, so installation is best effort.

use std::fs::{self, OpenOptions};
use std::sync::{Mutex, Once};

use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::config::PluginConfig;
use crate::error::PluginResult;

fn env_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a fmt subscriber per `config`.
///
/// Returns `Ok(false)` when there is nowhere to log or a global subscriber
/// already exists.
pub fn init_logging(config: &PluginConfig) -> PluginResult<bool> {
    let filter = env_filter(&config.log_level);
    let installed = if let Some(path) = &config.log_file {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
            .is_ok()
    } else if config.log_to_stderr {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok()
    } else {
        false
    };
    Ok(installed)
}

/// Load the config for plugin `name` and install logging. Runs once per
/// process; later calls return immediately.
pub fn init_plugin(name: &str) {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let (config, load_error) = match PluginConfig::load(name) {
            Ok(config) => (config, None),
            Err(e) => (PluginConfig::default(), Some(e)),
        };
        let installed = match init_logging(&config) {
            Ok(installed) => installed,
            Err(e) => {
                // Log file unusable; use stderr.
                let fallback = PluginConfig {
                    log_file: None,
                    log_to_stderr: true,
                    ..config.clone()
                };
                let installed = init_logging(&fallback).unwrap_or(false);
                warn!(error = %e, "could not open plugin log file");
                installed
            }
        };
        if let Some(e) = load_error {
            warn!(plugin = name, error = %e, "plugin config ignored");
        }
        debug!(plugin = name, level = %config.log_level, installed, "plugin initialised");
    });
}
