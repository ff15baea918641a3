//! Plugin SDK errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("host callback `{0}` is not available")]
    MissingCallback(&'static str),
    #[error("host rejected `{0}`")]
    HostRejected(&'static str),
    #[error("no edit handle for `{0}`")]
    NoEditHandle(&'static str),
    #[error("text encoding error: {0}")]
    Encoding(String),
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("plugin `{0}` is not registered")]
    NotRegistered(&'static str),
    #[error("plugin state is busy (re-entrant call into `{0}`)")]
    Reentrant(&'static str),
    #[error("{what} out of bounds: {value} not in {min}..={max}")]
    OutOfBounds {
        what: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    #[error("extended data is {actual} bytes, {expected} requested")]
    ExDataSize { expected: usize, actual: usize },
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("plugin error: {0}")]
    Plugin(String),
    #[error("worker panicked in `{0}`")]
    WorkerPanicked(&'static str),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PluginError {
    /// Free-form error raised by plugin code.
    pub fn plugin(msg: impl Into<String>) -> Self {
        Self::Plugin(msg.into())
    }

    pub(crate) fn out_of_bounds(what: &'static str, value: impl Into<i64>, min: impl Into<i64>, max: impl Into<i64>) -> Self {
        Self::OutOfBounds {
            what,
            value: value.into(),
            min: min.into(),
            max: max.into(),
        }
    }
}

impl From<serde_json::Error> for PluginError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type alias for plugin operations.
pub type PluginResult<T> = std::result::Result<T, PluginError>;
