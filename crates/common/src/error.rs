//! Error types shared across Power Hour crates.
//!
//! Whole-pipeline failures are errors. Per-item problems (a row that could
//! not be parsed, a source that could not be probed) are reported as
//! warnings by the crate that detects them and never reach this type unless
//! they leave nothing usable behind.

use std::path::PathBuf;

/// Top-level error type for Power Hour operations.
#[derive(Debug, thiserror::Error)]
pub enum PowerHourError {
    /// Unreadable or malformed manifest, missing columns, empty selection.
    #[error("Input error: {message}")]
    Input { message: String },

    /// A single source's metadata could not be read.
    #[error("Probe error for {path}: {message}")]
    Probe { path: PathBuf, message: String },

    /// Segment geometry violates an invariant that could not be clamped.
    #[error("Validation error at segment {index}: {message}")]
    Validation { index: usize, message: String },

    /// The external transcoder failed. `message` carries its stderr verbatim.
    #[error("Render error: {message}")]
    Render { message: String },

    /// The destination cannot be written.
    #[error("Output error at {path}: {message}")]
    Output { path: PathBuf, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error("Cancelled: {message}")]
    Cancelled { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using PowerHourError.
pub type PowerHourResult<T> = Result<T, PowerHourError>;

impl PowerHourError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input {
            message: msg.into(),
        }
    }

    pub fn probe(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Probe {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn validation(index: usize, msg: impl Into<String>) -> Self {
        Self::Validation {
            index,
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn output(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Output {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled {
            message: msg.into(),
        }
    }

    /// Process exit code the CLI should use for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Input { .. } | Self::Config { .. } => 2,
            Self::Validation { .. } => 3,
            Self::Output { .. } => 4,
            Self::Render { .. } | Self::Probe { .. } => 5,
            Self::Cancelled { .. } => 130,
            _ => 1,
        }
    }
}
