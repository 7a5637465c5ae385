//! Typed error hierarchy for console discovery.
//!
//! `ConsoleError` covers every failure the runner, parser and registry
//! builder can produce. Only `InvalidExecutable` is meant to reach the user;
//! the rest are absorbed by the discovery tiers and logged.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("Cake script is not valid: {path} ({reason})")]
    InvalidExecutable { path: PathBuf, reason: String },

    #[error("Failed to spawn cake script: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("Failed to open output file at {path}: {source}")]
    OutputFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create temporary file: {0}")]
    TempFile(#[source] std::io::Error),

    #[error("Cake script run was cancelled")]
    ProcessCancelled,

    #[error("Cake script exited with non-zero code {exit_code}")]
    NonZeroExit { exit_code: i32 },

    #[error("Malformed console output: {0}")]
    MalformedOutput(String),

    #[error("Console discovery produced no commands")]
    EmptyDiscovery,

    #[error("Interrupted while waiting for the cake script")]
    Interrupted,
}

impl ConsoleError {
    pub fn invalid_executable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ConsoleError::InvalidExecutable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for failures that discovery treats as "no usable output".
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ConsoleError::InvalidExecutable { .. })
    }
}

impl From<quick_xml::Error> for ConsoleError {
    fn from(err: quick_xml::Error) -> Self {
        ConsoleError::MalformedOutput(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for ConsoleError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        ConsoleError::MalformedOutput(err.to_string())
    }
}
