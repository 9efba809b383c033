//! Error types for cfgmgr operations.
//!
//! This module defines the error types shared by the cfgmgr crates.
//! All errors implement `std::error::Error` via `thiserror`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cfgmgr operations.
pub type CfgMgrResult<T> = Result<T, CfgMgrError>;

/// Errors that can occur during cfgmgr operations.
#[derive(Debug, Error)]
pub enum CfgMgrError {
    /// Failed to execute a shell command (spawn error).
    #[error("Failed to execute shell command '{command}': {source}")]
    ShellExec {
        /// The command that failed to execute.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Shell command returned non-zero exit code.
    #[error("Shell command failed: '{command}' (exit code {exit_code}): {output}")]
    ShellCommandFailed {
        /// The command that failed.
        command: String,
        /// The exit code.
        exit_code: i32,
        /// Combined stdout/stderr output.
        output: String,
    },

    /// Command output could not be decoded.
    #[error("Unexpected output from '{command}': {message}")]
    UnexpectedOutput {
        /// The command whose output was rejected.
        command: String,
        /// Decoder message.
        message: String,
    },

    /// Configuration tree could not be read or parsed.
    #[error("Failed to load configuration tree {}: {message}", path.display())]
    TreeLoad {
        /// Source of the tree.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// Verification rejected the commit; nothing was applied.
    #[error("{daemon}: commit aborted, {} violation(s): {}", violations.len(), violations.join("; "))]
    VerifyFailed {
        /// Daemon that rejected the configuration.
        daemon: String,
        /// Human-readable violations, in reporting order.
        violations: Vec<String>,
    },

    /// Internal error (unexpected state).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl CfgMgrError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an unexpected output error.
    pub fn unexpected_output(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnexpectedOutput {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the violations if this error is a rejected commit.
    pub fn violations(&self) -> Option<&[String]> {
        match self {
            CfgMgrError::VerifyFailed { violations, .. } => Some(violations.as_slice()),
            _ => None,
        }
    }
}
