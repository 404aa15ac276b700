//! Structured error types.
//!
//! Absence is never an error in this crate: missing keys, missing files and
//! unparseable values all degrade quietly. Errors surface only where something
//! the caller asked to run (a lifecycle hook, a plugin attachment, an explicit
//! file parse) actually failed.

use crate::hooks::Lifecycle;
use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    HookFailed,
    PluginAttachFailed,
    ParseFailed,
    Io,
}

/// Structured error for configuration operations.
#[derive(Debug, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct ConfError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<Lifecycle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ConfError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            lifecycle: None,
            details: None,
        }
    }

    pub fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn hook_failed(lifecycle: Lifecycle, index: usize, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::HookFailed,
            format!("{} hook #{} failed: {}", lifecycle, index, err),
        )
        .with_lifecycle(lifecycle)
    }

    pub fn plugin_attach(plugin: &str, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::PluginAttachFailed,
            format!("Plugin {} failed to attach: {}", plugin, err),
        )
    }

    pub fn parse(path: &str, err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::ParseFailed, format!("Failed to parse {}", path))
            .with_details(err.to_string())
    }

    pub fn io(path: &str, err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::Io, format!("I/O error on {}", path)).with_details(err.to_string())
    }
}

/// Result type for configuration operations.
pub type ConfResult<T> = std::result::Result<T, ConfError>;
