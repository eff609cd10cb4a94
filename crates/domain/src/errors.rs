//! Error types used throughout the workspace

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Keyward
///
/// None of these are fatal: the store handle converts each of them into a
/// logged warning and carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum KeywardError {
    /// A single remote call failed
    #[error("Remote store error: {message}")]
    Remote { message: String },

    /// A remote call kept failing until the retry budget ran out
    #[error("Remote call failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// A setting name outside the closed set was used
    #[error("Unknown setting: {name}")]
    UnknownSetting { name: String },

    /// A write was blocked by the environment gate
    #[error("Write to store '{store}' blocked in non-production environment")]
    WriteGated { store: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KeywardError {
    /// Build a remote failure from anything displayable
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote { message: message.into() }
    }

    /// Build an unknown-setting error for `name`
    pub fn unknown_setting(name: impl Into<String>) -> Self {
        Self::UnknownSetting { name: name.into() }
    }

    /// Stable label suitable for structured log fields
    pub fn label(&self) -> &'static str {
        match self {
            Self::Remote { .. } => "remote",
            Self::RetriesExhausted { .. } => "retries_exhausted",
            Self::UnknownSetting { .. } => "unknown_setting",
            Self::WriteGated { .. } => "write_gated",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias for Keyward operations
pub type Result<T> = std::result::Result<T, KeywardError>;
