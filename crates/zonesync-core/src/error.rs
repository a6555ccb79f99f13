//! Error types for zonesync
//!
//! This module defines all error types used throughout the workspace.

use thiserror::Error;

/// Result type alias for zonesync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for zonesync
#[derive(Error, Debug)]
pub enum Error {
    /// A record name is not covered by any configured zone
    #[error("No zone matches record {record:?}")]
    NoMatchingZone {
        /// The record name that could not be routed
        record: String,
    },

    /// The next serial would not be greater than the stored one
    #[error("Serial regression: current serial {current} is not below proposed serial {proposed}")]
    SerialRegression {
        /// Serial currently stored in the zone
        current: u32,
        /// Serial the increment policy would have written
        proposed: u64,
    },

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Inventory-related errors
    #[error("Inventory error: {0}")]
    Inventory(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Zone file parse or render errors
    #[error("Zone file error: {0}")]
    ZoneFile(String),

    /// Record or zone not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a "no matching zone" error for a record name
    pub fn no_matching_zone(record: impl Into<String>) -> Self {
        Self::NoMatchingZone {
            record: record.into(),
        }
    }

    /// Create an inventory error
    pub fn inventory(msg: impl Into<String>) -> Self {
        Self::Inventory(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a zone file error
    pub fn zone_file(msg: impl Into<String>) -> Self {
        Self::ZoneFile(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a routing failure
    pub fn is_no_matching_zone(&self) -> bool {
        matches!(self, Self::NoMatchingZone { .. })
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
