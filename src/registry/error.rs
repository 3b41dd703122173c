//! Registry error types
//!
//! Error types for stream registry operations.

use super::key::StreamKey;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Stream not found
    StreamNotFound(StreamKey),
    /// Stream already has a running publisher
    StreamAlreadyPublishing(StreamKey),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::StreamNotFound(key) => write!(f, "Stream not found: {}", key),
            RegistryError::StreamAlreadyPublishing(key) => {
                write!(f, "Stream already has a publisher: {}", key)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
