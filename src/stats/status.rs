//! Operational status listing
//!
//! A flat view of who publishes and who plays each stream, suitable for a
//! JSON status endpoint.

use serde::{Deserialize, Serialize};

/// One (stream key, handle id) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub key: String,
    pub id: String,
}

impl StatusEntry {
    pub fn new(key: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            id: id.into(),
        }
    }
}

/// Publishers and players across all streams
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub publishers: Vec<StatusEntry>,
    pub players: Vec<StatusEntry>,
}

impl StatusReport {
    /// Render as JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
