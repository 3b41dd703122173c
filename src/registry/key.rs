//! Stream keys

/// Unique identifier for a stream, conventionally `app/name`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamKey(String);

impl StreamKey {
    /// Build a key from an application name and a stream name
    pub fn new(app: impl AsRef<str>, name: impl AsRef<str>) -> Self {
        Self(format!("{}/{}", app.as_ref(), name.as_ref()))
    }

    /// The key as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl From<String> for StreamKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}
