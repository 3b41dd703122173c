//! Error types
//!
//! Failures that stay inside the relay (source reads, sink writes, liveness
//! timeouts) and the registry errors surfaced to callers.

use crate::registry::RegistryError;
use crate::session::CloseReason;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for relay operations
#[derive(Debug, Clone)]
pub enum Error {
    /// Publisher disconnected or delivered garbage; ends the stream generation
    SourceRead(String),
    /// Subscriber disconnected or too slow; ends that one sink
    SinkWrite(String),
    /// No activity within the liveness window
    LivenessTimeout,
    /// The handle was closed by the relay
    Closed(CloseReason),
    /// Registry lookup or attach failure
    Registry(RegistryError),
}

impl Error {
    /// Map a close reason to the error a pending read/write observes
    pub fn from_close(reason: CloseReason) -> Self {
        match reason {
            CloseReason::ReadTimeout | CloseReason::WriteTimeout => Error::LivenessTimeout,
            other => Error::Closed(other),
        }
    }

    /// Whether this error means the relay closed the handle on purpose
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::Closed(_) | Error::LivenessTimeout)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::SourceRead(msg) => write!(f, "Source read failed: {}", msg),
            Error::SinkWrite(msg) => write!(f, "Sink write failed: {}", msg),
            Error::LivenessTimeout => write!(f, "Liveness timeout"),
            Error::Closed(reason) => write!(f, "Closed: {}", reason),
            Error::Registry(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Registry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Registry(e)
    }
}
