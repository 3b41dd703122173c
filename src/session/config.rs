//! Session adapter configuration

use std::time::Duration;

/// Configuration for channel-backed sources and sinks
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Packets buffered between the relay and the transport
    pub queue_capacity: usize,

    /// How long a sink write may wait for queue space before failing
    pub write_timeout: Duration,

    /// A source producing nothing for this long is considered dead
    pub liveness_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            write_timeout: Duration::from_secs(5),
            liveness_timeout: Duration::from_secs(5),
        }
    }
}

impl SessionConfig {
    /// Set queue capacity (at least 1)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Set write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set liveness timeout
    pub fn liveness_timeout(mut self, timeout: Duration) -> Self {
        self.liveness_timeout = timeout;
        self
    }
}
