//! Registry configuration

use std::time::Duration;

use crate::media::cache::{DEFAULT_MAX_BYTES, DEFAULT_MAX_PACKETS};

/// Configuration for the stream registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// How often the liveness sweep runs
    pub sweep_interval: Duration,

    /// Maximum bytes in each stream's GOP cache
    pub cache_max_bytes: usize,

    /// Maximum packets in each stream's GOP cache
    pub cache_max_packets: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(5),
            cache_max_bytes: DEFAULT_MAX_BYTES,
            cache_max_packets: DEFAULT_MAX_PACKETS,
        }
    }
}

impl RegistryConfig {
    /// Set the sweep interval
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set the GOP cache byte bound
    pub fn cache_max_bytes(mut self, bytes: usize) -> Self {
        self.cache_max_bytes = bytes;
        self
    }

    /// Set the GOP cache packet bound
    pub fn cache_max_packets(mut self, packets: usize) -> Self {
        self.cache_max_packets = packets;
        self
    }
}
