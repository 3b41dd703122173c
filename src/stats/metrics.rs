//! Per-stream counters

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::media::Packet;

/// Counters updated by a stream's distribution loop
#[derive(Debug, Default)]
pub struct StreamMetrics {
    packets_in: AtomicU64,
    bytes_in: AtomicU64,
    packets_out: AtomicU64,
    sinks_evicted: AtomicU64,
}

impl StreamMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a packet read from the publisher
    pub fn record_in(&self, packet: &Packet) {
        self.packets_in.fetch_add(1, Ordering::Relaxed);
        self.bytes_in
            .fetch_add(packet.size() as u64, Ordering::Relaxed);
    }

    /// Count packets delivered to a sink
    pub fn record_out(&self, packets: u64) {
        self.packets_out.fetch_add(packets, Ordering::Relaxed);
    }

    /// Count a sink removed after a failed write or timeout
    pub fn record_eviction(&self) {
        self.sinks_evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn packets_in(&self) -> u64 {
        self.packets_in.load(Ordering::Relaxed)
    }

    pub fn bytes_in(&self) -> u64 {
        self.bytes_in.load(Ordering::Relaxed)
    }

    pub fn packets_out(&self) -> u64 {
        self.packets_out.load(Ordering::Relaxed)
    }

    pub fn sinks_evicted(&self) -> u64 {
        self.sinks_evicted.load(Ordering::Relaxed)
    }
}

/// Point-in-time statistics for a stream
#[derive(Debug, Clone)]
pub struct StreamStats {
    /// Stream key
    pub stream_key: String,
    /// Whether a publisher is running
    pub running: bool,
    /// Number of attached subscribers
    pub subscriber_count: usize,
    /// Packets read from publishers of this stream instance
    pub packets_in: u64,
    /// Bytes read from publishers of this stream instance
    pub bytes_in: u64,
    /// Packets written to subscribers, cache replays included
    pub packets_out: u64,
    /// Subscribers removed after a failed write or timeout
    pub sinks_evicted: u64,
    /// Packets a late joiner would be replayed
    pub cached_packets: usize,
    /// Time since the stream instance was created
    pub age: Duration,
}

impl StreamStats {
    /// Inbound bitrate in bits per second over the stream's lifetime
    pub fn bitrate(&self) -> u64 {
        let secs = self.age.as_secs();
        if secs > 0 {
            (self.bytes_in * 8) / secs
        } else {
            0
        }
    }
}
