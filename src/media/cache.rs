//! Packet cache for late-joiner support
//!
//! When a subscriber attaches to a running stream it needs:
//! 1. The metadata and sequence headers (SPS/PPS, AudioSpecificConfig)
//! 2. The most recent video keyframe
//! 3. Every audio/video packet since that keyframe
//!
//! This lets the decoder start from the keyframe instead of waiting for the
//! next one. The cache keeps exactly one GOP; a new keyframe replaces it.

use std::collections::VecDeque;

use crate::error::Result;
use crate::session::PacketSink;

use super::packet::Packet;

/// Default maximum GOP window size in bytes (4MB)
pub const DEFAULT_MAX_BYTES: usize = 4 * 1024 * 1024;

/// Default maximum number of packets in the GOP window
pub const DEFAULT_MAX_PACKETS: usize = 1024;

/// Bounded replay window for one stream
#[derive(Debug)]
pub struct PacketCache {
    max_bytes: usize,
    max_packets: usize,
    metadata: Option<Packet>,
    video_header: Option<Packet>,
    audio_header: Option<Packet>,
    /// Packets since the last keyframe, keyframe first
    gop: VecDeque<Packet>,
    gop_bytes: usize,
    /// Set once a keyframe opened the current window
    gop_started: bool,
}

impl PacketCache {
    /// Create a cache with the default bounds
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_BYTES, DEFAULT_MAX_PACKETS)
    }

    /// Create a cache bounded by bytes and packet count
    pub fn with_limits(max_bytes: usize, max_packets: usize) -> Self {
        Self {
            max_bytes,
            max_packets,
            metadata: None,
            video_header: None,
            audio_header: None,
            gop: VecDeque::new(),
            gop_bytes: 0,
            gop_started: false,
        }
    }

    /// Record a packet that is about to be distributed
    ///
    /// Returns whether the packet is now part of the replay window.
    pub fn write(&mut self, packet: &Packet) -> bool {
        if packet.is_metadata() {
            self.metadata = Some(packet.clone());
            return true;
        }

        if packet.is_sequence_header() {
            if packet.is_video() {
                self.video_header = Some(packet.clone());
            } else {
                self.audio_header = Some(packet.clone());
            }
            return true;
        }

        if packet.is_keyframe() {
            self.clear_gop();
            self.gop_started = true;
        }

        if !self.gop_started {
            return false;
        }

        let size = packet.size();
        if self.gop.len() + 1 > self.max_packets || self.gop_bytes + size > self.max_bytes {
            // A GOP without its head is useless to a decoder; wait for the next keyframe
            tracing::debug!(
                packets = self.gop.len(),
                bytes = self.gop_bytes,
                "GOP window overflow, dropping until next keyframe"
            );
            self.clear_gop();
            return false;
        }

        self.gop.push_back(packet.clone());
        self.gop_bytes += size;
        true
    }

    /// Replay the cached window to a sink, in order
    ///
    /// Stops at the first failed write and returns that error; the failure
    /// belongs to the sink.
    pub async fn send(&self, sink: &dyn PacketSink) -> Result<()> {
        for packet in self.catchup() {
            sink.write(packet.clone()).await?;
        }
        Ok(())
    }

    /// Iterate the replay order: metadata, video header, audio header, GOP
    pub fn catchup(&self) -> impl Iterator<Item = &Packet> {
        self.metadata
            .iter()
            .chain(self.video_header.iter())
            .chain(self.audio_header.iter())
            .chain(self.gop.iter())
    }

    /// Drop the GOP window but keep headers and metadata
    pub fn clear_gop(&mut self) {
        self.gop.clear();
        self.gop_bytes = 0;
        self.gop_started = false;
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.clear_gop();
        self.metadata = None;
        self.video_header = None;
        self.audio_header = None;
    }

    /// Whether a keyframe-led GOP is buffered
    pub fn has_gop(&self) -> bool {
        self.gop_started && !self.gop.is_empty()
    }

    /// Total number of packets a late joiner would receive
    pub fn packet_count(&self) -> usize {
        self.catchup().count()
    }

    /// Size of the GOP window in bytes
    pub fn size(&self) -> usize {
        self.gop_bytes
    }

    /// Timestamp range of the GOP window
    pub fn timestamp_range(&self) -> Option<(u32, u32)> {
        let first = self.gop.front()?.timestamp;
        let last = self.gop.back()?.timestamp;
        Some((first, last))
    }
}

impl Default for PacketCache {
    fn default() -> Self {
        Self::new()
    }
}
