//! Liveness and timestamp bookkeeping shared by session adapters

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

use crate::media::{Packet, PacketKind};

/// Tracks activity and the timestamp base of one handle
///
/// Activity is stored as milliseconds since creation so it can live in an
/// atomic. Timestamps are the ones emitted to the peer, i.e. already re-based.
#[derive(Debug)]
pub struct SessionClock {
    created_at: Instant,
    timeout: Duration,
    last_activity_ms: AtomicU64,
    base_timestamp: AtomicU32,
    last_video_ts: AtomicU32,
    last_audio_ts: AtomicU32,
}

impl SessionClock {
    /// Create a clock that considers the handle dead after `timeout` of silence
    pub fn new(timeout: Duration) -> Self {
        Self {
            created_at: Instant::now(),
            timeout,
            last_activity_ms: AtomicU64::new(0),
            base_timestamp: AtomicU32::new(0),
            last_video_ts: AtomicU32::new(0),
            last_audio_ts: AtomicU32::new(0),
        }
    }

    /// Record activity now
    pub fn touch(&self) {
        let elapsed = self.created_at.elapsed().as_millis() as u64;
        self.last_activity_ms.store(elapsed, Ordering::Relaxed);
    }

    /// Time since the last recorded activity
    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_activity_ms.load(Ordering::Relaxed));
        self.created_at.elapsed().saturating_sub(last)
    }

    /// Whether activity was seen within the timeout
    pub fn is_alive(&self) -> bool {
        self.idle_for() < self.timeout
    }

    /// Current timestamp base added to outgoing packets
    pub fn base_timestamp(&self) -> u32 {
        self.base_timestamp.load(Ordering::Relaxed)
    }

    /// Shift a packet onto this handle's timeline and remember its timestamp
    pub fn rebase(&self, mut packet: Packet) -> Packet {
        packet.timestamp = packet.timestamp.wrapping_add(self.base_timestamp());
        match packet.kind {
            PacketKind::Video => self.last_video_ts.store(packet.timestamp, Ordering::Relaxed),
            PacketKind::Audio => self.last_audio_ts.store(packet.timestamp, Ordering::Relaxed),
            PacketKind::Metadata => {}
        }
        packet
    }

    /// Continue from the latest emitted audio or video timestamp
    pub fn recalibrate(&self) {
        let video = self.last_video_ts.load(Ordering::Relaxed);
        let audio = self.last_audio_ts.load(Ordering::Relaxed);
        self.base_timestamp.store(video.max(audio), Ordering::Relaxed);
    }
}
