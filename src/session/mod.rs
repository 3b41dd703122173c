//! Publisher and subscriber handles
//!
//! The relay never touches sockets. A transport front end wraps each
//! connection in a [`PacketSource`] (publisher) or [`PacketSink`] (subscriber)
//! and hands it to the [`StreamRegistry`](crate::registry::StreamRegistry).
//!
//! [`ChannelSource`] and [`ChannelSink`] are ready-made implementations backed
//! by tokio channels, so a transport only has to pump packets.

pub mod channel;
pub mod clock;
pub mod config;

pub use channel::{ChannelSink, ChannelSource, SinkReceiver, SourceFeeder};
pub use clock::SessionClock;
pub use config::SessionConfig;

use async_trait::async_trait;

use crate::error::Result;
use crate::media::Packet;
use crate::registry::StreamKey;

/// Why a handle was closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// A newer publisher took over the stream key
    Superseded,
    /// Publisher produced nothing within the liveness window
    ReadTimeout,
    /// Subscriber stopped accepting packets within the liveness window
    WriteTimeout,
    /// The publisher this interval subscriber was pulling from ended
    PublisherEnded,
    /// The connection task failed
    Error(String),
    /// The connection task panicked
    InternalFault,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::Superseded => write!(f, "superseded by new publisher"),
            CloseReason::ReadTimeout => write!(f, "read timeout"),
            CloseReason::WriteTimeout => write!(f, "write timeout"),
            CloseReason::PublisherEnded => write!(f, "publisher ended"),
            CloseReason::Error(msg) => write!(f, "error: {}", msg),
            CloseReason::InternalFault => write!(f, "internal fault"),
        }
    }
}

/// Identity of a publisher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    /// Publisher identity; a re-publish with the same UID reuses the stream
    pub uid: String,
    /// Stream key being published
    pub key: StreamKey,
}

impl SourceInfo {
    pub fn new(uid: impl Into<String>, key: impl Into<StreamKey>) -> Self {
        Self {
            uid: uid.into(),
            key: key.into(),
        }
    }
}

/// Identity of a subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkInfo {
    /// Subscriber identity, unique within a stream
    pub uid: String,
    /// Stream key being played
    pub key: StreamKey,
    /// Pull-style consumer that ends when the publisher ends
    pub interval: bool,
}

impl SinkInfo {
    /// Long-lived (push) subscriber
    pub fn new(uid: impl Into<String>, key: impl Into<StreamKey>) -> Self {
        Self {
            uid: uid.into(),
            key: key.into(),
            interval: false,
        }
    }

    /// Interval (pull) subscriber
    pub fn interval(uid: impl Into<String>, key: impl Into<StreamKey>) -> Self {
        Self {
            interval: true,
            ..Self::new(uid, key)
        }
    }
}

/// Publisher capability consumed by a stream's distribution loop
#[async_trait]
pub trait PacketSource: Send + Sync {
    /// Publisher identity
    fn info(&self) -> SourceInfo;

    /// Wait for the next packet
    ///
    /// Fails at end of stream, on transport error, or once [`close`](Self::close)
    /// has been called.
    async fn read(&self) -> Result<Packet>;

    /// Whether the publisher is still producing
    fn is_alive(&self) -> bool;

    /// Close the publisher; idempotent
    fn close(&self, reason: CloseReason);
}

/// Subscriber capability fed by a stream's distribution loop
///
/// Implementations must bound the time a write can take and report a stall
/// as an error, since a blocked write delays every sink after it.
#[async_trait]
pub trait PacketSink: Send + Sync {
    /// Subscriber identity
    fn info(&self) -> SinkInfo;

    /// Deliver one packet
    async fn write(&self, packet: Packet) -> Result<()>;

    /// Whether the subscriber is still connected
    fn is_alive(&self) -> bool;

    /// Close the subscriber; idempotent
    fn close(&self, reason: CloseReason);

    /// Continue timestamps from the last delivered packet
    ///
    /// Called when the sink moves to a new publisher generation whose clock
    /// restarts.
    fn recalibrate_base_timestamp(&self);
}
