//! Live media relay core
//!
//! One publisher pushes packets under a stream key; any number of
//! subscribers attach to the key and receive the same packets live, plus a
//! cached window (sequence headers and the current GOP) so they can start
//! rendering immediately.
//!
//! The crate owns the multiplexing engine only. Transport front ends wrap
//! their connections in [`PacketSource`](session::PacketSource) and
//! [`PacketSink`](session::PacketSink) handles and hand them to a
//! [`StreamRegistry`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rtmp_relay::session::{ChannelSink, ChannelSource, SessionConfig, SinkInfo, SourceInfo};
//! use rtmp_relay::{Packet, RegistryConfig, StreamRegistry};
//!
//! # async fn demo() -> rtmp_relay::Result<()> {
//! let registry = Arc::new(StreamRegistry::with_config(RegistryConfig::default()));
//! registry.start();
//!
//! let (source, feeder) = ChannelSource::new(SourceInfo::new("pub1", "live/cam"), SessionConfig::default());
//! registry.handle_publish(source).await?;
//!
//! let (sink, mut rx) = ChannelSink::new(SinkInfo::new("viewer1", "live/cam"), SessionConfig::default());
//! registry.handle_subscribe(sink).await;
//!
//! feeder.send(Packet::video(0, vec![0x17, 0x01, 0x00])).await?;
//! let packet = rx.recv().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod media;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_util;

pub use error::{Error, Result};
pub use media::{Packet, PacketCache, PacketKind};
pub use registry::{RegistryConfig, RegistryError, Stream, StreamKey, StreamRegistry};
pub use session::{CloseReason, PacketSink, PacketSource};
