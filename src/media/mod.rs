//! Media handling for the relay
//!
//! This module provides:
//! - Media packets with codec header classification
//! - Packet caching for late-joiner support

pub mod cache;
pub mod packet;

pub use cache::PacketCache;
pub use packet::{Packet, PacketKind, VideoFrameType};
