//! Media packets
//!
//! A packet is one FLV tag body plus its timestamp. Payloads are `Bytes`, so
//! fanning a packet out to many subscribers only bumps a reference count.
//!
//! Codec header layout used for classification:
//! ```text
//! Video: | FrameType(4) | CodecID(4) | PacketType(8) | ...
//! Audio: | SoundFormat(4) | Rate(2) | Size(1) | Type(1) | PacketType(8) | ...
//! ```

use bytes::Bytes;

/// Packet type discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Audio,
    Video,
    /// Script data (onMetaData)
    Metadata,
}

/// Video frame type (upper 4 bits of first byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoFrameType {
    /// Keyframe (for AVC, a seekable frame)
    Keyframe = 1,
    /// Inter frame (for AVC, a non-seekable frame)
    InterFrame = 2,
    /// Disposable inter frame (H.263 only)
    DisposableInterFrame = 3,
    /// Generated keyframe (reserved for server use)
    GeneratedKeyframe = 4,
    /// Video info/command frame
    VideoInfoFrame = 5,
}

impl VideoFrameType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match (b >> 4) & 0x0F {
            1 => Some(VideoFrameType::Keyframe),
            2 => Some(VideoFrameType::InterFrame),
            3 => Some(VideoFrameType::DisposableInterFrame),
            4 => Some(VideoFrameType::GeneratedKeyframe),
            5 => Some(VideoFrameType::VideoInfoFrame),
            _ => None,
        }
    }

    pub fn is_keyframe(&self) -> bool {
        matches!(
            self,
            VideoFrameType::Keyframe | VideoFrameType::GeneratedKeyframe
        )
    }
}

const CODEC_AVC: u8 = 7;
const CODEC_HEVC: u8 = 12;
const SOUND_FORMAT_AAC: u8 = 10;

/// A media packet as read from a publisher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Packet type
    pub kind: PacketKind,
    /// Timestamp in milliseconds
    pub timestamp: u32,
    /// Tag body (zero-copy via reference counting)
    pub data: Bytes,
}

impl Packet {
    /// Create a video packet
    pub fn video(timestamp: u32, data: impl Into<Bytes>) -> Self {
        Self {
            kind: PacketKind::Video,
            timestamp,
            data: data.into(),
        }
    }

    /// Create an audio packet
    pub fn audio(timestamp: u32, data: impl Into<Bytes>) -> Self {
        Self {
            kind: PacketKind::Audio,
            timestamp,
            data: data.into(),
        }
    }

    /// Create a metadata packet
    pub fn metadata(data: impl Into<Bytes>) -> Self {
        Self {
            kind: PacketKind::Metadata,
            timestamp: 0,
            data: data.into(),
        }
    }

    pub fn is_video(&self) -> bool {
        self.kind == PacketKind::Video
    }

    pub fn is_audio(&self) -> bool {
        self.kind == PacketKind::Audio
    }

    pub fn is_metadata(&self) -> bool {
        self.kind == PacketKind::Metadata
    }

    /// For video packets, the frame type
    pub fn video_frame_type(&self) -> Option<VideoFrameType> {
        match self.data.first() {
            Some(&b) if self.is_video() => VideoFrameType::from_byte(b),
            _ => None,
        }
    }

    /// Check if this is a video keyframe
    pub fn is_keyframe(&self) -> bool {
        self.video_frame_type()
            .map(|ft| ft.is_keyframe())
            .unwrap_or(false)
    }

    /// Check if this is a decoder configuration record
    ///
    /// AVC/HEVC sequence headers for video, AudioSpecificConfig for AAC.
    pub fn is_sequence_header(&self) -> bool {
        if self.data.len() < 2 || self.data[1] != 0 {
            return false;
        }
        match self.kind {
            PacketKind::Video => matches!(self.data[0] & 0x0F, CODEC_AVC | CODEC_HEVC),
            PacketKind::Audio => (self.data[0] >> 4) & 0x0F == SOUND_FORMAT_AAC,
            PacketKind::Metadata => false,
        }
    }

    /// Size of the payload in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}
