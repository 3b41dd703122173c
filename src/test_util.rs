//! Shared fixtures for unit tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::media::Packet;
use crate::session::{CloseReason, PacketSink, PacketSource, SinkInfo, SinkReceiver, SourceInfo};

/// AVC video frame, keyframe or inter frame
pub fn frame(timestamp: u32, is_keyframe: bool) -> Packet {
    let head = if is_keyframe { 0x17 } else { 0x27 };
    Packet::video(timestamp, Bytes::from(vec![head, 0x01, 0x00, 0x00, 0x00]))
}

pub fn keyframe(timestamp: u32) -> Packet {
    frame(timestamp, true)
}

/// Receive `n` packets and return their timestamps
pub async fn next_timestamps(rx: &mut SinkReceiver, n: usize) -> Vec<u32> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let packet = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for packet")
            .expect("sink closed");
        out.push(packet.timestamp);
    }
    out
}

/// Sink whose writes always fail
pub struct FailingSink {
    info: SinkInfo,
    attempts: AtomicUsize,
    closed: AtomicBool,
}

impl FailingSink {
    pub fn new(uid: &str, key: &str) -> Arc<Self> {
        Arc::new(Self {
            info: SinkInfo::new(uid, key),
            attempts: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PacketSink for FailingSink {
    fn info(&self) -> SinkInfo {
        self.info.clone()
    }

    async fn write(&self, _packet: Packet) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(Error::SinkWrite("connection reset".into()))
    }

    fn is_alive(&self) -> bool {
        !self.is_closed()
    }

    fn close(&self, _reason: CloseReason) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn recalibrate_base_timestamp(&self) {}
}

/// Sink that accepts every packet after a fixed delay
pub struct SlowSink {
    info: SinkInfo,
    delay: Duration,
    attempts: AtomicUsize,
}

impl SlowSink {
    pub fn new(uid: &str, key: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            info: SinkInfo::new(uid, key),
            delay,
            attempts: AtomicUsize::new(0),
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PacketSink for SlowSink {
    fn info(&self) -> SinkInfo {
        self.info.clone()
    }

    async fn write(&self, _packet: Packet) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    fn is_alive(&self) -> bool {
        true
    }

    fn close(&self, _reason: CloseReason) {}

    fn recalibrate_base_timestamp(&self) {}
}

/// Source with a single read that completes only when the test releases it
///
/// Closing does not cancel a read already in flight.
pub struct GatedSource {
    info: SourceInfo,
    gate: Mutex<Option<oneshot::Receiver<Packet>>>,
    reading: AtomicBool,
    closed: AtomicBool,
}

impl GatedSource {
    pub fn new(uid: &str, key: &str) -> (Arc<Self>, oneshot::Sender<Packet>) {
        let (tx, rx) = oneshot::channel();
        let source = Arc::new(Self {
            info: SourceInfo::new(uid, key),
            gate: Mutex::new(Some(rx)),
            reading: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        });
        (source, tx)
    }

    pub fn is_reading(&self) -> bool {
        self.reading.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PacketSource for GatedSource {
    fn info(&self) -> SourceInfo {
        self.info.clone()
    }

    async fn read(&self) -> Result<Packet> {
        let gate = self.gate.lock().unwrap().take();
        let Some(gate) = gate else {
            return Err(Error::SourceRead("publisher disconnected".into()));
        };
        self.reading.store(true, Ordering::SeqCst);
        gate.await.map_err(|_| Error::SourceRead("publisher disconnected".into()))
    }

    fn is_alive(&self) -> bool {
        !self.is_closed()
    }

    fn close(&self, _reason: CloseReason) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
