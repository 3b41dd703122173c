//! Channel-backed publisher and subscriber handles
//!
//! ```text
//!   transport ──► SourceFeeder ──mpsc──► ChannelSource ──► Stream loop
//!   Stream loop ──► ChannelSink ──mpsc──► SinkReceiver ──► transport
//! ```
//!
//! Each pair also shares a `watch` channel carrying the close reason, so the
//! transport learns when the relay drops its connection and why.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch, Mutex};

use crate::error::{Error, Result};
use crate::media::Packet;

use super::clock::SessionClock;
use super::config::SessionConfig;
use super::{CloseReason, PacketSink, PacketSource, SinkInfo, SourceInfo};

/// Store `reason` if nothing was stored yet; returns true on the first close
fn close_once(closed: &watch::Sender<Option<CloseReason>>, reason: &CloseReason) -> bool {
    closed.send_if_modified(|current| {
        if current.is_none() {
            *current = Some(reason.clone());
            true
        } else {
            false
        }
    })
}

/// Publisher handle fed by a transport through a [`SourceFeeder`]
pub struct ChannelSource {
    info: SourceInfo,
    rx: Mutex<mpsc::Receiver<Packet>>,
    closed: watch::Sender<Option<CloseReason>>,
    clock: SessionClock,
}

/// Transport half of a [`ChannelSource`]
#[derive(Clone)]
pub struct SourceFeeder {
    tx: mpsc::Sender<Packet>,
    closed: watch::Receiver<Option<CloseReason>>,
}

impl ChannelSource {
    /// Create a source and the feeder that drives it
    pub fn new(info: SourceInfo, config: SessionConfig) -> (Arc<Self>, SourceFeeder) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (closed_tx, closed_rx) = watch::channel(None);

        let source = Arc::new(Self {
            info,
            rx: Mutex::new(rx),
            closed: closed_tx,
            clock: SessionClock::new(config.liveness_timeout),
        });

        (
            source,
            SourceFeeder {
                tx,
                closed: closed_rx,
            },
        )
    }

    /// Why the source was closed, if it was
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.closed.borrow().clone()
    }
}

#[async_trait]
impl PacketSource for ChannelSource {
    fn info(&self) -> SourceInfo {
        self.info.clone()
    }

    async fn read(&self) -> Result<Packet> {
        let mut closed = self.closed.subscribe();
        let reason = closed.borrow_and_update().clone();
        if let Some(reason) = reason {
            return Err(Error::from_close(reason));
        }

        let mut rx = self.rx.lock().await;
        tokio::select! {
            biased;
            _ = closed.changed() => {
                let reason = self.close_reason().unwrap_or(CloseReason::Superseded);
                Err(Error::from_close(reason))
            }
            packet = rx.recv() => match packet {
                Some(packet) => {
                    self.clock.touch();
                    Ok(packet)
                }
                None => Err(Error::SourceRead("publisher disconnected".into())),
            },
        }
    }

    fn is_alive(&self) -> bool {
        self.close_reason().is_none() && self.clock.is_alive()
    }

    fn close(&self, reason: CloseReason) {
        if close_once(&self.closed, &reason) {
            tracing::debug!(
                stream = %self.info.key,
                uid = %self.info.uid,
                reason = %reason,
                "Source closed"
            );
        }
    }
}

impl SourceFeeder {
    /// Push a packet to the relay
    ///
    /// Fails once the relay closed the source; the transport should then
    /// drop the publisher connection.
    pub async fn send(&self, packet: Packet) -> Result<()> {
        if let Some(reason) = self.close_reason() {
            return Err(Error::Closed(reason));
        }

        let mut closed = self.closed.clone();
        tokio::select! {
            biased;
            _ = closed.changed() => Err(self.closed_error()),
            sent = self.tx.send(packet) => sent.map_err(|_| self.closed_error()),
        }
    }

    /// Why the relay closed the source, if it did
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.closed.borrow().clone()
    }

    /// Wait until the relay closes the source
    pub async fn closed(&self) -> CloseReason {
        let mut closed = self.closed.clone();
        let reason = match closed.wait_for(Option::is_some).await {
            Ok(reason) => reason.clone().unwrap_or(CloseReason::PublisherEnded),
            Err(_) => CloseReason::PublisherEnded,
        };
        reason
    }

    fn closed_error(&self) -> Error {
        Error::Closed(self.close_reason().unwrap_or(CloseReason::PublisherEnded))
    }
}

/// Subscriber handle drained by a transport through a [`SinkReceiver`]
pub struct ChannelSink {
    info: SinkInfo,
    tx: mpsc::Sender<Packet>,
    closed: watch::Sender<Option<CloseReason>>,
    clock: SessionClock,
    write_timeout: Duration,
}

/// Transport half of a [`ChannelSink`]
pub struct SinkReceiver {
    rx: mpsc::Receiver<Packet>,
    closed: watch::Receiver<Option<CloseReason>>,
}

impl ChannelSink {
    /// Create a sink and the receiver the transport drains
    pub fn new(info: SinkInfo, config: SessionConfig) -> (Arc<Self>, SinkReceiver) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (closed_tx, closed_rx) = watch::channel(None);

        let sink = Arc::new(Self {
            info,
            tx,
            closed: closed_tx,
            clock: SessionClock::new(config.liveness_timeout),
            write_timeout: config.write_timeout,
        });

        (
            sink,
            SinkReceiver {
                rx,
                closed: closed_rx,
            },
        )
    }

    /// Why the sink was closed, if it was
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.closed.borrow().clone()
    }

    /// Offset currently added to outgoing timestamps
    pub fn base_timestamp(&self) -> u32 {
        self.clock.base_timestamp()
    }
}

#[async_trait]
impl PacketSink for ChannelSink {
    fn info(&self) -> SinkInfo {
        self.info.clone()
    }

    async fn write(&self, packet: Packet) -> Result<()> {
        if let Some(reason) = self.close_reason() {
            return Err(Error::from_close(reason));
        }

        let packet = self.clock.rebase(packet);
        match tokio::time::timeout(self.write_timeout, self.tx.send(packet)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(Error::SinkWrite("subscriber disconnected".into())),
            Err(_) => Err(Error::SinkWrite(format!(
                "write stalled for {:?}",
                self.write_timeout
            ))),
        }
    }

    // A subscriber idles until a publisher shows up, so only a dropped
    // receiver counts as dead; stalls surface through the write timeout
    fn is_alive(&self) -> bool {
        self.close_reason().is_none() && !self.tx.is_closed()
    }

    fn close(&self, reason: CloseReason) {
        if close_once(&self.closed, &reason) {
            tracing::debug!(
                stream = %self.info.key,
                uid = %self.info.uid,
                reason = %reason,
                "Sink closed"
            );
        }
    }

    fn recalibrate_base_timestamp(&self) {
        self.clock.recalibrate();
        tracing::debug!(
            stream = %self.info.key,
            uid = %self.info.uid,
            base_timestamp = self.clock.base_timestamp(),
            "Sink timestamp base recalibrated"
        );
    }
}

impl SinkReceiver {
    /// Next packet, or `None` once the relay closed the sink
    pub async fn recv(&mut self) -> Option<Packet> {
        if self.closed.borrow().is_some() {
            return None;
        }

        tokio::select! {
            biased;
            _ = self.closed.changed() => None,
            packet = self.rx.recv() => packet,
        }
    }

    /// Next packet if one is queued right now
    pub fn try_recv(&mut self) -> Option<Packet> {
        self.rx.try_recv().ok()
    }

    /// Why the relay closed the sink, if it did
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.closed.borrow().clone()
    }
}
