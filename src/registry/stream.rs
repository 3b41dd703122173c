//! A single stream instance
//!
//! One publisher, many subscribers. A spawned distribution loop reads the
//! publisher, records each packet in the cache, and writes it to every
//! attached sink. A sink's first turn in the loop replays the cache instead,
//! so replay and live packets never interleave.
//!
//! ```text
//!   PacketSource ──read──► run() ──► PacketCache.write
//!                                 └─► for each SinkRegistration:
//!                                       first turn: cache snapshot, in order
//!                                       afterwards: sink.write(packet)
//! ```
//!
//! A failing sink is dropped after one failed attempt; the loop itself only
//! ends when the publisher read fails or the stream is stopped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::media::{Packet, PacketCache};
use crate::session::{CloseReason, PacketSink, PacketSource, SinkInfo, SourceInfo};
use crate::stats::{StreamMetrics, StreamStats};

use super::config::RegistryConfig;
use super::entry::{SinkRegistration, StreamState};
use super::error::RegistryError;
use super::key::StreamKey;

/// Stream instance for one publisher generation
pub struct Stream {
    key: StreamKey,
    source: RwLock<Option<Arc<dyn PacketSource>>>,
    sinks: RwLock<HashMap<String, Arc<SinkRegistration>>>,
    cache: RwLock<PacketCache>,
    running: AtomicBool,
    /// Bumped on every `add_source`; a loop only acts while it owns the current one
    generation: AtomicU64,
    metrics: StreamMetrics,
    created_at: Instant,
}

impl Stream {
    /// Create an idle stream
    pub fn new(key: StreamKey, config: &RegistryConfig) -> Self {
        Self {
            key,
            source: RwLock::new(None),
            sinks: RwLock::new(HashMap::new()),
            cache: RwLock::new(PacketCache::with_limits(
                config.cache_max_bytes,
                config.cache_max_packets,
            )),
            running: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            metrics: StreamMetrics::new(),
            created_at: Instant::now(),
        }
    }

    pub fn key(&self) -> &StreamKey {
        &self.key
    }

    /// Whether a distribution loop is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.is_running() && self.generation.load(Ordering::SeqCst) == generation
    }

    /// Current lifecycle state
    pub async fn state(&self) -> StreamState {
        let source = self.source.read().await;
        if self.is_running() {
            StreamState::Running
        } else if source.is_some() {
            StreamState::Stopped
        } else {
            StreamState::Idle
        }
    }

    /// Identity of the installed publisher, running or not
    pub async fn publisher(&self) -> Option<SourceInfo> {
        self.source.read().await.as_ref().map(|s| s.info())
    }

    /// UID of the installed publisher, running or not
    pub async fn publisher_id(&self) -> Option<String> {
        self.publisher().await.map(|info| info.uid)
    }

    /// Identities of attached subscribers, sorted by UID
    pub async fn subscribers(&self) -> Vec<SinkInfo> {
        let mut infos: Vec<SinkInfo> = self
            .sinks
            .read()
            .await
            .values()
            .map(|reg| reg.info().clone())
            .collect();
        infos.sort_by(|a, b| a.uid.cmp(&b.uid));
        infos
    }

    /// UIDs of attached subscribers, sorted
    pub async fn subscriber_ids(&self) -> Vec<String> {
        self.subscribers()
            .await
            .into_iter()
            .map(|info| info.uid)
            .collect()
    }

    pub async fn subscriber_count(&self) -> usize {
        self.sinks.read().await.len()
    }

    /// Snapshot of this instance's counters
    pub async fn stats(&self) -> StreamStats {
        StreamStats {
            stream_key: self.key.to_string(),
            running: self.is_running(),
            subscriber_count: self.subscriber_count().await,
            packets_in: self.metrics.packets_in(),
            bytes_in: self.metrics.bytes_in(),
            packets_out: self.metrics.packets_out(),
            sinks_evicted: self.metrics.sinks_evicted(),
            cached_packets: self.cache.read().await.packet_count(),
            age: self.created_at.elapsed(),
        }
    }

    /// Install a publisher and spawn the distribution loop
    ///
    /// Fails if a publisher is already running; stop it first.
    pub async fn add_source(
        self: &Arc<Self>,
        source: Arc<dyn PacketSource>,
    ) -> Result<JoinHandle<()>, RegistryError> {
        let mut slot = self.source.write().await;
        if self.is_running() {
            return Err(RegistryError::StreamAlreadyPublishing(self.key.clone()));
        }

        // Packets of a previous generation are on a different clock. The
        // generation moves under the cache guard, so an older loop that
        // already holds a packet can no longer record it.
        let mut cache = self.cache.write().await;
        cache.clear();
        *slot = Some(Arc::clone(&source));
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.running.store(true, Ordering::SeqCst);
        drop(cache);
        drop(slot);

        tracing::info!(
            stream = %self.key,
            uid = %source.info().uid,
            generation = generation,
            "Publisher attached"
        );

        let stream = Arc::clone(self);
        Ok(tokio::spawn(stream.run(source, generation)))
    }

    /// Attach a subscriber
    ///
    /// The cached window is replayed on the sink's first turn in the
    /// distribution loop. A sink re-using an attached UID replaces it.
    pub async fn add_sink(&self, sink: Arc<dyn PacketSink>) {
        let registration = Arc::new(SinkRegistration::new(sink));
        let uid = registration.info().uid.clone();
        let interval = registration.info().interval;

        let previous = self
            .sinks
            .write()
            .await
            .insert(uid.clone(), Arc::clone(&registration));

        if let Some(previous) = previous {
            if !previous.wraps(registration.sink()) {
                previous.sink().close(CloseReason::Superseded);
            }
        }

        tracing::info!(
            stream = %self.key,
            uid = %uid,
            interval = interval,
            "Subscriber attached"
        );
    }

    /// Stop the distribution loop and close the publisher; idempotent
    pub async fn stop(&self) {
        let slot = self.source.read().await;
        if self.running.swap(false, Ordering::SeqCst) {
            if let Some(source) = slot.as_ref() {
                source.close(CloseReason::Superseded);
            }
            tracing::info!(stream = %self.key, "Stream stopped");
        }
    }

    /// Move every sink to another instance
    ///
    /// Each sink continues its timeline from its last packet and gets the
    /// new instance's cache replayed. Returns the number of sinks moved.
    pub async fn transfer_sinks_to(&self, other: &Stream) -> usize {
        let drained: Vec<Arc<SinkRegistration>> =
            self.sinks.write().await.drain().map(|(_, reg)| reg).collect();
        let count = drained.len();

        for registration in drained {
            registration.sink().recalibrate_base_timestamp();
            other.add_sink(Arc::clone(registration.sink())).await;
        }

        if count > 0 {
            tracing::info!(stream = %self.key, sinks = count, "Subscribers transferred");
        }
        count
    }

    /// Close and remove interval (pull) sinks; returns how many
    pub async fn close_interval(&self) -> usize {
        let mut closed = Vec::new();
        self.sinks.write().await.retain(|_, reg| {
            if reg.info().interval {
                closed.push(Arc::clone(reg));
                false
            } else {
                true
            }
        });

        for registration in &closed {
            registration.sink().close(CloseReason::PublisherEnded);
            tracing::info!(
                stream = %self.key,
                uid = %registration.info().uid,
                "Interval subscriber closed"
            );
        }
        closed.len()
    }

    /// Close dead handles and count the live ones
    ///
    /// A running publisher that stopped producing is closed, which ends the
    /// loop on its next read. Dead sinks are removed and closed.
    pub async fn liveness_sweep(&self) -> usize {
        let mut alive = 0;

        {
            let slot = self.source.read().await;
            if let (Some(source), true) = (slot.as_ref(), self.is_running()) {
                if source.is_alive() {
                    alive += 1;
                } else {
                    tracing::warn!(
                        stream = %self.key,
                        uid = %source.info().uid,
                        "Publisher timed out"
                    );
                    source.close(CloseReason::ReadTimeout);
                }
            }
        }

        let mut dead = Vec::new();
        {
            let mut sinks = self.sinks.write().await;
            sinks.retain(|_, reg| {
                if reg.sink().is_alive() {
                    true
                } else {
                    dead.push(Arc::clone(reg));
                    false
                }
            });
            alive += sinks.len();
        }

        for registration in dead {
            self.metrics.record_eviction();
            registration.sink().close(CloseReason::WriteTimeout);
            tracing::warn!(
                stream = %self.key,
                uid = %registration.info().uid,
                "Subscriber timed out, removed"
            );
        }

        alive
    }

    /// No live publisher and no subscriber attached
    pub async fn is_vacant(&self) -> bool {
        if self.subscriber_count().await > 0 {
            return false;
        }
        let slot = self.source.read().await;
        !(self.is_running() && slot.as_ref().is_some_and(|source| source.is_alive()))
    }

    async fn run(self: Arc<Self>, source: Arc<dyn PacketSource>, generation: u64) {
        let uid = source.info().uid;

        while self.is_current(generation) {
            let packet = match source.read().await {
                Ok(packet) => packet,
                Err(e) => {
                    tracing::info!(
                        stream = %self.key,
                        uid = %uid,
                        error = %e,
                        "Publisher read ended"
                    );
                    break;
                }
            };

            let cached = {
                let mut cache = self.cache.write().await;
                // The read may have been in flight across a stop and a new add_source
                if !self.is_current(generation) {
                    break;
                }
                cache.write(&packet)
            };
            self.metrics.record_in(&packet);
            self.distribute(&packet, cached, generation).await;
        }

        // Serialized with add_source so a newer generation is never marked stopped
        let ended = {
            let _slot = self.source.write().await;
            if self.generation.load(Ordering::SeqCst) == generation {
                self.running.store(false, Ordering::SeqCst);
                true
            } else {
                false
            }
        };

        if ended {
            self.close_interval().await;
        }

        tracing::debug!(
            stream = %self.key,
            uid = %uid,
            generation = generation,
            "Distribution loop exited"
        );
    }

    async fn distribute(&self, packet: &Packet, cached: bool, generation: u64) {
        let snapshot: Vec<(String, Arc<SinkRegistration>)> = self
            .sinks
            .read()
            .await
            .iter()
            .map(|(uid, reg)| (uid.clone(), Arc::clone(reg)))
            .collect();

        for (uid, registration) in snapshot {
            if !self.is_current(generation) {
                return;
            }

            let result = if registration.is_replayed() {
                registration
                    .sink()
                    .write(packet.clone())
                    .await
                    .map(|()| 1)
            } else {
                self.replay(&registration, packet, cached).await
            };

            match result {
                Ok(delivered) => self.metrics.record_out(delivered),
                Err(e) => {
                    tracing::warn!(
                        stream = %self.key,
                        uid = %uid,
                        error = %e,
                        "Subscriber write failed, removed"
                    );
                    self.remove_sink(&uid, &registration).await;
                    registration
                        .sink()
                        .close(CloseReason::Error(e.to_string()));
                }
            }
        }
    }

    /// First turn of a sink: cached window, then the live packet if the
    /// cache did not keep it
    async fn replay(
        &self,
        registration: &SinkRegistration,
        packet: &Packet,
        cached: bool,
    ) -> crate::error::Result<u64> {
        // Snapshot so a slow sink never holds the cache guard
        let backlog: Vec<Packet> = self.cache.read().await.catchup().cloned().collect();
        let mut delivered = backlog.len() as u64;
        for cached_packet in backlog {
            registration.sink().write(cached_packet).await?;
        }

        if !cached {
            registration.sink().write(packet.clone()).await?;
            delivered += 1;
        }

        registration.mark_replayed();
        tracing::debug!(
            stream = %self.key,
            uid = %registration.info().uid,
            packets = delivered,
            "Cache replayed to subscriber"
        );
        Ok(delivered)
    }

    async fn remove_sink(&self, uid: &str, registration: &Arc<SinkRegistration>) {
        let mut sinks = self.sinks.write().await;
        if sinks
            .get(uid)
            .is_some_and(|current| Arc::ptr_eq(current, registration))
        {
            sinks.remove(uid);
            self.metrics.record_eviction();
        }
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("key", &self.key)
            .field("running", &self.is_running())
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::session::{ChannelSink, ChannelSource, SessionConfig, SourceInfo};
    use crate::test_util::{frame, keyframe, next_timestamps, FailingSink, GatedSource};

    fn new_stream(key: &str) -> Arc<Stream> {
        Arc::new(Stream::new(StreamKey::from(key), &RegistryConfig::default()))
    }

    fn source(uid: &str, key: &str) -> (Arc<ChannelSource>, crate::session::SourceFeeder) {
        ChannelSource::new(SourceInfo::new(uid, key), SessionConfig::default())
    }

    fn sink(uid: &str, key: &str) -> (Arc<ChannelSink>, crate::session::SinkReceiver) {
        ChannelSink::new(SinkInfo::new(uid, key), SessionConfig::default())
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let stream = new_stream("live/a");
        assert_eq!(stream.state().await, StreamState::Idle);

        let (src, _feeder) = source("pub1", "live/a");
        stream.add_source(src.clone()).await.unwrap();
        assert_eq!(stream.state().await, StreamState::Running);
        assert_eq!(stream.publisher_id().await.as_deref(), Some("pub1"));

        stream.stop().await;
        assert_eq!(stream.state().await, StreamState::Stopped);
        assert_eq!(src.close_reason(), Some(CloseReason::Superseded));
    }

    #[tokio::test]
    async fn test_add_source_while_running_fails() {
        let stream = new_stream("live/a");
        let (first, _f1) = source("pub1", "live/a");
        let (second, _f2) = source("pub2", "live/a");

        stream.add_source(first).await.unwrap();
        let result = stream.add_source(second).await;
        assert!(matches!(
            result,
            Err(RegistryError::StreamAlreadyPublishing(_))
        ));
    }

    #[tokio::test]
    async fn test_order_preserved() {
        let stream = new_stream("live/a");
        let (snk, mut rx) = sink("v1", "live/a");
        stream.add_sink(snk).await;

        let (src, feeder) = source("pub1", "live/a");
        stream.add_source(src).await.unwrap();

        for ts in [0, 33, 66, 100] {
            feeder.send(frame(ts, ts == 0)).await.unwrap();
        }

        assert_eq!(next_timestamps(&mut rx, 4).await, vec![0, 33, 66, 100]);
    }

    #[tokio::test]
    async fn test_uncached_first_packet_not_dropped() {
        let stream = new_stream("live/a");
        let (snk, mut rx) = sink("v1", "live/a");
        stream.add_sink(snk).await;

        let (src, feeder) = source("pub1", "live/a");
        stream.add_source(src).await.unwrap();

        // Inter frames before any keyframe never enter the cache
        for ts in [0, 33, 66] {
            feeder.send(frame(ts, false)).await.unwrap();
        }

        assert_eq!(next_timestamps(&mut rx, 3).await, vec![0, 33, 66]);
    }

    #[tokio::test]
    async fn test_late_joiner_gets_cache_then_live() {
        let stream = new_stream("live/a");
        let (early, mut early_rx) = sink("early", "live/a");
        stream.add_sink(early).await;

        let (src, feeder) = source("pub1", "live/a");
        stream.add_source(src).await.unwrap();

        feeder.send(keyframe(0)).await.unwrap();
        feeder.send(frame(33, false)).await.unwrap();
        feeder.send(frame(66, false)).await.unwrap();
        assert_eq!(next_timestamps(&mut early_rx, 3).await, vec![0, 33, 66]);

        let (late, mut late_rx) = sink("late", "live/a");
        stream.add_sink(late).await;

        feeder.send(frame(100, false)).await.unwrap();
        feeder.send(frame(133, false)).await.unwrap();

        // Backlog, then live, nothing duplicated at the boundary
        assert_eq!(
            next_timestamps(&mut late_rx, 5).await,
            vec![0, 33, 66, 100, 133]
        );
        assert_eq!(next_timestamps(&mut early_rx, 2).await, vec![100, 133]);
        tokio::task::yield_now().await;
        assert!(late_rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_failing_sink_isolated() {
        let stream = new_stream("live/a");
        let failing = FailingSink::new("bad", "live/a");
        stream.add_sink(failing.clone()).await;
        let (good, mut good_rx) = sink("good", "live/a");
        stream.add_sink(good).await;

        let (src, feeder) = source("pub1", "live/a");
        stream.add_source(src).await.unwrap();

        for ts in [0, 33, 66] {
            feeder.send(frame(ts, ts == 0)).await.unwrap();
        }

        assert_eq!(next_timestamps(&mut good_rx, 3).await, vec![0, 33, 66]);
        assert_eq!(failing.attempts(), 1);
        assert!(failing.is_closed());
        assert_eq!(stream.subscriber_ids().await, vec!["good".to_string()]);
        assert_eq!(stream.stats().await.sinks_evicted, 1);
    }

    #[tokio::test]
    async fn test_source_end_closes_interval_sinks_only() {
        let stream = new_stream("live/a");
        let (pull, mut pull_rx) =
            ChannelSink::new(SinkInfo::interval("pull", "live/a"), SessionConfig::default());
        let (push, _push_rx) = sink("push", "live/a");
        stream.add_sink(pull).await;
        stream.add_sink(push).await;

        let (src, feeder) = source("pub1", "live/a");
        let handle = stream.add_source(src).await.unwrap();
        drop(feeder);
        handle.await.unwrap();

        assert!(!stream.is_running());
        assert_eq!(stream.subscriber_ids().await, vec!["push".to_string()]);
        assert_eq!(pull_rx.recv().await, None);
        assert_eq!(pull_rx.close_reason(), Some(CloseReason::PublisherEnded));
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let stream = new_stream("live/a");
        stream.stop().await;

        let (src, _feeder) = source("pub1", "live/a");
        let handle = stream.add_source(src.clone()).await.unwrap();

        stream.stop().await;
        stream.stop().await;
        handle.await.unwrap();

        assert_eq!(stream.state().await, StreamState::Stopped);
        assert_eq!(src.close_reason(), Some(CloseReason::Superseded));
    }

    #[tokio::test]
    async fn test_transfer_recalibrates_and_replays() {
        let old = new_stream("live/a");
        let (snk, mut rx) = sink("v1", "live/a");
        let handle = Arc::clone(&snk);
        old.add_sink(snk).await;

        let (src, feeder) = source("pub1", "live/a");
        old.add_source(src).await.unwrap();
        feeder.send(keyframe(0)).await.unwrap();
        feeder.send(frame(500, false)).await.unwrap();
        assert_eq!(next_timestamps(&mut rx, 2).await, vec![0, 500]);

        old.stop().await;
        let new = new_stream("live/a");
        assert_eq!(old.transfer_sinks_to(&new).await, 1);
        assert_eq!(old.subscriber_count().await, 0);
        assert_eq!(handle.base_timestamp(), 500);

        let (src2, feeder2) = source("pub2", "live/a");
        new.add_source(src2).await.unwrap();
        feeder2.send(keyframe(0)).await.unwrap();
        feeder2.send(frame(40, false)).await.unwrap();

        assert_eq!(next_timestamps(&mut rx, 2).await, vec![500, 540]);
    }

    #[tokio::test]
    async fn test_reused_stream_ignores_stale_loop() {
        let stream = new_stream("live/a");
        let (snk, mut rx) = sink("v1", "live/a");
        stream.add_sink(snk).await;

        let (first, _f1) = source("pub1", "live/a");
        let old_loop = stream.add_source(first).await.unwrap();
        stream.stop().await;

        let (second, feeder) = source("pub1", "live/a");
        stream.add_source(second).await.unwrap();
        old_loop.await.unwrap();

        // The stale loop exit must not stop the new generation
        assert!(stream.is_running());
        feeder.send(keyframe(0)).await.unwrap();
        assert_eq!(next_timestamps(&mut rx, 1).await, vec![0]);
    }

    #[tokio::test]
    async fn test_reconnect_replays_only_new_generation() {
        let stream = new_stream("live/a");
        let (early, mut early_rx) = sink("early", "live/a");
        stream.add_sink(early).await;

        let (first, first_feeder) = source("pub1", "live/a");
        stream.add_source(first).await.unwrap();
        first_feeder.send(keyframe(0)).await.unwrap();
        first_feeder.send(frame(33, false)).await.unwrap();
        assert_eq!(next_timestamps(&mut early_rx, 2).await, vec![0, 33]);

        stream.stop().await;
        let (second, feeder) = source("pub1", "live/a");
        stream.add_source(second).await.unwrap();
        feeder.send(keyframe(1000)).await.unwrap();
        feeder.send(frame(1033, false)).await.unwrap();
        assert_eq!(next_timestamps(&mut early_rx, 2).await, vec![1000, 1033]);

        let (late, mut late_rx) = sink("late", "live/a");
        stream.add_sink(late).await;
        feeder.send(frame(1066, false)).await.unwrap();

        assert_eq!(
            next_timestamps(&mut late_rx, 3).await,
            vec![1000, 1033, 1066]
        );
        assert_eq!(stream.stats().await.cached_packets, 3);
    }

    #[tokio::test]
    async fn test_in_flight_read_of_old_generation_is_discarded() {
        let stream = new_stream("live/a");
        let (early, mut early_rx) = sink("early", "live/a");
        stream.add_sink(early).await;

        let (first, gate) = GatedSource::new("pub1", "live/a");
        let old_loop = stream.add_source(first.clone()).await.unwrap();
        while !first.is_reading() {
            tokio::task::yield_now().await;
        }

        stream.stop().await;
        assert!(first.is_closed());

        let (second, feeder) = source("pub1", "live/a");
        stream.add_source(second).await.unwrap();
        feeder.send(keyframe(0)).await.unwrap();
        feeder.send(frame(40, false)).await.unwrap();
        assert_eq!(next_timestamps(&mut early_rx, 2).await, vec![0, 40]);

        // The old read completes after the new generation started
        gate.send(keyframe(9999)).unwrap();
        old_loop.await.unwrap();
        assert!(stream.is_running());

        let (late, mut late_rx) = sink("late", "live/a");
        stream.add_sink(late).await;
        feeder.send(frame(80, false)).await.unwrap();

        assert_eq!(next_timestamps(&mut late_rx, 3).await, vec![0, 40, 80]);
        assert_eq!(next_timestamps(&mut early_rx, 1).await, vec![80]);
        assert_eq!(stream.stats().await.packets_in, 3);
    }

    #[tokio::test]
    async fn test_remove_sink_counts_only_actual_evictions() {
        let stream = new_stream("live/a");
        let (current, _rx) = sink("v1", "live/a");
        stream.add_sink(current).await;

        // A stale registration under the same UID
        let (stale, _stale_rx) = sink("v1", "live/a");
        let stale = Arc::new(SinkRegistration::new(stale));
        stream.remove_sink("v1", &stale).await;
        assert_eq!(stream.subscriber_count().await, 1);
        assert_eq!(stream.stats().await.sinks_evicted, 0);

        let registered = stream.sinks.read().await.get("v1").cloned().unwrap();
        stream.remove_sink("v1", &registered).await;
        assert_eq!(stream.subscriber_count().await, 0);
        assert_eq!(stream.stats().await.sinks_evicted, 1);
    }

    #[tokio::test]
    async fn test_vacancy() {
        let stream = new_stream("live/a");
        assert!(stream.is_vacant().await);

        let (src, feeder) = source("pub1", "live/a");
        let handle = stream.add_source(src).await.unwrap();
        assert!(!stream.is_vacant().await);

        drop(feeder);
        handle.await.unwrap();
        assert!(stream.is_vacant().await);

        let (snk, _rx) = sink("v1", "live/a");
        stream.add_sink(snk).await;
        assert!(!stream.is_vacant().await);
    }

    #[tokio::test]
    async fn test_liveness_sweep_counts_and_evicts() {
        let stream = new_stream("live/a");
        let (alive, _alive_rx) = sink("alive", "live/a");
        let (dead, dead_rx) = sink("dead", "live/a");
        stream.add_sink(alive).await;
        stream.add_sink(dead.clone()).await;
        drop(dead_rx);

        let (src, _feeder) = source("pub1", "live/a");
        stream.add_source(src).await.unwrap();

        assert_eq!(stream.liveness_sweep().await, 2);
        assert_eq!(stream.subscriber_ids().await, vec!["alive".to_string()]);
        assert_eq!(dead.close_reason(), Some(CloseReason::WriteTimeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_liveness_sweep_times_out_publisher() {
        let stream = new_stream("live/a");
        let config = SessionConfig::default().liveness_timeout(Duration::from_secs(1));
        let (src, feeder) = ChannelSource::new(SourceInfo::new("pub1", "live/a"), config);
        let handle = stream.add_source(src.clone()).await.unwrap();

        assert_eq!(stream.liveness_sweep().await, 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(stream.liveness_sweep().await, 0);
        assert_eq!(src.close_reason(), Some(CloseReason::ReadTimeout));

        handle.await.unwrap();
        assert!(!stream.is_running());
        assert!(feeder.send(keyframe(0)).await.is_err());
    }

    #[tokio::test]
    async fn test_same_uid_replaces_registration() {
        let stream = new_stream("live/a");
        let (first, _rx1) = sink("v1", "live/a");
        let (second, _rx2) = sink("v1", "live/a");

        stream.add_sink(first.clone()).await;
        stream.add_sink(second.clone()).await;

        assert_eq!(stream.subscriber_count().await, 1);
        assert_eq!(first.close_reason(), Some(CloseReason::Superseded));
        assert_eq!(second.close_reason(), None);
    }
}
