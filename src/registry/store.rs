//! Stream registry implementation
//!
//! The central directory that maps stream keys to live stream instances,
//! attaches publishers and subscribers, and reclaims dead streams.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::session::{PacketSink, PacketSource};
use crate::stats::{StatusEntry, StatusReport};

use super::config::RegistryConfig;
use super::error::RegistryError;
use super::key::StreamKey;
use super::stream::Stream;

/// Central registry for all active streams
///
/// Lookups, inserts and takeovers are each atomic with respect to one
/// another: a takeover holds the map's write lock until the new instance is
/// installed, so no caller ever observes a half-replaced key.
pub struct StreamRegistry {
    /// Map of stream key to the current stream instance
    streams: RwLock<HashMap<StreamKey, Arc<Stream>>>,

    /// Configuration
    config: RegistryConfig,

    /// Background liveness sweep, when started
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl StreamRegistry {
    /// Create a new stream registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new stream registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            config,
            sweeper: Mutex::new(None),
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Attach a publisher
    ///
    /// Creates the stream if the key is unknown. On a known key the current
    /// publisher is stopped and interval subscribers are closed; then either
    /// the instance is reused (same publisher UID, or no publisher yet) or a
    /// fresh instance takes over the key and inherits every remaining
    /// subscriber.
    pub async fn handle_publish(
        &self,
        source: Arc<dyn PacketSource>,
    ) -> Result<Arc<Stream>, RegistryError> {
        let info = source.info();
        let mut streams = self.streams.write().await;

        let stream = match streams.get(&info.key).cloned() {
            None => {
                let stream = Arc::new(Stream::new(info.key.clone(), &self.config));
                streams.insert(info.key.clone(), Arc::clone(&stream));
                tracing::info!(stream = %info.key, uid = %info.uid, "Stream created by publisher");
                stream
            }
            Some(existing) => {
                existing.stop().await;
                existing.close_interval().await;

                match existing.publisher_id().await {
                    Some(previous) if previous != info.uid => {
                        let stream = Arc::new(Stream::new(info.key.clone(), &self.config));
                        let moved = existing.transfer_sinks_to(&stream).await;
                        streams.insert(info.key.clone(), Arc::clone(&stream));
                        tracing::info!(
                            stream = %info.key,
                            previous = %previous,
                            uid = %info.uid,
                            subscribers = moved,
                            "Publisher takeover"
                        );
                        stream
                    }
                    _ => {
                        tracing::info!(
                            stream = %info.key,
                            uid = %info.uid,
                            "Publisher reusing existing stream"
                        );
                        existing
                    }
                }
            }
        };

        stream.add_source(source).await?;
        Ok(stream)
    }

    /// Attach a long-lived (push) subscriber
    ///
    /// An unknown key gets an empty stream; the subscriber receives packets
    /// once a publisher arrives.
    pub async fn handle_subscribe(&self, sink: Arc<dyn PacketSink>) -> Arc<Stream> {
        let info = sink.info();
        let mut streams = self.streams.write().await;
        let stream = Arc::clone(streams.entry(info.key.clone()).or_insert_with(|| {
            tracing::info!(stream = %info.key, uid = %info.uid, "Stream created by subscriber");
            Arc::new(Stream::new(info.key.clone(), &self.config))
        }));

        // Attached under the map guard so a takeover or sweep cannot retire
        // the instance in between
        stream.add_sink(sink).await;
        stream
    }

    /// Attach a pull-style subscriber to an existing stream
    pub async fn handle_pull(
        &self,
        sink: Arc<dyn PacketSink>,
    ) -> Result<Arc<Stream>, RegistryError> {
        let info = sink.info();
        let streams = self.streams.read().await;
        let stream = streams
            .get(&info.key)
            .cloned()
            .ok_or_else(|| RegistryError::StreamNotFound(info.key.clone()))?;
        stream.add_sink(sink).await;
        Ok(stream)
    }

    /// Current stream instance for a key
    pub async fn lookup(&self, key: &StreamKey) -> Result<Arc<Stream>, RegistryError> {
        self.streams
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| RegistryError::StreamNotFound(key.clone()))
    }

    /// Get total number of streams
    pub async fn stream_count(&self) -> usize {
        self.streams.read().await.len()
    }

    /// Registered keys, sorted
    pub async fn keys(&self) -> Vec<StreamKey> {
        let mut keys: Vec<StreamKey> = self.streams.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Publishers and subscribers across all streams, sorted by key
    pub async fn status(&self) -> StatusReport {
        let mut streams: Vec<(StreamKey, Arc<Stream>)> = self
            .streams
            .read()
            .await
            .iter()
            .map(|(key, stream)| (key.clone(), Arc::clone(stream)))
            .collect();
        streams.sort_by(|a, b| a.0.cmp(&b.0));

        let mut report = StatusReport::default();
        for (key, stream) in streams {
            if stream.is_running() {
                if let Some(uid) = stream.publisher_id().await {
                    report.publishers.push(StatusEntry::new(key.as_str(), uid));
                }
            }
            for uid in stream.subscriber_ids().await {
                report.players.push(StatusEntry::new(key.as_str(), uid));
            }
        }
        report
    }

    /// Run one liveness sweep
    ///
    /// Every stream closes its dead handles; streams left with no live
    /// publisher and no subscriber are removed. Returns how many were removed.
    pub async fn sweep_once(&self) -> usize {
        let snapshot: Vec<(StreamKey, Arc<Stream>)> = self
            .streams
            .read()
            .await
            .iter()
            .map(|(key, stream)| (key.clone(), Arc::clone(stream)))
            .collect();

        // Per-stream work runs outside the map lock
        let mut candidates = Vec::new();
        for (key, stream) in snapshot {
            if stream.liveness_sweep().await == 0 {
                candidates.push((key, stream));
            }
        }
        if candidates.is_empty() {
            return 0;
        }

        let mut streams = self.streams.write().await;
        let mut removed = 0;
        for (key, stream) in candidates {
            // Skip keys taken over or re-populated since the pass above
            let unchanged = streams
                .get(&key)
                .is_some_and(|current| Arc::ptr_eq(current, &stream));
            if unchanged && stream.is_vacant().await {
                streams.remove(&key);
                removed += 1;
                tracing::info!(stream = %key, "Stream removed by liveness sweep");
            }
        }
        removed
    }

    /// Start the background liveness sweep; no-op if already running
    pub fn start(self: &Arc<Self>) {
        let mut sweeper = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
        if sweeper.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let registry: Weak<Self> = Arc::downgrade(self);
        let period = self.config.sweep_interval;
        tracing::info!(interval_ms = period.as_millis() as u64, "Liveness sweep started");

        *sweeper = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let removed = registry.sweep_once().await;
                if removed > 0 {
                    tracing::debug!(removed = removed, "Liveness sweep pass");
                }
            }
        }));
    }

    /// Stop the background liveness sweep
    pub fn stop(&self) {
        let handle = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            tracing::info!("Liveness sweep stopped");
        }
    }

    /// Whether the background sweep is running
    pub fn is_started(&self) -> bool {
        self.sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StreamRegistry {
    fn drop(&mut self) {
        let handle = self
            .sweeper
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}
