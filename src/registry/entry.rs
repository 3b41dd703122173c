//! Subscriber registrations and stream state types

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::session::{PacketSink, SinkInfo};

/// Lifecycle state of a stream instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No publisher yet (created by a subscriber)
    Idle,
    /// Distribution loop running
    Running,
    /// Publisher gone, superseded, or timed out
    Stopped,
}

/// A sink attached to a stream
///
/// The replay flag flips once the sink has received the stream's cached
/// window; from then on it gets live packets only.
pub struct SinkRegistration {
    info: SinkInfo,
    sink: Arc<dyn PacketSink>,
    replayed: AtomicBool,
}

impl SinkRegistration {
    pub fn new(sink: Arc<dyn PacketSink>) -> Self {
        Self {
            info: sink.info(),
            sink,
            replayed: AtomicBool::new(false),
        }
    }

    /// Identity captured at registration
    pub fn info(&self) -> &SinkInfo {
        &self.info
    }

    pub fn sink(&self) -> &Arc<dyn PacketSink> {
        &self.sink
    }

    /// Whether the cached window was already replayed to this sink
    pub fn is_replayed(&self) -> bool {
        self.replayed.load(Ordering::Acquire)
    }

    pub(super) fn mark_replayed(&self) {
        self.replayed.store(true, Ordering::Release);
    }

    /// Whether this registration wraps the given sink object
    pub fn wraps(&self, sink: &Arc<dyn PacketSink>) -> bool {
        Arc::as_ptr(&self.sink).cast::<()>() == Arc::as_ptr(sink).cast::<()>()
    }
}

impl std::fmt::Debug for SinkRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkRegistration")
            .field("info", &self.info)
            .field("replayed", &self.is_replayed())
            .finish()
    }
}
