//! Stream registry and per-stream fan-out
//!
//! The registry maps stream keys to stream instances. Each instance owns one
//! publisher, the attached subscribers, and a late-joiner cache, and runs its
//! own distribution task.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<StreamRegistry>
//!                   ┌──────────────────────────┐
//!                   │ streams: HashMap<Key,    │
//!                   │   Arc<Stream> {          │
//!                   │     source, sinks,       │
//!                   │     cache,               │
//!                   │   }                      │
//!                   │ >                        │
//!                   └────────────┬─────────────┘
//!                                │
//!        ┌───────────────────────┼───────────────────────┐
//!        │                       │                       │
//!        ▼                       ▼                       ▼
//!   handle_publish()       handle_subscribe()       sweep_once()
//!   new / reuse /          attach, create           close dead handles,
//!   takeover               on demand                drop empty streams
//! ```
//!
//! # Takeover
//!
//! Publishing to a key held by a different publisher UID stops the old
//! instance, closes its interval subscribers, and moves every remaining
//! subscriber to a fresh instance that replaces the old one in the map.
//! A publisher reconnecting with the same UID reuses the instance.

pub mod config;
pub mod entry;
pub mod error;
pub mod key;
pub mod store;
pub mod stream;

pub use config::RegistryConfig;
pub use entry::{SinkRegistration, StreamState};
pub use error::RegistryError;
pub use key::StreamKey;
pub use store::StreamRegistry;
pub use stream::Stream;
