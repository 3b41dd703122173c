//! Statistics and status reporting

pub mod metrics;
pub mod status;

pub use metrics::{StreamMetrics, StreamStats};
pub use status::{StatusEntry, StatusReport};
