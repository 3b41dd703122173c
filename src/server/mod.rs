//! Connection supervision for transport front ends
//!
//! Transports own sockets and protocol handling; the relay only asks that
//! each connection task run under [`supervise`], so a failure inside it ends
//! as a clean close of that connection's handle instead of a silent stop.

pub mod supervisor;

pub use supervisor::supervise;
