//! Tracing bootstrap shared by the uptime-mon binaries.

mod subscriber;

pub use subscriber::{LogFormat, init};
