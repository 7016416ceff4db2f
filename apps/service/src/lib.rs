//! uptime-mon - a lightweight uptime monitor for a small fixed set of sites.
//!
//! Each configured test is probed on a shared interval. Consecutive failures
//! are counted per network variant and an alert is sent once a streak reaches
//! the test's threshold, followed by a single recovery message on the next
//! success.

pub mod config;
pub mod monitoring;
pub mod notifications;
pub mod validation;

#[cfg(test)]
mod test_support;
