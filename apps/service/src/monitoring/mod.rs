pub mod alert;
pub mod checker;
/// Monitoring engine module - probes endpoints and tracks their health
///
/// This module is responsible for:
/// - Executing HTTP/HTTPS probes under an optional address family
/// - Validating responses against the configured expectations
/// - Tracking consecutive failures per network variant
/// - Raising and clearing alerts when a streak crosses its threshold
/// - Scheduling every check on its own cadence
pub mod executor;
pub mod scheduler;
pub mod streak;
pub mod types;
pub mod validation;

pub use checker::{HttpProber, Prober};
pub use executor::CheckExecutor;
pub use scheduler::MonitoringScheduler;
pub use types::{CheckDefinition, CheckFailure, CheckSet, NetworkMode, Variant};
