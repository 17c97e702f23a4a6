//! Registration lifecycle for a single service instance
//!
//! The hosting process calls [`RegistrationLifecycleManager::start`] before it
//! serves traffic and [`RegistrationLifecycleManager::stop`] before it exits.
//! Registry failures on either edge are reported to a [`LifecycleSink`] and
//! never propagate.

pub mod config;
pub mod manager;
pub mod sink;

pub use config::{ConfigError, HealthCheckTimings, ServiceConfig};
pub use manager::{LifecycleState, RegistrationLifecycleManager, StartOutcome, StopOutcome};
pub use sink::{LifecycleEvent, LifecycleSink, Phase, RecordingSink, Severity, TracingSink};
