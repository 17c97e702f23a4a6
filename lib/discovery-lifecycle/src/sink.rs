//! Pluggable reporting of lifecycle events

use std::fmt;
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Registry call a lifecycle event refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Clearing a stale entry before registering
    StaleDeregister,
    Register,
    /// Withdrawing the entry on shutdown
    Deregister,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::StaleDeregister => "stale-deregister",
            Phase::Register => "register",
            Phase::Deregister => "deregister",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One lifecycle report
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub severity: Severity,
    pub phase: Phase,
    pub service_id: String,
    /// Rendered registry error, if the phase failed
    pub error: Option<String>,
}

/// Receiver of lifecycle events
pub trait LifecycleSink: Send + Sync {
    fn report(&self, event: LifecycleEvent);
}

/// Default sink forwarding events to `tracing`
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LifecycleSink for TracingSink {
    fn report(&self, event: LifecycleEvent) {
        let error = event.error.as_deref().unwrap_or("");
        match event.severity {
            Severity::Info => info!(
                service_id = %event.service_id,
                phase = %event.phase,
                "Registry {} succeeded",
                event.phase
            ),
            Severity::Warning => warn!(
                service_id = %event.service_id,
                phase = %event.phase,
                "Registry {} failed: {}",
                event.phase,
                error
            ),
            Severity::Error => error!(
                service_id = %event.service_id,
                phase = %event.phase,
                "Registry {} failed: {}",
                event.phase,
                error
            ),
        }
    }
}

/// Sink that keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events reported so far
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn failures(&self) -> Vec<LifecycleEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.error.is_some())
            .collect()
    }
}

impl LifecycleSink for RecordingSink {
    fn report(&self, event: LifecycleEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
