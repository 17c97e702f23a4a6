//! Register/deregister state machine for one service instance

use crate::sink::{LifecycleEvent, LifecycleSink, Phase, Severity, TracingSink};
use discovery_core::{
    HealthCheckSpec, RegistrationRecord, RegistryClient, RegistryError, Result, ServiceIdentity,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Registration state of the owned instance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Unregistered,
    Registering,
    Registered,
    Deregistering,
}

/// Result of [`RegistrationLifecycleManager::start`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    Registered,
    /// A registry call failed; the failure was reported to the sink
    Failed(Phase),
}

/// Result of [`RegistrationLifecycleManager::stop`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopOutcome {
    Deregistered,
    /// Nothing was ever started, so there was no id to withdraw
    Skipped,
    Failed,
}

/// Owns one instance's registry entry.
///
/// `start` and `stop` take `&mut self`, so the host cannot run them
/// concurrently. The record built by `start` is kept until the manager is
/// dropped and its id is what `stop` withdraws.
pub struct RegistrationLifecycleManager {
    client: Arc<dyn RegistryClient>,
    sink: Arc<dyn LifecycleSink>,
    call_timeout: Option<Duration>,
    record: Option<RegistrationRecord>,
    state: LifecycleState,
}

impl RegistrationLifecycleManager {
    /// Create a manager reporting to `tracing`
    pub fn new(client: Arc<dyn RegistryClient>) -> Self {
        Self {
            client,
            sink: Arc::new(TracingSink),
            call_timeout: None,
            record: None,
            state: LifecycleState::Unregistered,
        }
    }

    /// Report lifecycle events to `sink` instead of `tracing`
    pub fn with_sink(mut self, sink: Arc<dyn LifecycleSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Bound every registry call by `timeout`
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Record retained from the last `start`
    pub fn record(&self) -> Option<&RegistrationRecord> {
        self.record.as_ref()
    }

    /// Register the instance, clearing any stale entry with the same id first.
    ///
    /// Never fails from the caller's point of view: a registry failure is
    /// reported to the sink and the instance simply stays undiscoverable.
    pub async fn start(
        &mut self,
        identity: ServiceIdentity,
        health_check: HealthCheckSpec,
        cancel: &CancellationToken,
    ) -> StartOutcome {
        let record = RegistrationRecord::new(identity, health_check);
        let id = record.id().to_string();
        self.record = Some(record.clone());
        self.state = LifecycleState::Registering;

        info!(
            "Registering {} ({}) at {}:{} with health check {}",
            id,
            record.identity.name(),
            record.identity.address(),
            record.identity.port(),
            record.health_check.http_url()
        );

        let cleared = self.guarded(cancel, self.client.deregister(&id)).await;
        if let Err(e) = cleared {
            self.fail(Phase::StaleDeregister, Severity::Warning, &id, e);
            return StartOutcome::Failed(Phase::StaleDeregister);
        }
        debug!("Cleared any stale registry entry for {}", id);

        let registered = self.guarded(cancel, self.client.register(&record)).await;
        if let Err(e) = registered {
            self.fail(Phase::Register, Severity::Error, &id, e);
            return StartOutcome::Failed(Phase::Register);
        }

        self.state = LifecycleState::Registered;
        self.succeed(Phase::Register, &id);
        StartOutcome::Registered
    }

    /// Withdraw the retained registration.
    ///
    /// A no-op when `start` was never called. On failure the registry's own
    /// critical-check expiry eventually removes the entry.
    pub async fn stop(&mut self, cancel: &CancellationToken) -> StopOutcome {
        let id = match &self.record {
            Some(record) => record.id().to_string(),
            None => {
                debug!("No registration retained, nothing to deregister");
                return StopOutcome::Skipped;
            }
        };

        self.state = LifecycleState::Deregistering;
        info!("Deregistering {}", id);

        let withdrawn = self.guarded(cancel, self.client.deregister(&id)).await;
        match withdrawn {
            Ok(()) => {
                self.state = LifecycleState::Unregistered;
                self.succeed(Phase::Deregister, &id);
                StopOutcome::Deregistered
            }
            Err(e) => {
                self.fail(Phase::Deregister, Severity::Error, &id, e);
                StopOutcome::Failed
            }
        }
    }

    /// Run a registry call under the cancellation token and call timeout
    async fn guarded<F>(&self, cancel: &CancellationToken, call: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        let bounded = async {
            match self.call_timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .map_err(|_| RegistryError::Timeout(limit))?,
                None => call.await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RegistryError::Cancelled),
            result = bounded => result,
        }
    }

    fn succeed(&self, phase: Phase, id: &str) {
        self.sink.report(LifecycleEvent {
            severity: Severity::Info,
            phase,
            service_id: id.to_string(),
            error: None,
        });
    }

    fn fail(&mut self, phase: Phase, severity: Severity, id: &str, error: RegistryError) {
        self.state = LifecycleState::Unregistered;
        self.sink.report(LifecycleEvent {
            severity,
            phase,
            service_id: id.to_string(),
            error: Some(error.to_string()),
        });
    }
}
