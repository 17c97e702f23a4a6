//! Health check contract published alongside a registration

use crate::{ServiceIdentity, ValidationError};
use std::time::Duration;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_DEREGISTER_CRITICAL_AFTER: Duration = Duration::from_secs(30);

/// HTTP probe the registry runs against a registered instance
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HealthCheckSpec {
    /// Full probe URL, e.g. `http://10.0.0.5:8080/api/values/healthcheck`
    http_url: String,
    /// Interval between probes
    interval: Duration,
    /// Timeout for a single probe
    timeout: Duration,
    /// How long the check may stay critical before the registry drops the entry
    deregister_critical_after: Duration,
}

impl HealthCheckSpec {
    /// Build a probe for `identity` at `endpoint` with the default timings
    pub fn new(identity: &ServiceIdentity, endpoint: &str) -> Result<Self, ValidationError> {
        Self::with_timings(
            identity,
            endpoint,
            DEFAULT_INTERVAL,
            DEFAULT_TIMEOUT,
            DEFAULT_DEREGISTER_CRITICAL_AFTER,
        )
    }

    /// Build a probe with explicit timings.
    ///
    /// Rejects a timeout that is not below the interval, and a deregister
    /// threshold that would fire before one full interval has elapsed.
    pub fn with_timings(
        identity: &ServiceIdentity,
        endpoint: &str,
        interval: Duration,
        timeout: Duration,
        deregister_critical_after: Duration,
    ) -> Result<Self, ValidationError> {
        if interval.is_zero() {
            return Err(ValidationError::ZeroDuration("interval"));
        }
        if timeout.is_zero() {
            return Err(ValidationError::ZeroDuration("timeout"));
        }
        if timeout >= interval {
            return Err(ValidationError::TimeoutNotBelowInterval { timeout, interval });
        }
        if deregister_critical_after < interval {
            return Err(ValidationError::DeregisterBeforeInterval {
                deregister_after: deregister_critical_after,
                interval,
            });
        }

        Ok(Self {
            http_url: Self::probe_url(identity, endpoint),
            interval,
            timeout,
            deregister_critical_after,
        })
    }

    fn probe_url(identity: &ServiceIdentity, endpoint: &str) -> String {
        format!(
            "http://{}:{}/{}",
            identity.address(),
            identity.port(),
            endpoint.trim_start_matches('/')
        )
    }

    pub fn http_url(&self) -> &str {
        &self.http_url
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn deregister_critical_after(&self) -> Duration {
        self.deregister_critical_after
    }
}
