//! Registration record sent to the registry

use crate::{HealthCheckSpec, ServiceIdentity};

/// Identity plus health check, as handed to `RegistryClient::register`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationRecord {
    pub identity: ServiceIdentity,
    pub health_check: HealthCheckSpec,
}

impl RegistrationRecord {
    pub fn new(identity: ServiceIdentity, health_check: HealthCheckSpec) -> Self {
        Self {
            identity,
            health_check,
        }
    }

    /// Registry-wide id of the instance this record describes
    pub fn id(&self) -> &str {
        self.identity.id()
    }
}
