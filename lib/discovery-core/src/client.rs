//! Registry client capability

use crate::{RegistrationRecord, Result, ServiceEntry};
use async_trait::async_trait;

/// Operations the lifecycle manager and the gateway need from a registry.
///
/// `deregister` of an id the registry does not know must succeed.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Register or replace the entry described by `record`
    async fn register(&self, record: &RegistrationRecord) -> Result<()>;

    /// Remove the entry with the given instance id
    async fn deregister(&self, service_id: &str) -> Result<()>;

    /// List the current entries for a logical service name
    async fn query_entries(&self, service_name: &str) -> Result<Vec<ServiceEntry>>;
}
