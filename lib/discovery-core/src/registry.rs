//! In-memory registry for local runs and tests

use crate::{RegistrationRecord, RegistryClient, Result, ServiceEntry};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// InMemoryRegistry keeps entries keyed by instance id.
///
/// Every entry is reported as hosted on a single agent whose address is set
/// with [`InMemoryRegistry::with_agent_address`].
#[derive(Clone)]
pub struct InMemoryRegistry {
    // Map of service_id to entry
    entries: Arc<RwLock<HashMap<String, ServiceEntry>>>,
    agent_address: Option<String>,
    node_name: Option<String>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            agent_address: None,
            node_name: None,
        }
    }

    /// Report entries as hosted on an agent at `address`
    pub fn with_agent_address(mut self, address: impl Into<String>) -> Self {
        self.agent_address = Some(address.into());
        self
    }

    pub fn with_node_name(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = Some(node_name.into());
        self
    }

    /// Insert a raw entry, bypassing registration
    pub async fn insert_entry(&self, entry: ServiceEntry) {
        let mut entries = self.entries.write().await;
        entries.insert(entry.service_id.clone(), entry);
    }

    /// Get an entry by instance id
    pub async fn get_entry(&self, service_id: &str) -> Option<ServiceEntry> {
        let entries = self.entries.read().await;
        entries.get(service_id).cloned()
    }

    /// Get count of registered entries
    pub async fn entry_count(&self) -> usize {
        let entries = self.entries.read().await;
        entries.len()
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistryClient for InMemoryRegistry {
    async fn register(&self, record: &RegistrationRecord) -> Result<()> {
        let identity = &record.identity;
        let entry = ServiceEntry {
            service_id: identity.id().to_string(),
            service_name: identity.name().to_string(),
            service_address: identity.address().to_string(),
            port: identity.port(),
            agent_address: self.agent_address.clone(),
            node_name: self.node_name.clone(),
            tags: Vec::new(),
        };

        let mut entries = self.entries.write().await;
        entries.insert(entry.service_id.clone(), entry);

        debug!("Registered service instance: {}", identity.id());
        Ok(())
    }

    async fn deregister(&self, service_id: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.remove(service_id).is_some() {
            debug!("Deregistered service instance: {}", service_id);
        } else {
            debug!("Deregister of unknown service instance ignored: {}", service_id);
        }
        Ok(())
    }

    async fn query_entries(&self, service_name: &str) -> Result<Vec<ServiceEntry>> {
        let entries = self.entries.read().await;
        let mut matching: Vec<ServiceEntry> = entries
            .values()
            .filter(|e| e.service_name == service_name)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.service_id.cmp(&b.service_id));
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HealthCheckSpec, ServiceIdentity};

    fn record(id: &str, name: &str, port: u16) -> RegistrationRecord {
        let identity = ServiceIdentity::new(id, name, "10.0.0.5", port).unwrap();
        let health_check = HealthCheckSpec::new(&identity, "healthz").unwrap();
        RegistrationRecord::new(identity, health_check)
    }

    #[tokio::test]
    async fn test_register_and_query() {
        let registry = InMemoryRegistry::new()
            .with_agent_address("172.17.0.9")
            .with_node_name("node-a");
        registry.register(&record("value-1", "ValueService", 8080)).await.unwrap();
        registry.register(&record("other-1", "OtherService", 9090)).await.unwrap();

        let entries = registry.query_entries("ValueService").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].service_id, "value-1");
        assert_eq!(entries[0].service_address, "10.0.0.5");
        assert_eq!(entries[0].agent_address.as_deref(), Some("172.17.0.9"));
        assert_eq!(entries[0].node_name.as_deref(), Some("node-a"));
        assert_eq!(entries[0].port, 8080);
    }

    #[tokio::test]
    async fn test_register_same_id_replaces() {
        let registry = InMemoryRegistry::new();
        registry.register(&record("value-1", "ValueService", 8080)).await.unwrap();
        registry.register(&record("value-1", "ValueService", 8081)).await.unwrap();

        assert_eq!(registry.entry_count().await, 1);
        let entry = registry.get_entry("value-1").await.unwrap();
        assert_eq!(entry.port, 8081);
    }

    #[tokio::test]
    async fn test_deregister_unknown_is_ok() {
        let registry = InMemoryRegistry::new();
        assert!(registry.deregister("missing").await.is_ok());
    }

    #[tokio::test]
    async fn test_deregister_removes_entry() {
        let registry = InMemoryRegistry::new();
        registry.register(&record("value-1", "ValueService", 8080)).await.unwrap();
        registry.deregister("value-1").await.unwrap();
        assert!(registry.query_entries("ValueService").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_sorted_by_id() {
        let registry = InMemoryRegistry::new();
        registry.register(&record("value-2", "ValueService", 8082)).await.unwrap();
        registry.register(&record("value-1", "ValueService", 8081)).await.unwrap();

        let ids: Vec<String> = registry
            .query_entries("ValueService")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.service_id)
            .collect();
        assert_eq!(ids, vec!["value-1", "value-2"]);
    }
}
