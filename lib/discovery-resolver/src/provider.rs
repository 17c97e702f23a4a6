//! Gateway-side adapter: query the registry, then resolve

use crate::DownstreamResolver;
use discovery_core::{RegistryClient, ResolvedDownstream, Result};
use std::sync::Arc;
use tracing::debug;

/// Resolves logical service names to downstreams on every call.
///
/// Nothing is cached, so membership changes in the registry show up on the
/// next lookup.
pub struct DownstreamProvider {
    client: Arc<dyn RegistryClient>,
    resolver: DownstreamResolver,
}

impl DownstreamProvider {
    pub fn new(client: Arc<dyn RegistryClient>, resolver: DownstreamResolver) -> Self {
        Self { client, resolver }
    }

    pub fn resolver(&self) -> &DownstreamResolver {
        &self.resolver
    }

    /// Current downstreams for `service_name`; empty when none are resolvable
    pub async fn downstreams(&self, service_name: &str) -> Result<Vec<ResolvedDownstream>> {
        let entries = self.client.query_entries(service_name).await?;
        debug!("Registry returned {} entries for {}", entries.len(), service_name);
        Ok(self.resolver.resolve(&entries))
    }
}
