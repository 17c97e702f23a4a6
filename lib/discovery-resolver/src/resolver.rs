//! Turning registry entries into routable downstreams

use discovery_core::{ResolvedDownstream, ServiceEntry};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

type HostFn = dyn Fn(&ServiceEntry) -> Option<String> + Send + Sync;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Entry {service_id} has no usable host")]
    MissingHost { service_id: String },
}

/// Which address of an entry becomes the downstream host
#[derive(Clone, Default)]
pub enum HostSelection {
    /// Address of the registry agent/node hosting the entry
    #[default]
    AgentAddress,
    /// Address the instance registered itself with
    ServiceAddress,
    /// Caller-supplied selection
    Custom(Arc<HostFn>),
}

impl HostSelection {
    /// Wrap a closure as a custom selection
    pub fn custom<F>(select: F) -> Self
    where
        F: Fn(&ServiceEntry) -> Option<String> + Send + Sync + 'static,
    {
        HostSelection::Custom(Arc::new(select))
    }

    fn select(&self, entry: &ServiceEntry) -> Option<String> {
        let host = match self {
            HostSelection::AgentAddress => entry.agent_address.clone(),
            HostSelection::ServiceAddress => Some(entry.service_address.clone()),
            HostSelection::Custom(select) => select(entry),
        };
        host.map(|h| h.trim().to_string()).filter(|h| !h.is_empty())
    }
}

impl fmt::Debug for HostSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostSelection::AgentAddress => f.write_str("AgentAddress"),
            HostSelection::ServiceAddress => f.write_str("ServiceAddress"),
            HostSelection::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Stateless resolver from registry entries to downstreams.
///
/// The host comes from the configured [`HostSelection`]; the port is always
/// the registry-recorded service port. Entries without a usable host are
/// dropped rather than routed.
#[derive(Clone, Debug, Default)]
pub struct DownstreamResolver {
    selection: HostSelection,
}

impl DownstreamResolver {
    pub fn new(selection: HostSelection) -> Self {
        Self { selection }
    }

    pub fn selection(&self) -> &HostSelection {
        &self.selection
    }

    /// Resolve a single entry
    pub fn resolve_entry(&self, entry: &ServiceEntry) -> Result<ResolvedDownstream, ResolveError> {
        self.selection
            .select(entry)
            .map(|host| ResolvedDownstream::new(host, entry.port))
            .ok_or_else(|| ResolveError::MissingHost {
                service_id: entry.service_id.clone(),
            })
    }

    /// Resolve every entry, excluding those that cannot be resolved
    pub fn resolve(&self, entries: &[ServiceEntry]) -> Vec<ResolvedDownstream> {
        let downstreams: Vec<ResolvedDownstream> = entries
            .iter()
            .filter_map(|entry| match self.resolve_entry(entry) {
                Ok(downstream) => Some(downstream),
                Err(e) => {
                    warn!("Excluding registry entry from routing: {}", e);
                    None
                }
            })
            .collect();

        debug!(
            "Resolved {} of {} registry entries",
            downstreams.len(),
            entries.len()
        );
        downstreams
    }
}
