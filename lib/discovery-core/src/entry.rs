//! Registry entries as reported by the registry

use serde::{Deserialize, Serialize};

/// One resolved instance of a logical service.
///
/// `service_address` is whatever the instance registered, which may only be
/// meaningful inside the instance's own network. `agent_address` is the
/// address of the registry agent/node hosting the entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub service_id: String,
    pub service_name: String,
    pub service_address: String,
    pub port: u16,
    pub agent_address: Option<String>,
    pub node_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ServiceEntry {
    pub fn new(
        service_id: impl Into<String>,
        service_name: impl Into<String>,
        service_address: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            service_name: service_name.into(),
            service_address: service_address.into(),
            port,
            agent_address: None,
            node_name: None,
            tags: Vec::new(),
        }
    }

    pub fn with_agent_address(mut self, agent_address: impl Into<String>) -> Self {
        self.agent_address = Some(agent_address.into());
        self
    }

    pub fn with_node_name(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = Some(node_name.into());
        self
    }
}
