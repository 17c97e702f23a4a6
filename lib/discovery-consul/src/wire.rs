//! Consul agent JSON payloads

use discovery_core::{RegistrationRecord, ServiceEntry};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AgentServiceRegistration<'a> {
    #[serde(rename = "ID")]
    pub id: &'a str,
    pub name: &'a str,
    pub address: &'a str,
    pub port: u16,
    pub check: AgentServiceCheck<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AgentServiceCheck<'a> {
    #[serde(rename = "HTTP")]
    pub http: &'a str,
    pub interval: String,
    pub timeout: String,
    pub deregister_critical_service_after: String,
}

impl<'a> From<&'a RegistrationRecord> for AgentServiceRegistration<'a> {
    fn from(record: &'a RegistrationRecord) -> Self {
        let identity = &record.identity;
        let check = &record.health_check;
        Self {
            id: identity.id(),
            name: identity.name(),
            address: identity.address(),
            port: identity.port(),
            check: AgentServiceCheck {
                http: check.http_url(),
                interval: go_duration(check.interval()),
                timeout: go_duration(check.timeout()),
                deregister_critical_service_after: go_duration(check.deregister_critical_after()),
            },
        }
    }
}

/// Element of the `/v1/health/service/{name}` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct HealthServiceEntry {
    #[serde(default)]
    pub node: Option<HealthNode>,
    pub service: HealthService,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct HealthNode {
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct HealthService {
    #[serde(rename = "ID")]
    pub id: String,
    pub service: String,
    #[serde(default)]
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl From<HealthServiceEntry> for ServiceEntry {
    fn from(entry: HealthServiceEntry) -> Self {
        let (node_name, agent_address) = match entry.node {
            Some(node) => (
                node.node.filter(|n| !n.is_empty()),
                node.address.filter(|a| !a.trim().is_empty()),
            ),
            None => (None, None),
        };

        ServiceEntry {
            service_id: entry.service.id,
            service_name: entry.service.service,
            service_address: entry.service.address,
            port: entry.service.port,
            agent_address,
            node_name,
            tags: entry.service.tags.unwrap_or_default(),
        }
    }
}

/// Render a duration the way Consul parses it ("15s", "500ms", "250us"),
/// in the coarsest unit that loses no precision
pub(crate) fn go_duration(duration: Duration) -> String {
    let nanos = duration.subsec_nanos();
    if nanos == 0 {
        format!("{}s", duration.as_secs())
    } else if nanos % 1_000_000 == 0 {
        format!("{}ms", duration.as_millis())
    } else if nanos % 1_000 == 0 {
        format!("{}us", duration.as_micros())
    } else {
        format!("{}ns", duration.as_nanos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use discovery_core::{HealthCheckSpec, ServiceIdentity};

    #[test]
    fn test_go_duration() {
        assert_eq!(go_duration(Duration::from_secs(15)), "15s");
        assert_eq!(go_duration(Duration::from_millis(1500)), "1500ms");
    }

    #[test]
    fn test_go_duration_sub_millisecond() {
        assert_eq!(go_duration(Duration::from_micros(500)), "500us");
        assert_eq!(go_duration(Duration::from_micros(1_000_250)), "1000250us");
        assert_eq!(go_duration(Duration::from_nanos(1_500)), "1500ns");
    }

    #[test]
    fn test_registration_payload() {
        let identity = ServiceIdentity::new("value-1", "ValueService", "10.0.0.5", 8080).unwrap();
        let check = HealthCheckSpec::new(&identity, "api/values/healthcheck").unwrap();
        let record = RegistrationRecord::new(identity, check);

        let value = serde_json::to_value(AgentServiceRegistration::from(&record)).unwrap();
        assert_eq!(value["ID"], "value-1");
        assert_eq!(value["Name"], "ValueService");
        assert_eq!(value["Address"], "10.0.0.5");
        assert_eq!(value["Port"], 8080);
        assert_eq!(value["Check"]["HTTP"], "http://10.0.0.5:8080/api/values/healthcheck");
        assert_eq!(value["Check"]["Interval"], "15s");
        assert_eq!(value["Check"]["Timeout"], "5s");
        assert_eq!(value["Check"]["DeregisterCriticalServiceAfter"], "30s");
    }

    #[test]
    fn test_health_entry_mapping() {
        let raw = r#"{
            "Node": {"Node": "node-a", "Address": "172.17.0.9", "Datacenter": "dc1"},
            "Service": {"ID": "value-1", "Service": "ValueService", "Address": "10.0.0.5", "Port": 8080, "Tags": null},
            "Checks": []
        }"#;
        let entry: ServiceEntry = serde_json::from_str::<HealthServiceEntry>(raw).unwrap().into();
        assert_eq!(entry.service_id, "value-1");
        assert_eq!(entry.service_name, "ValueService");
        assert_eq!(entry.service_address, "10.0.0.5");
        assert_eq!(entry.port, 8080);
        assert_eq!(entry.agent_address.as_deref(), Some("172.17.0.9"));
        assert_eq!(entry.node_name.as_deref(), Some("node-a"));
        assert!(entry.tags.is_empty());
    }

    #[test]
    fn test_blank_node_address_is_absent() {
        let raw = r#"{
            "Node": {"Node": "node-a", "Address": ""},
            "Service": {"ID": "value-1", "Service": "ValueService", "Address": "10.0.0.5", "Port": 8080}
        }"#;
        let entry: ServiceEntry = serde_json::from_str::<HealthServiceEntry>(raw).unwrap().into();
        assert_eq!(entry.agent_address, None);
    }
}
