//! Gateway configuration

use anyhow::{Context, Result};
use discovery_resolver::HostSelection;
use serde::Deserialize;

pub const CONFIG_PATH_VAR: &str = "GATEWAY_CONFIG";

/// Which entry address the gateway routes to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostSource {
    #[default]
    Agent,
    Service,
}

impl From<HostSource> for HostSelection {
    fn from(source: HostSource) -> Self {
        match source {
            HostSource::Agent => HostSelection::AgentAddress,
            HostSource::Service => HostSelection::ServiceAddress,
        }
    }
}

/// One prefix-to-service mapping
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RouteConfig {
    /// Path prefix the gateway accepts, e.g. `/values`
    pub upstream_prefix: String,
    /// Logical service name looked up in the registry
    pub service_name: String,
    /// Prefix substituted for `upstream_prefix` when forwarding
    #[serde(default)]
    pub downstream_prefix: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub port: u16,
    pub registry_address: String,
    pub registry_token: Option<String>,
    pub host_source: HostSource,
    pub request_timeout_secs: u64,
    pub routes: Vec<RouteConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            registry_address: "http://localhost:8500".to_string(),
            registry_token: None,
            host_source: HostSource::default(),
            request_timeout_secs: 30,
            routes: Vec::new(),
        }
    }
}

impl GatewayConfig {
    /// Load from the file named by `GATEWAY_CONFIG` (if set), then apply env overrides
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read gateway config {}", path))?;
                Self::from_yaml_str(&raw)?
            }
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).context("Invalid gateway configuration")
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("GATEWAY_PORT") {
            self.port = port
                .parse()
                .with_context(|| format!("Invalid GATEWAY_PORT {:?}", port))?;
        }
        if let Some(address) = lookup("REGISTRY_ADDRESS") {
            self.registry_address = address;
        }
        if let Some(token) = lookup("REGISTRY_TOKEN") {
            self.registry_token = Some(token);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
port: 5000
registry_address: http://consul:8500
routes:
  - upstream_prefix: /values
    service_name: ValueService
    downstream_prefix: /api/values
"#;

    #[test]
    fn test_from_yaml() {
        let config = GatewayConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.host_source, HostSource::Agent);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(
            config.routes,
            vec![RouteConfig {
                upstream_prefix: "/values".to_string(),
                service_name: "ValueService".to_string(),
                downstream_prefix: "/api/values".to_string(),
            }]
        );
    }

    #[test]
    fn test_host_source() {
        let config = GatewayConfig::from_yaml_str("host_source: service").unwrap();
        assert_eq!(config.host_source, HostSource::Service);
        assert!(matches!(
            HostSelection::from(config.host_source),
            HostSelection::ServiceAddress
        ));
    }

    #[test]
    fn test_overrides() {
        let mut config = GatewayConfig::from_yaml_str(SAMPLE).unwrap();
        config
            .apply_overrides(|key| match key {
                "GATEWAY_PORT" => Some("7000".to_string()),
                "REGISTRY_ADDRESS" => Some("http://10.0.0.2:8500".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.registry_address, "http://10.0.0.2:8500");
    }

    #[test]
    fn test_bad_port_override() {
        let mut config = GatewayConfig::default();
        let result = config.apply_overrides(|key| (key == "GATEWAY_PORT").then(|| "x".to_string()));
        assert!(result.is_err());
    }
}
