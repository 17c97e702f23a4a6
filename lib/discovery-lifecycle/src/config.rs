//! Service-side configuration: identity, registry endpoint and health check

use discovery_core::{HealthCheckSpec, ServiceIdentity, ValidationError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Env var naming an optional YAML config file
pub const CONFIG_PATH_VAR: &str = "SERVICE_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid service configuration: {0}")]
    Invalid(#[from] ValidationError),
}

/// Health check timings, in whole seconds
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckTimings {
    pub interval_secs: u64,
    pub timeout_secs: u64,
    pub deregister_after_secs: u64,
}

impl Default for HealthCheckTimings {
    fn default() -> Self {
        Self {
            interval_secs: 15,
            timeout_secs: 5,
            deregister_after_secs: 30,
        }
    }
}

/// Configuration for one service instance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Unique instance id; generated from `name` when absent
    pub id: Option<String>,
    /// Logical service name
    pub name: String,
    /// Address the instance is reachable at
    pub address: String,
    pub port: u16,
    /// Registry agent base URL
    pub registry_address: String,
    pub registry_token: Option<String>,
    /// Path of the health endpoint, relative to the service root
    pub health_check_endpoint: String,
    pub health_check: HealthCheckTimings,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            address: String::new(),
            port: 0,
            registry_address: "http://localhost:8500".to_string(),
            registry_token: None,
            health_check_endpoint: "api/values/healthcheck".to_string(),
            health_check: HealthCheckTimings::default(),
        }
    }
}

impl ServiceConfig {
    /// Load from the file named by `SERVICE_CONFIG` (if set), then apply env overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.ensure_id();
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Override fields from `lookup`, keyed by env var name
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("SERVICE_ID") {
            self.id = Some(id);
        }
        if let Some(name) = lookup("SERVICE_NAME") {
            self.name = name;
        }
        if let Some(address) = lookup("SERVICE_ADDRESS") {
            self.address = address;
        }
        if let Some(port) = lookup("SERVICE_PORT") {
            self.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "SERVICE_PORT",
                value: port.clone(),
            })?;
        }
        if let Some(address) = lookup("REGISTRY_ADDRESS") {
            self.registry_address = address;
        }
        if let Some(token) = lookup("REGISTRY_TOKEN") {
            self.registry_token = Some(token);
        }
        if let Some(endpoint) = lookup("HEALTH_CHECK_ENDPOINT") {
            self.health_check_endpoint = endpoint;
        }
        Ok(())
    }

    /// Fill a missing or blank id with `{name}-{uuid}`
    pub fn ensure_id(&mut self) {
        let missing = self.id.as_deref().map_or(true, |id| id.trim().is_empty());
        if missing {
            self.id = Some(format!("{}-{}", self.name, Uuid::new_v4()));
        }
    }

    pub fn identity(&self) -> Result<ServiceIdentity, ConfigError> {
        let id = self.id.clone().unwrap_or_default();
        Ok(ServiceIdentity::new(
            id,
            self.name.clone(),
            self.address.clone(),
            self.port,
        )?)
    }

    pub fn health_check(&self, identity: &ServiceIdentity) -> Result<HealthCheckSpec, ConfigError> {
        let timings = &self.health_check;
        Ok(HealthCheckSpec::with_timings(
            identity,
            &self.health_check_endpoint,
            Duration::from_secs(timings.interval_secs),
            Duration::from_secs(timings.timeout_secs),
            Duration::from_secs(timings.deregister_after_secs),
        )?)
    }
}
