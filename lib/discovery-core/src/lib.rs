//! Core service discovery types
//!
//! This library provides:
//! - The service identity, health check and registration record model
//! - Registry entries as reported back by the registry, and resolved downstreams
//! - The `RegistryClient` capability and an in-memory registry implementing it

pub mod client;
pub mod endpoint;
pub mod entry;
pub mod error;
pub mod health_check;
pub mod identity;
pub mod registration;
pub mod registry;

pub use client::RegistryClient;
pub use endpoint::ResolvedDownstream;
pub use entry::ServiceEntry;
pub use error::{RegistryError, Result, ValidationError};
pub use health_check::HealthCheckSpec;
pub use identity::ServiceIdentity;
pub use registration::RegistrationRecord;
pub use registry::InMemoryRegistry;
