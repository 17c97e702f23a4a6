//! Downstream resolution for the gateway
pub mod provider;
pub mod resolver;
pub mod round_robin;

pub use provider::DownstreamProvider;
pub use resolver::{DownstreamResolver, HostSelection, ResolveError};
pub use round_robin::RoundRobin;
