//! Consul agent HTTP API client
pub mod client;
mod wire;

pub use client::{ConsulClient, ConsulConfig};
