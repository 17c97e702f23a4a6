//! Resolved downstream endpoints
use std::fmt;
use std::net::Ipv6Addr;

/// A concrete `(host, port)` a gateway may open a connection to
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResolvedDownstream {
    pub host: String,
    pub port: u16,
}

impl ResolvedDownstream {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Build a target URL for forwarding `path_and_query` to this downstream
    pub fn target_url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self, path_and_query)
    }
}

impl fmt::Display for ResolvedDownstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // IPv6 literals need brackets to form a valid authority
        if self.host.parse::<Ipv6Addr>().is_ok() {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
