//! Values API served by the demo service

use hyper::{Method, StatusCode};
use tracing::info;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request routing for the values API and the health endpoint
pub struct ValuesApi {
    service_name: String,
    health_path: String,
}

impl ValuesApi {
    pub fn new(service_name: impl Into<String>, health_check_endpoint: &str) -> Self {
        Self {
            service_name: service_name.into(),
            health_path: format!("/{}", health_check_endpoint.trim_start_matches('/')),
        }
    }

    pub fn health_path(&self) -> &str {
        &self.health_path
    }

    /// Produce the status and body for a request
    pub fn respond(
        &self,
        method: &Method,
        path: &str,
        host: &str,
        request_id: Option<&str>,
    ) -> (StatusCode, String) {
        if *method != Method::GET {
            return (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed\n".to_string());
        }

        if path == self.health_path {
            let msg = format!("{} is healthy", host);
            info!("{}", msg);
            return (StatusCode::OK, msg);
        }

        match path.trim_end_matches('/') {
            "" => (StatusCode::OK, self.service_name.clone()),
            "/api/values" => {
                let msg = format!(
                    "Url: http://{}, Method: {}, Path: {}, RequestId: {}",
                    host,
                    method,
                    path,
                    request_id.unwrap_or("N/A")
                );
                info!("{}", msg);
                (StatusCode::OK, msg)
            }
            "/api/values/status" => {
                let msg = format!("Running on {}", host);
                info!("{}", msg);
                (StatusCode::OK, msg)
            }
            "/api/values/badcode" => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Some bad code was executed!".to_string(),
            ),
            _ => (StatusCode::NOT_FOUND, format!("Not Found: {}\n", path)),
        }
    }
}
