//! Consul agent client implementing `RegistryClient`

use crate::wire::{AgentServiceRegistration, HealthServiceEntry};
use async_trait::async_trait;
use discovery_core::{RegistrationRecord, RegistryClient, RegistryError, Result, ServiceEntry};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use std::time::Duration;
use tracing::debug;

const TOKEN_HEADER: &str = "X-Consul-Token";

/// Consul client configuration
#[derive(Clone, Debug)]
pub struct ConsulConfig {
    /// Agent base URL, e.g. `http://localhost:8500`
    pub address: String,
    /// Optional ACL token
    pub token: Option<String>,
    /// Timeout applied to every agent request
    pub request_timeout: Duration,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            address: "http://localhost:8500".to_string(),
            token: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// ConsulClient talks to a local Consul agent over its HTTP API
pub struct ConsulClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
    request_timeout: Duration,
}

impl ConsulClient {
    /// Create a new Consul client
    pub fn new(config: ConsulConfig) -> Result<Self> {
        let base = Url::parse(&config.address).map_err(|e| {
            RegistryError::Transport(format!("invalid registry address {}: {}", config.address, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(RegistryError::Transport(format!(
                "registry address {} cannot be used as a base URL",
                config.address
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base,
            token: config.token,
            request_timeout: config.request_timeout,
        })
    }

    /// Agent base URL
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // Checked in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        self.authorize(request).send().await.map_err(|e| {
            if e.is_timeout() {
                RegistryError::Timeout(self.request_timeout)
            } else {
                RegistryError::Transport(e.to_string())
            }
        })
    }

    async fn unexpected(response: Response) -> RegistryError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        RegistryError::UnexpectedStatus { status, body }
    }
}

#[async_trait]
impl RegistryClient for ConsulClient {
    async fn register(&self, record: &RegistrationRecord) -> Result<()> {
        let url = self.endpoint(&["v1", "agent", "service", "register"]);
        let payload = AgentServiceRegistration::from(record);

        debug!("Registering {} with Consul at {}", record.id(), url);
        let response = self.send(self.http.put(url).json(&payload)).await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::unexpected(response).await)
        }
    }

    async fn deregister(&self, service_id: &str) -> Result<()> {
        let url = self.endpoint(&["v1", "agent", "service", "deregister", service_id]);

        debug!("Deregistering {} from Consul at {}", service_id, url);
        let response = self.send(self.http.put(url)).await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            // Newer agents answer 404 for ids they do not know
            StatusCode::NOT_FOUND => {
                debug!("Consul did not know service {}, nothing to deregister", service_id);
                Ok(())
            }
            _ => Err(Self::unexpected(response).await),
        }
    }

    async fn query_entries(&self, service_name: &str) -> Result<Vec<ServiceEntry>> {
        let url = self.endpoint(&["v1", "health", "service", service_name]);

        let response = self
            .send(self.http.get(url).query(&[("passing", "true")]))
            .await?;
        if !response.status().is_success() {
            return Err(Self::unexpected(response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;
        let entries: Vec<HealthServiceEntry> =
            serde_json::from_str(&body).map_err(|e| RegistryError::Decode(e.to_string()))?;

        debug!("Consul returned {} entries for {}", entries.len(), service_name);
        Ok(entries.into_iter().map(ServiceEntry::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use discovery_core::{HealthCheckSpec, ServiceIdentity};
    use http_body_util::{BodyExt, Full};
    use hyper::body::{Bytes, Incoming};
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::{Request, Response as HyperResponse};
    use hyper_util::rt::TokioIo;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    #[derive(Clone, Debug)]
    struct Captured {
        method: String,
        uri: String,
        token: Option<String>,
        body: String,
    }

    type Responder = Arc<dyn Fn(&str, &str) -> (u16, String) + Send + Sync>;

    /// Start a fake Consul agent on a random local port
    async fn spawn_agent(responder: Responder) -> (String, Arc<Mutex<Vec<Captured>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let captured = Arc::new(Mutex::new(Vec::new()));
        let log = captured.clone();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let log = log.clone();
                let responder = responder.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let log = log.clone();
                        let responder = responder.clone();
                        async move {
                            let method = req.method().to_string();
                            let uri = req.uri().to_string();
                            let token = req
                                .headers()
                                .get("x-consul-token")
                                .and_then(|v| v.to_str().ok())
                                .map(String::from);
                            let body = req.into_body().collect().await?.to_bytes();
                            let (status, reply) = responder(&method, &uri);
                            log.lock().unwrap().push(Captured {
                                method,
                                uri,
                                token,
                                body: String::from_utf8_lossy(&body).to_string(),
                            });
                            Ok::<_, hyper::Error>(
                                HyperResponse::builder()
                                    .status(status)
                                    .body(Full::new(Bytes::from(reply)))
                                    .unwrap(),
                            )
                        }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        (format!("http://{}", addr), captured)
    }

    fn client(address: String, token: Option<&str>) -> ConsulClient {
        ConsulClient::new(ConsulConfig {
            address,
            token: token.map(String::from),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn record() -> RegistrationRecord {
        let identity = ServiceIdentity::new("value-1", "ValueService", "10.0.0.5", 8080).unwrap();
        let check = HealthCheckSpec::new(&identity, "api/values/healthcheck").unwrap();
        RegistrationRecord::new(identity, check)
    }

    #[test]
    fn test_invalid_address_rejected() {
        let result = ConsulClient::new(ConsulConfig {
            address: "not a url".to_string(),
            ..ConsulConfig::default()
        });
        assert!(matches!(result, Err(RegistryError::Transport(_))));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = client("http://consul.local:8500/proxy/".to_string(), None);
        let url = client.endpoint(&["v1", "agent", "service", "deregister", "value-1"]);
        assert_eq!(
            url.as_str(),
            "http://consul.local:8500/proxy/v1/agent/service/deregister/value-1"
        );
    }

    #[tokio::test]
    async fn test_register_sends_payload_and_token() {
        let (address, captured) = spawn_agent(Arc::new(|_: &str, _: &str| (200, String::new()))).await;
        let client = client(address, Some("secret"));

        client.register(&record()).await.unwrap();

        let requests = captured.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "PUT");
        assert_eq!(requests[0].uri, "/v1/agent/service/register");
        assert_eq!(requests[0].token.as_deref(), Some("secret"));

        let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(body["ID"], "value-1");
        assert_eq!(body["Check"]["DeregisterCriticalServiceAfter"], "30s");
    }

    #[tokio::test]
    async fn test_register_error_status() {
        let (address, _) = spawn_agent(Arc::new(|_: &str, _: &str| (500, "boom".to_string()))).await;
        let client = client(address, None);

        let err = client.register(&record()).await.unwrap_err();
        match err {
            RegistryError::UnexpectedStatus { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_deregister_unknown_id_is_ok() {
        let (address, captured) =
            spawn_agent(Arc::new(|_: &str, _: &str| (404, "Unknown service ID".to_string()))).await;
        let client = client(address, None);

        client.deregister("value-1").await.unwrap();

        let requests = captured.lock().unwrap().clone();
        assert_eq!(requests[0].method, "PUT");
        assert_eq!(requests[0].uri, "/v1/agent/service/deregister/value-1");
    }

    #[tokio::test]
    async fn test_query_entries() {
        let reply = r#"[
            {"Node": {"Node": "node-a", "Address": "172.17.0.9"},
             "Service": {"ID": "value-1", "Service": "ValueService", "Address": "10.0.0.5", "Port": 8080, "Tags": ["v1"]}},
            {"Node": {"Node": "node-b", "Address": ""},
             "Service": {"ID": "value-2", "Service": "ValueService", "Address": "10.0.0.6", "Port": 8081}}
        ]"#
        .to_string();
        let (address, captured) = spawn_agent(Arc::new(move |_: &str, _: &str| (200, reply.clone()))).await;
        let client = client(address, None);

        let entries = client.query_entries("ValueService").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].agent_address.as_deref(), Some("172.17.0.9"));
        assert_eq!(entries[0].tags, vec!["v1".to_string()]);
        assert_eq!(entries[1].agent_address, None);

        let requests = captured.lock().unwrap().clone();
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].uri, "/v1/health/service/ValueService?passing=true");
    }

    #[tokio::test]
    async fn test_query_entries_bad_json() {
        let (address, _) = spawn_agent(Arc::new(|_: &str, _: &str| (200, "{not json".to_string()))).await;
        let client = client(address, None);

        let err = client.query_entries("ValueService").await.unwrap_err();
        assert!(matches!(err, RegistryError::Decode(_)));
    }

    #[tokio::test]
    async fn test_unreachable_agent_is_transport_error() {
        // Bind then drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client(format!("http://{}", addr), None);
        let err = client.deregister("value-1").await.unwrap_err();
        assert!(matches!(err, RegistryError::Transport(_)));
    }
}
