//! Forwarding requests to a resolved downstream

use anyhow::Result;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderMap, HeaderValue, HOST};
use hyper::{Request, Response, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::tokio::TokioExecutor;
use std::time::Duration;
use tokio::time::timeout as tokio_timeout;
use tracing::{debug, warn};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// HTTP forwarder with connection pooling and a per-request timeout
pub struct RequestForwarder {
    client: Client<HttpConnector, Full<Bytes>>,
    timeout: Duration,
}

impl RequestForwarder {
    pub fn new(timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeout));
        connector.set_keepalive(Some(Duration::from_secs(30)));

        let client = Client::builder(TokioExecutor::new()).build::<_, Full<Bytes>>(connector);

        Self { client, timeout }
    }

    /// Forward `request` to `target_url`, tagging it with `request_id`.
    ///
    /// Backend failures become 502/504 responses; only malformed input is an error.
    pub async fn forward(
        &self,
        target_url: &str,
        request: Request<Incoming>,
        request_id: &str,
    ) -> Result<Response<Full<Bytes>>> {
        let uri: Uri = target_url.parse()?;
        let (mut parts, incoming) = request.into_parts();
        let body = incoming.collect().await?.to_bytes();

        let mut headers = Self::filter_headers(&parts.headers);
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_str(request_id)?);
        parts.headers = headers;
        parts.uri = uri;

        debug!("Forwarding {} {} ({})", parts.method, target_url, request_id);
        let forwarded = Request::from_parts(parts, Full::new(body));

        match tokio_timeout(self.timeout, self.client.request(forwarded)).await {
            Ok(Ok(response)) => {
                let (parts, body) = response.into_parts();
                let bytes = body.collect().await?.to_bytes();
                Ok(Response::from_parts(parts, Full::new(bytes)))
            }
            Ok(Err(e)) => {
                warn!("Downstream request to {} failed: {}", target_url, e);
                Ok(error_response(
                    StatusCode::BAD_GATEWAY,
                    "Error communicating with downstream service\n",
                ))
            }
            Err(_) => {
                warn!("Downstream request to {} timed out after {:?}", target_url, self.timeout);
                Ok(error_response(
                    StatusCode::GATEWAY_TIMEOUT,
                    "Downstream service request timeout\n",
                ))
            }
        }
    }

    /// Drop hop-by-hop headers and `Host`, which the client sets for the downstream
    fn filter_headers(headers: &HeaderMap) -> HeaderMap {
        let mut filtered = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            if *name == HOST || is_hop_by_hop_header(name.as_str()) {
                continue;
            }
            filtered.append(name.clone(), value.clone());
        }
        filtered
    }
}

/// Plain-text response with the given status
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(message.to_string())));
    *response.status_mut() = status;
    response
}

fn is_hop_by_hop_header(name: &str) -> bool {
    matches!(
        name,
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
    )
}
