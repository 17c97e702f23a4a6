use anyhow::Result;
use discovery_consul::{ConsulClient, ConsulConfig};
use discovery_resolver::{DownstreamProvider, DownstreamResolver, RoundRobin};
use http_body_util::Full;
use hyper::{body::Bytes, server::conn::http1, service::service_fn, Request, Response, StatusCode};
use hyper_util::rt::tokio::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod config;
mod forwarder;
mod routes;

use config::GatewayConfig;
use forwarder::{error_response, RequestForwarder, REQUEST_ID_HEADER};
use routes::RouteTable;

/// Shared per-connection state
struct Gateway {
    routes: RouteTable,
    provider: DownstreamProvider,
    picker: RoundRobin,
    forwarder: RequestForwarder,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Starting discovery-gateway...");
    let config = GatewayConfig::from_env()?;

    let client = ConsulClient::new(ConsulConfig {
        address: config.registry_address.clone(),
        token: config.registry_token.clone(),
        ..ConsulConfig::default()
    })?;
    info!("Registry client initialized for {}", client.base_url());

    let resolver = DownstreamResolver::new(config.host_source.into());
    info!("Downstream host selection: {:?}", resolver.selection());

    let routes = RouteTable::new(config.routes.clone());
    info!("Route table loaded with {} routes", routes.len());

    let gateway = Arc::new(Gateway {
        routes,
        provider: DownstreamProvider::new(Arc::new(client), resolver),
        picker: RoundRobin::new(),
        forwarder: RequestForwarder::new(Duration::from_secs(config.request_timeout_secs)),
    });

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Error accepting connection: {}", e);
                continue;
            }
        };
        let io = TokioIo::new(stream);
        let gateway = gateway.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let gateway = gateway.clone();
                handle_request(req, gateway)
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Error serving HTTP connection from {}: {}", peer_addr, e);
            }
        });
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false) {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    gateway: Arc<Gateway>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    debug!("{} {}", req.method(), path_and_query);

    if req.uri().path() == "/healthz" {
        return Ok(error_response(StatusCode::OK, "OK\n"));
    }

    let matched = match gateway.routes.match_path(&path_and_query) {
        Some(matched) => matched,
        None => {
            return Ok(error_response(
                StatusCode::NOT_FOUND,
                &format!("Not Found: no route for {}\n", req.uri().path()),
            ))
        }
    };

    let downstreams = match gateway.provider.downstreams(matched.service_name).await {
        Ok(downstreams) => downstreams,
        Err(e) => {
            warn!("Registry lookup for {} failed: {}", matched.service_name, e);
            return Ok(error_response(
                StatusCode::BAD_GATEWAY,
                &format!("Bad Gateway: registry lookup for {} failed\n", matched.service_name),
            ));
        }
    };

    let downstream = match gateway.picker.select(&downstreams) {
        Some(downstream) => downstream,
        None => {
            warn!("No available downstreams for {}", matched.service_name);
            return Ok(error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                &format!("Service Unavailable: no downstreams for {}\n", matched.service_name),
            ));
        }
    };

    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let target_url = downstream.target_url(&matched.downstream_path);

    match gateway.forwarder.forward(&target_url, req, &request_id).await {
        Ok(response) => Ok(response),
        Err(e) => {
            warn!("Failed to forward {} to {}: {}", request_id, target_url, e);
            Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error\n",
            ))
        }
    }
}
