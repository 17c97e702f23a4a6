use anyhow::Result;
use discovery_consul::{ConsulClient, ConsulConfig};
use discovery_lifecycle::{RegistrationLifecycleManager, ServiceConfig};
use http_body_util::Full;
use hyper::{body::Bytes, header, server::conn::http1, service::service_fn, Request, Response};
use hyper_util::rt::tokio::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod api;

use api::{ValuesApi, REQUEST_ID_HEADER};

const REGISTRY_CALL_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = ServiceConfig::from_env()?;
    let identity = config.identity()?;
    let health_check = config.health_check(&identity)?;
    info!(
        "Starting {} as {} on {}:{}",
        identity.name(),
        identity.id(),
        identity.address(),
        identity.port()
    );

    let client = ConsulClient::new(ConsulConfig {
        address: config.registry_address.clone(),
        token: config.registry_token.clone(),
        request_timeout: REGISTRY_CALL_TIMEOUT,
    })?;
    let mut lifecycle =
        RegistrationLifecycleManager::new(Arc::new(client)).with_call_timeout(REGISTRY_CALL_TIMEOUT);

    let api = Arc::new(ValuesApi::new(identity.name(), &config.health_check_endpoint));
    let addr: SocketAddr = ([0, 0, 0, 0], identity.port()).into();
    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_for_shutdown(shutdown.clone()));

    // Registry failures are reported by the manager and never block startup
    lifecycle.start(identity, health_check, &shutdown).await;

    serve(listener, api, shutdown).await;

    // A fresh token: the shutdown signal must not abort deregistration
    lifecycle.stop(&CancellationToken::new()).await;
    info!("Shutdown complete");
    Ok(())
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

async fn watch_for_shutdown(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
    shutdown.cancel();
}

/// Accept connections until `shutdown` fires
async fn serve(listener: TcpListener, api: Arc<ValuesApi>, shutdown: CancellationToken) {
    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        let (stream, peer_addr) = match accepted {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Error accepting connection: {}", e);
                continue;
            }
        };
        let io = TokioIo::new(stream);
        let api = api.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let api = api.clone();
                handle_request(req, api)
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Error serving HTTP connection from {}: {}", peer_addr, e);
            }
        });
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    api: Arc<ValuesApi>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok());

    debug!("{} {}", req.method(), req.uri().path());
    let (status, body) = api.respond(req.method(), req.uri().path(), host, request_id);

    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    Ok(response)
}
