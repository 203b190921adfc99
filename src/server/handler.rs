// Axum interception surface — translates site HTTP requests into worker
// fetch events.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use axum::{
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tracing::{debug, error};
use url::Url;

use crate::engine::lifecycle::WorkerSlot;
use crate::engine::worker::FetchOutcome;
use crate::http::{Destination, ProxyRequest, ProxyResponse};
use crate::source::traits::RemoteSource;

// Hop-by-hop headers that must not be replayed onto a buffered response.
const SKIPPED_HEADERS: &[&str] = &["connection", "transfer-encoding", "content-length"];

#[derive(Clone)]
struct ServerState {
    slot: WorkerSlot,
    direct: Arc<dyn RemoteSource>,
    site: Url,
}

pub struct ProxyServer {
    port: u16,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl ProxyServer {
    /// Start the interception server on a random port, fronting `site`.
    /// Requests go through whichever worker holds the slot; with no
    /// worker deployed, everything is forwarded directly.
    pub async fn start(
        slot: WorkerSlot,
        direct: Arc<dyn RemoteSource>,
        site: Url,
    ) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let state = ServerState { slot, direct, site };
        let app = Router::new().fallback(intercept_handler).with_state(state);

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Ok(Self {
            port,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Build a URL for a site path through the proxy.
    pub fn url_for(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    /// Shutdown the server gracefully.
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Every request lands here; the worker in the slot decides whether it
/// is intercepted or passed through.
async fn intercept_handler(
    State(state): State<ServerState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let request = match build_request(&state.site, &method, &uri, &headers) {
        Ok(request) => request,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, format!("bad request: {e}")).into_response();
        }
    };

    let handle = state.slot.read().clone();
    let outcome = match handle {
        Some(handle) => handle.fetch(request.clone()).await,
        // No worker controls the site yet; plain network behavior.
        None => Ok(FetchOutcome::Passthrough),
    };

    match outcome {
        Ok(FetchOutcome::Response(response)) => proxy_response(response),
        Ok(FetchOutcome::Passthrough) => {
            match state.direct.fetch(&request.method, request.url.as_str()).await {
                Ok(response) => proxy_response(response),
                Err(e) => {
                    debug!("passthrough fetch failed url={}: {}", request.url, e);
                    (StatusCode::BAD_GATEWAY, format!("upstream error: {e}")).into_response()
                }
            }
        }
        Err(e) => {
            error!("fetch failed with no cached fallback url={}: {}", request.url, e);
            (StatusCode::BAD_GATEWAY, format!("fetch failed: {e}")).into_response()
        }
    }
}

/// Rebuild the absolute target URL on the fronted site and pick up the
/// declared destination.
fn build_request(
    site: &Url,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
) -> Result<ProxyRequest> {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = site
        .join(path)
        .map_err(|e| anyhow!("cannot resolve {path} against site origin: {e}"))?;

    let destination = Destination::parse(
        headers
            .get("sec-fetch-dest")
            .and_then(|value| value.to_str().ok()),
    );

    Ok(ProxyRequest {
        method: method.as_str().to_string(),
        url,
        destination,
    })
}

/// Convert an engine response into an axum response.
fn proxy_response(response: ProxyResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut headers = HeaderMap::new();
    for (name, value) in &response.headers {
        if SKIPPED_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) =
            (name.parse::<HeaderName>(), value.parse::<HeaderValue>())
        {
            headers.insert(name, value);
        }
    }

    (status, headers, response.body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    fn site() -> Url {
        Url::parse("http://127.0.0.1:9000").unwrap()
    }

    #[test]
    fn test_build_request_joins_site_origin() {
        let request = build_request(
            &site(),
            &Method::GET,
            &"/site/index.html?x=1".parse().unwrap(),
            &HeaderMap::new(),
        )
        .unwrap();
        assert_eq!(
            request.url.as_str(),
            "http://127.0.0.1:9000/site/index.html?x=1"
        );
        assert_eq!(request.destination, Destination::Other);
    }

    #[test]
    fn test_build_request_reads_destination() {
        let mut headers = HeaderMap::new();
        headers.insert("sec-fetch-dest", "document".parse().unwrap());
        let request =
            build_request(&site(), &Method::GET, &"/".parse().unwrap(), &headers).unwrap();
        assert_eq!(request.destination, Destination::Document);
    }

    #[test]
    fn test_proxy_response_skips_hop_by_hop_headers() {
        let response = proxy_response(ProxyResponse {
            status: 200,
            headers: vec![
                ("Content-Type".to_string(), "text/html".to_string()),
                ("Transfer-Encoding".to_string(), "chunked".to_string()),
            ],
            body: bytes::Bytes::from_static(b"ok"),
        });
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html"
        );
        assert!(response.headers().get(header::TRANSFER_ENCODING).is_none());
    }
}
