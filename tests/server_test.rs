// End-to-end test for the ProxyServer interception surface.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use bytes::Bytes;
use tokio::net::TcpListener;
use url::Url;

use offline_proxy_engine::config::WorkerConfig;
use offline_proxy_engine::engine::lifecycle::{deploy, empty_slot};
use offline_proxy_engine::engine::worker::ProxyWorker;
use offline_proxy_engine::server::handler::ProxyServer;
use offline_proxy_engine::source::http_source::HttpSource;
use offline_proxy_engine::store::manager::CacheStore;

#[derive(Clone)]
struct Hits(Arc<AtomicUsize>);

async fn logo_handler(State(hits): State<Hits>) -> impl IntoResponse {
    hits.0.fetch_add(1, Ordering::SeqCst);
    (
        [(header::CONTENT_TYPE, "image/png")],
        Bytes::from_static(b"\x89PNG\r\n\x1a\n"),
    )
}

fn site_app(hits: Hits) -> Router {
    Router::new()
        .route("/", get(|| async { Html("<html>home</html>") }))
        .route("/index.html", get(|| async { Html("<html>home</html>") }))
        .route("/sw.js", get(|| async { "// worker script" }))
        .route("/page.html", get(|| async { Html("<html>page</html>") }))
        .route("/style.css", get(|| async { "body {}" }))
        .route("/img/logo.png", get(logo_handler))
        .with_state(hits)
}

async fn start_site(hits: Hits) -> (Url, tokio::sync::oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let app = site_app(hits);
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = rx.await;
            })
            .await
            .ok();
    });
    (
        Url::parse(&format!("http://127.0.0.1:{port}")).unwrap(),
        tx,
    )
}

#[tokio::test]
async fn test_proxy_server_end_to_end() {
    // 1. Start the fake site the proxy fronts.
    let hits = Hits(Arc::new(AtomicUsize::new(0)));
    let (origin, site_shutdown) = start_site(hits.clone()).await;

    // 2. Start the interception server with an empty slot: everything is
    // forwarded directly until a worker is deployed.
    let slot = empty_slot();
    let server = ProxyServer::start(slot.clone(), Arc::new(HttpSource::new()), origin.clone())
        .await
        .unwrap();
    let client = reqwest::Client::new();

    let resp = client
        .get(server.url_for("/page.html"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "<html>page</html>");

    // 3. Deploy a worker; it takes over request handling immediately.
    let dir = tempfile::tempdir().unwrap();
    let config = WorkerConfig::new(origin.clone(), dir.path());
    let worker = ProxyWorker::new(config.clone(), Arc::new(HttpSource::new()));
    deploy(&slot, worker).await.unwrap();

    // 4. A document request is served from the network and recorded in
    // the document generation.
    let resp = client
        .get(server.url_for("/page.html"))
        .header("Sec-Fetch-Dest", "document")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "<html>page</html>");

    let store = CacheStore::new(dir.path());
    let documents = store.open(&config.document_cache).unwrap();
    let page_url = origin.join("/page.html").unwrap();
    for _ in 0..100 {
        if documents.lookup("GET", page_url.as_str()).unwrap().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(documents.lookup("GET", page_url.as_str()).unwrap().is_some());

    // 5. Images are fetched once and then served from cache.
    for _ in 0..2 {
        let resp = client
            .get(server.url_for("/img/logo.png"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }
    assert_eq!(hits.0.load(Ordering::SeqCst), 1);

    // 6. Kill the site: documents degrade to the cached copy.
    site_shutdown.send(()).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let resp = client
        .get(server.url_for("/page.html"))
        .header("Sec-Fetch-Dest", "document")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "<html>page</html>");

    // 7. Unclassified requests pass through and surface the outage.
    let resp = client
        .get(server.url_for("/style.css"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);

    // 8. An uncached image degrades to the inline placeholder.
    let resp = client
        .get(server.url_for("/img/other.png"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/svg+xml"
    );
    let body = resp.text().await.unwrap();
    assert!(body.contains("width=\"200\" height=\"120\""));

    server.shutdown();
}
