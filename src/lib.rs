// Offline-first caching proxy engine for a small static site.
//
// Same-origin requests are intercepted and routed between two cache
// strategies: images are served cache-first out of a dedicated
// generation, documents network-first with a stale fallback. A
// message-based control channel lets the hosting page batch-populate or
// clear the caches, and deployments rotate cache generations by name.

pub mod config;
pub mod control;
pub mod engine;
pub mod http;
pub mod server;
pub mod source;
pub mod store;

use std::sync::Once;

use tracing::info;
use tracing_subscriber::EnvFilter;

static INIT_TRACING: Once = Once::new();

/// Initialize tracing once for the whole process.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();

        info!("proxy engine tracing initialized");
    });
}
