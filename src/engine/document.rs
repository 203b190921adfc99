// Network-first document strategy.

use anyhow::Result;
use tracing::{debug, warn};

use crate::http::{ProxyRequest, ProxyResponse};
use crate::source::traits::RemoteSource;
use crate::store::generation::CacheGeneration;

/// Serve a navigable document network-first: fresh content whenever the
/// network answers, the last stored copy when it does not. With an empty
/// cache a network failure propagates to the caller.
pub async fn serve(
    documents: &CacheGeneration,
    source: &dyn RemoteSource,
    request: &ProxyRequest,
) -> Result<ProxyResponse> {
    let url = request.url.as_str();

    match source.fetch(&request.method, url).await {
        Ok(response) => {
            // Success-range responses refresh the stored copy; error
            // statuses are returned but never overwrite a good copy. The
            // write runs off the response path.
            if response.is_success() {
                let generation = documents.clone();
                let method = request.method.clone();
                let stored_url = url.to_string();
                let copy = response.clone();
                tokio::spawn(async move {
                    if let Err(e) = generation.put(&method, &stored_url, &copy) {
                        warn!("document cache write failed url={}: {}", stored_url, e);
                    }
                });
            }
            Ok(response)
        }
        Err(e) => {
            debug!("network failed, trying document cache url={}", url);
            match documents.lookup(&request.method, url)? {
                Some(cached) => Ok(cached),
                None => Err(e),
            }
        }
    }
}
