// Cache-first image strategy.

use anyhow::Result;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::http::{ProxyRequest, ProxyResponse};
use crate::source::traits::RemoteSource;
use crate::store::generation::CacheGeneration;

const PLACEHOLDER_WIDTH: u32 = 200;
const PLACEHOLDER_HEIGHT: u32 = 120;

/// Serve an image cache-first: a stored copy wins outright with no
/// freshness check, a miss goes to the network, and a dead network
/// degrades to an inline placeholder instead of a failure.
pub async fn serve(
    images: &CacheGeneration,
    source: &dyn RemoteSource,
    request: &ProxyRequest,
) -> Result<ProxyResponse> {
    let url = request.url.as_str();

    if let Some(cached) = images.lookup(&request.method, url)? {
        debug!("image served from cache url={}", url);
        return Ok(cached);
    }

    match source.fetch(&request.method, url).await {
        Ok(response) => {
            // Exactly 200 gets stored; 404s and friends pass through
            // uncached.
            if response.is_ok() {
                if let Err(e) = images.put(&request.method, url, &response) {
                    warn!("image cache write failed url={}: {}", url, e);
                }
            }
            Ok(response)
        }
        Err(e) => {
            debug!("image fetch failed, serving placeholder url={}: {}", url, e);
            Ok(placeholder())
        }
    }
}

/// Fixed-size vector placeholder served when the network is down and the
/// cache has nothing.
pub fn placeholder() -> ProxyResponse {
    let svg = format!(
        concat!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" ",
            "viewBox=\"0 0 {w} {h}\">",
            "<rect fill=\"#f0f0f0\" width=\"{w}\" height=\"{h}\"/>",
            "<text x=\"50%\" y=\"50%\" font-family=\"Arial\" font-size=\"12\" fill=\"#999\" ",
            "text-anchor=\"middle\" dominant-baseline=\"middle\">Network error</text>",
            "</svg>"
        ),
        w = PLACEHOLDER_WIDTH,
        h = PLACEHOLDER_HEIGHT,
    );
    ProxyResponse {
        status: 200,
        headers: vec![("Content-Type".to_string(), "image/svg+xml".to_string())],
        body: Bytes::from(svg),
    }
}
