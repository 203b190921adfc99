// Control channel — out-of-band commands posted by the hosting page,
// acknowledged over a single-use reply channel.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::WorkerConfig;
use crate::source::traits::RemoteSource;
use crate::store::manager::CacheStore;

/// Recognized page-to-worker commands.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Batch-populate the image generation with the given absolute URLs.
    #[serde(rename = "CACHE_IMAGES")]
    CacheImages { urls: Vec<String> },
    /// Drop both managed generations.
    #[serde(rename = "CLEAR_CACHE")]
    ClearCache,
}

impl ControlMessage {
    /// Parse a raw page message. Unrecognized shapes yield `None` and are
    /// ignored without a reply.
    pub fn parse(payload: &Value) -> Option<Self> {
        serde_json::from_value(payload.clone()).ok()
    }
}

/// Acknowledgement posted back on the reply channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ControlReply {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Fetch and store every URL in the batch. Per-URL failures are logged
/// and skipped; the batch itself always runs to completion and reports
/// overall success. Only a failure in the coordination step (opening the
/// generation) produces a failure reply.
pub(crate) async fn cache_images(
    store: &CacheStore,
    config: &WorkerConfig,
    source: &dyn RemoteSource,
    urls: &[String],
) -> ControlReply {
    let images = match store.open(&config.image_cache) {
        Ok(generation) => generation,
        Err(e) => return ControlReply::failed(e.to_string()),
    };

    info!("batch caching {} images", urls.len());
    let fetches = urls.iter().map(|url| {
        let images = images.clone();
        async move {
            match source.fetch("GET", url).await {
                Ok(response) if response.is_ok() => {
                    if let Err(e) = images.put("GET", url, &response) {
                        warn!("batch cache write failed url={}: {}", url, e);
                    }
                }
                Ok(response) => {
                    debug!("batch cache skipped url={} status={}", url, response.status);
                }
                Err(e) => {
                    warn!("batch cache fetch failed url={}: {}", url, e);
                }
            }
        }
    });
    join_all(fetches).await;

    info!("batch caching completed");
    ControlReply::ok()
}

/// Delete exactly the two managed generations. A failed deletion is
/// reported in the reply rather than dropping the acknowledgement.
pub(crate) async fn clear_caches(store: &CacheStore, config: &WorkerConfig) -> ControlReply {
    for name in [&config.document_cache, &config.image_cache] {
        if let Err(e) = store.delete(name) {
            return ControlReply::failed(format!("failed to delete {name}: {e}"));
        }
    }
    info!("all managed caches cleared");
    ControlReply::ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_cache_images() {
        let message = ControlMessage::parse(&json!({
            "type": "CACHE_IMAGES",
            "urls": ["http://127.0.0.1:8080/img/a.png"],
        }));
        assert_eq!(
            message,
            Some(ControlMessage::CacheImages {
                urls: vec!["http://127.0.0.1:8080/img/a.png".to_string()],
            })
        );
    }

    #[test]
    fn test_parse_clear_cache() {
        let message = ControlMessage::parse(&json!({ "type": "CLEAR_CACHE" }));
        assert_eq!(message, Some(ControlMessage::ClearCache));
    }

    #[test]
    fn test_unrecognized_shapes_are_ignored() {
        assert_eq!(ControlMessage::parse(&json!({ "type": "REFRESH" })), None);
        assert_eq!(ControlMessage::parse(&json!({ "urls": [] })), None);
        assert_eq!(ControlMessage::parse(&json!("CLEAR_CACHE")), None);
        assert_eq!(ControlMessage::parse(&json!(null)), None);
        // CACHE_IMAGES without its payload is not a valid command.
        assert_eq!(
            ControlMessage::parse(&json!({ "type": "CACHE_IMAGES" })),
            None
        );
    }

    #[test]
    fn test_reply_wire_shape() {
        assert_eq!(
            serde_json::to_string(&ControlReply::ok()).unwrap(),
            r#"{"success":true}"#
        );
        assert_eq!(
            serde_json::to_string(&ControlReply::failed("boom")).unwrap(),
            r#"{"success":false,"error":"boom"}"#
        );
    }
}
