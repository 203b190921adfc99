// Request classification — decides, before any I/O, which strategy owns
// an intercepted request.

use crate::config::WorkerConfig;
use crate::http::{Destination, ProxyRequest};

/// Outcome of classifying a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Different origin; never intercepted.
    CrossOrigin,
    /// Same-origin image under the image directory marker.
    Image,
    /// Same-origin navigable document.
    Document,
    /// Anything else; default network behavior applies.
    Other,
}

impl RequestClass {
    pub fn intercepted(self) -> bool {
        matches!(self, RequestClass::Image | RequestClass::Document)
    }
}

/// Classify a request. Pure and synchronous: interception is decided
/// before any asynchronous strategy work starts.
pub fn classify(request: &ProxyRequest, config: &WorkerConfig) -> RequestClass {
    if request.url.origin() != config.origin.origin() {
        return RequestClass::CrossOrigin;
    }

    let path = request.url.path();
    if path.contains(config.image_path_marker.as_str())
        && config
            .image_extensions
            .iter()
            .any(|ext| path.ends_with(ext.as_str()))
    {
        return RequestClass::Image;
    }

    if request.destination == Destination::Document {
        return RequestClass::Document;
    }

    RequestClass::Other
}
