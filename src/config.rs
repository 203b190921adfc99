use std::path::PathBuf;

use anyhow::Result;
use serde::Deserialize;
use url::Url;

/// Default name of the document cache generation. Bump the version tag on
/// redeploy to orphan previously stored documents.
pub const DOCUMENT_CACHE_NAME: &str = "site-cache-v1";

/// Default name of the image cache generation.
pub const IMAGE_CACHE_NAME: &str = "site-images-v1";

/// Path segment that marks image directories.
pub const IMAGE_PATH_MARKER: &str = "/img/";

/// Image filename extensions served cache-first (case-sensitive).
pub const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg"];

/// Deployment-relative location of the worker script itself.
pub const DEFAULT_SCRIPT_PATH: &str = "/sw.js";

/// Derive the deployment-relative base path from the worker script's own
/// location: drop the script filename and rejoin the rest. Root
/// deployments resolve to `/`.
pub fn resolve_base_path(script_path: &str) -> String {
    match script_path.rsplit_once('/') {
        Some(("", _)) | None => "/".to_string(),
        Some((base, _)) => base.to_string(),
    }
}

/// Join a base path and a base-relative suffix. A root base contributes
/// nothing, so entries stay single-slash same-origin paths.
pub fn join_base(base: &str, suffix: &str) -> String {
    if base == "/" {
        suffix.to_string()
    } else {
        format!("{base}{suffix}")
    }
}

/// Configuration for one proxy worker, built once at startup and passed
/// by reference into every component.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Origin the worker treats as its own; everything else passes
    /// through uncached.
    pub origin: Url,
    /// Deployment-relative path of the worker script; its directory is
    /// the base path for the core file list.
    #[serde(default = "default_script_path")]
    pub script_path: String,
    /// Root directory holding the cache generations.
    pub cache_dir: PathBuf,
    /// Version-tagged name of the document generation.
    #[serde(default = "default_document_cache")]
    pub document_cache: String,
    /// Version-tagged name of the image generation.
    #[serde(default = "default_image_cache")]
    pub image_cache: String,
    /// Path segment that routes a request to the image strategy.
    #[serde(default = "default_image_marker")]
    pub image_path_marker: String,
    /// Filename extensions eligible for the image cache.
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
}

impl WorkerConfig {
    pub fn new(origin: Url, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            origin,
            script_path: default_script_path(),
            cache_dir: cache_dir.into(),
            document_cache: default_document_cache(),
            image_cache: default_image_cache(),
            image_path_marker: default_image_marker(),
            image_extensions: default_image_extensions(),
        }
    }

    /// Base path derived from the script location.
    pub fn base_path(&self) -> String {
        resolve_base_path(&self.script_path)
    }

    /// Ordered list of paths that must be cached before the worker may
    /// activate.
    pub fn core_files(&self) -> Vec<String> {
        let base = self.base_path();
        vec![
            join_base(&base, "/"),
            join_base(&base, "/index.html"),
            self.script_path.clone(),
        ]
    }

    /// Absolute URL for a deployment-relative path on the worker's own
    /// origin.
    pub fn url_for(&self, path: &str) -> Result<Url> {
        Ok(self.origin.join(path)?)
    }
}

fn default_script_path() -> String {
    DEFAULT_SCRIPT_PATH.to_string()
}

fn default_document_cache() -> String {
    DOCUMENT_CACHE_NAME.to_string()
}

fn default_image_cache() -> String {
    IMAGE_CACHE_NAME.to_string()
}

fn default_image_marker() -> String {
    IMAGE_PATH_MARKER.to_string()
}

fn default_image_extensions() -> Vec<String> {
    IMAGE_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()
}
