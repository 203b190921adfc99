// Proxy worker — owns the configuration, cache store, and network
// source, and implements the install/activate/fetch/message handlers the
// event harness drives.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::dispatcher::{classify, RequestClass};
use super::lifecycle::LifecycleState;
use super::{document, image};
use crate::config::WorkerConfig;
use crate::control::{self, ControlMessage, ControlReply};
use crate::http::{ProxyRequest, ProxyResponse};
use crate::source::traits::RemoteSource;
use crate::store::manager::CacheStore;

/// Result of asking the worker to handle an intercepted request.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The worker produced the response.
    Response(ProxyResponse),
    /// Not intercepted; the caller applies default network behavior.
    Passthrough,
}

pub struct ProxyWorker {
    config: WorkerConfig,
    store: CacheStore,
    source: Arc<dyn RemoteSource>,
    state: RwLock<LifecycleState>,
}

impl ProxyWorker {
    pub fn new(config: WorkerConfig, source: Arc<dyn RemoteSource>) -> Self {
        let store = CacheStore::new(config.cache_dir.clone());
        Self {
            config,
            store,
            source,
            state: RwLock::new(LifecycleState::Installing),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    /// Install: pre-populate the document generation with every core
    /// file. All-or-nothing: nothing is written until every fetch has
    /// succeeded, and any failure aborts the whole transition.
    pub async fn install(&self) -> Result<()> {
        *self.state.write() = LifecycleState::Installing;
        info!("installing worker, caching core files");

        let documents = self.store.open(&self.config.document_cache)?;

        let mut fetched = Vec::new();
        for path in self.config.core_files() {
            let url = self.config.url_for(&path)?;
            let response = self.source.fetch("GET", url.as_str()).await?;
            if !response.is_success() {
                return Err(anyhow!(
                    "core file fetch failed: HTTP {} for {}",
                    response.status,
                    url
                ));
            }
            fetched.push((url, response));
        }
        for (url, response) in &fetched {
            documents.put("GET", url.as_str(), response)?;
        }

        *self.state.write() = LifecycleState::Installed;
        info!("core files cached, worker installed");
        Ok(())
    }

    /// Activate: garbage-collect every generation left over from prior
    /// deployments, keeping only the two configured names.
    pub async fn activate(&self) -> Result<()> {
        *self.state.write() = LifecycleState::Activating;

        let keep = [
            self.config.document_cache.as_str(),
            self.config.image_cache.as_str(),
        ];
        for name in self.store.generation_names()? {
            if keep.contains(&name.as_str()) {
                continue;
            }
            // A failed deletion is skipped; it must not hold up the rest
            // of the cleanup.
            if let Err(e) = self.store.delete(&name) {
                warn!("failed to delete stale generation {}: {}", name, e);
            }
        }

        *self.state.write() = LifecycleState::Active;
        info!("worker activated");
        Ok(())
    }

    /// Handle one intercepted request. Classification is synchronous;
    /// only the chosen strategy suspends.
    pub async fn handle_fetch(&self, request: &ProxyRequest) -> Result<FetchOutcome> {
        match classify(request, &self.config) {
            RequestClass::CrossOrigin | RequestClass::Other => Ok(FetchOutcome::Passthrough),
            RequestClass::Image => {
                let images = self.store.open(&self.config.image_cache)?;
                let response = image::serve(&images, self.source.as_ref(), request).await?;
                Ok(FetchOutcome::Response(response))
            }
            RequestClass::Document => {
                let documents = self.store.open(&self.config.document_cache)?;
                let response = document::serve(&documents, self.source.as_ref(), request).await?;
                Ok(FetchOutcome::Response(response))
            }
        }
    }

    /// Handle a control message from the page. Unrecognized payloads get
    /// no reply at all.
    pub async fn handle_message(&self, payload: &Value) -> Option<ControlReply> {
        let message = ControlMessage::parse(payload)?;
        debug!("control message: {:?}", message);
        let reply = match message {
            ControlMessage::CacheImages { urls } => {
                control::cache_images(&self.store, &self.config, self.source.as_ref(), &urls)
                    .await
            }
            ControlMessage::ClearCache => control::clear_caches(&self.store, &self.config).await,
        };
        Some(reply)
    }
}
