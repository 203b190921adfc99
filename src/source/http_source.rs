use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::debug;

use super::traits::RemoteSource;
use crate::http::ProxyResponse;

pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteSource for HttpSource {
    async fn fetch(&self, method: &str, url: &str) -> Result<ProxyResponse> {
        let method = Method::from_bytes(method.as_bytes())?;
        let resp = self.client.request(method, url).send().await?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = resp.bytes().await?;

        debug!("remote fetch status={} url={}", status, url);
        Ok(ProxyResponse {
            status,
            headers,
            body,
        })
    }
}
