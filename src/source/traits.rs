use anyhow::Result;
use async_trait::async_trait;

use crate::http::ProxyResponse;

#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Perform one network fetch. Transport failures are errors; any HTTP
    /// status, success or not, resolves to a response carrying that
    /// status.
    async fn fetch(&self, method: &str, url: &str) -> Result<ProxyResponse>;
}
