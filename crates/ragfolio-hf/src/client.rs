use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use ragfolio_core::{ProviderError, ProviderKind};

/// Authenticated JSON client shared by the Hugging Face collaborators.
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Clone)]
pub struct HfClient {
    http: reqwest::Client,
    token: Option<String>,
}

impl HfClient {
    pub fn new(token: Option<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder().timeout(timeout).build().map_err(|e| ProviderError::Backend {
            provider: ProviderKind::Embedding,
            message: format!("failed to build HTTP client: {}", e),
        })?;
        let token = token.filter(|t| !t.trim().is_empty());
        Ok(Self { http, token })
    }

    pub async fn post_json<T: DeserializeOwned>(
        &self,
        provider: ProviderKind,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T, ProviderError> {
        let request = self.authorize(provider, self.http.post(url))?.json(body);
        self.send(provider, url, request).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, provider: ProviderKind, url: &str) -> Result<T, ProviderError> {
        let request = self.authorize(provider, self.http.get(url))?;
        self.send(provider, url, request).await
    }

    fn authorize(
        &self,
        provider: ProviderKind,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, ProviderError> {
        match &self.token {
            Some(token) => Ok(request.bearer_auth(token)),
            None => Err(ProviderError::Auth { provider, message: "HF_TOKEN is not configured".into() }),
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        provider: ProviderKind,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ProviderError> {
        let response = request.send().await.map_err(|e| map_reqwest_error(provider, e))?;
        let status = response.status();
        debug!(%provider, url, status = status.as_u16(), "hugging face response");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(provider, status.as_u16(), &body));
        }
        response.json::<T>().await.map_err(|e| ProviderError::InvalidResponse {
            provider,
            message: format!("failed to decode body: {}", e),
        })
    }
}

fn map_reqwest_error(provider: ProviderKind, e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Network { provider, message: format!("request timed out: {}", e) }
    } else if e.is_connect() {
        ProviderError::Network { provider, message: format!("connection failed: {}", e) }
    } else {
        ProviderError::Network { provider, message: e.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HfEmbedder;
    use ragfolio_core::traits::Embedder;

    // nothing listens on port 1
    const CLOSED: &str = "http://127.0.0.1:1";

    #[tokio::test]
    async fn missing_token_is_auth_error_for_the_calling_provider() {
        let client = HfClient::new(Some("  ".into()), Duration::from_secs(1)).unwrap();
        let err = client.get_json::<serde_json::Value>(ProviderKind::KnowledgeBase, CLOSED).await.unwrap_err();
        assert!(matches!(err, ProviderError::Auth { provider: ProviderKind::KnowledgeBase, .. }));
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        let client = HfClient::new(Some("t".into()), Duration::from_secs(2)).unwrap();
        let err = client
            .post_json::<serde_json::Value>(ProviderKind::Translation, CLOSED, &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Network { provider: ProviderKind::Translation, .. }));
    }

    #[tokio::test]
    async fn empty_embedding_batch_makes_no_request() {
        let client = HfClient::new(None, Duration::from_secs(1)).unwrap();
        let embedder = HfEmbedder::new(client, CLOSED, "m", 3);
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
    }
}
