//! HTTP client for the remote church backend. Read-only routes fall back to
//! built-in mock payloads when the backend is missing or misbehaving.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, warn};

use flock_types::api::{DataSource, Proxied};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote backend is not configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote answered {0}")]
    Status(StatusCode),
}

#[derive(Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: Option<String>,
}

impl RemoteClient {
    pub fn new(base_url: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {}", e))?;

        Ok(Self {
            http,
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
        })
    }

    /// A client with no backend; every call takes the fallback path.
    pub fn disabled() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: None,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    fn url(&self, path: &str) -> Result<String, RemoteError> {
        let base = self.base_url.as_deref().ok_or(RemoteError::NotConfigured)?;
        Ok(format!("{}{}", base, path))
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RemoteError> {
        let url = self.url(path)?;
        debug!("GET {}", url);
        let response = self.http.get(&url).query(query).send().await?;
        Self::decode(response).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, RemoteError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        debug!("POST {}", url);
        let response = self.http.post(&url).json(body).send().await?;
        Self::decode(response).await
    }

    /// POST where only the status matters; the response body is discarded.
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), RemoteError> {
        let url = self.url(path)?;
        debug!("POST {}", url);
        let status = self.http.post(&url).json(body).send().await?.status();
        if status.is_success() { Ok(()) } else { Err(RemoteError::Status(status)) }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RemoteError> {
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status));
        }
        Ok(response.json::<T>().await?)
    }

    /// Fetches `path` from the backend, or returns `mock()` tagged as such.
    pub async fn get_or_mock<T, F>(&self, path: &str, query: &[(&str, &str)], mock: F) -> Proxied<T>
    where
        T: DeserializeOwned,
        F: FnOnce() -> T,
    {
        match self.get_json(path, query).await {
            Ok(data) => Proxied { source: DataSource::Remote, data },
            Err(RemoteError::NotConfigured) => Proxied { source: DataSource::Mock, data: mock() },
            Err(e) => {
                warn!("Remote GET {} failed, serving mock: {}", path, e);
                Proxied { source: DataSource::Mock, data: mock() }
            }
        }
    }
}
