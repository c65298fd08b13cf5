//! Attachment byte retrieval.

use url::Url;

use crate::config::StorageConfig;
use crate::providers::sanitize_http_error_body;

/// Errors from fetching attachment bytes.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Transport failure.
    #[error("storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Base URL or object path did not form a valid URL.
    #[error("invalid storage url: {0}")]
    InvalidUrl(String),

    /// Non-2xx response.
    #[error("storage returned HTTP {status}: {body}")]
    HttpStatus {
        /// Status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
}

/// Object storage holding attachment bytes.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the object at `key`.
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StorageError>;
}

/// Storage REST API client: `GET {base_url}/storage/v1/object/{bucket}/{key}`.
#[derive(Clone)]
pub struct HttpObjectStore {
    base_url: Url,
    bucket: String,
    service_key: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpObjectStore")
            .field("base_url", &self.base_url.as_str())
            .field("bucket", &self.bucket)
            .field(
                "service_key",
                &self.service_key.as_ref().map(|_| "__REDACTED__"),
            )
            .finish()
    }
}

impl HttpObjectStore {
    /// Build a store from configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` when `base_url` does not parse.
    pub fn from_config(config: &StorageConfig, client: reqwest::Client) -> Result<Self, StorageError> {
        let mut base = config.base_url.trim().to_owned();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| StorageError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            base_url,
            bucket: config.bucket.clone(),
            service_key: config.service_key.clone(),
            client,
        })
    }

    /// Full object URL for `key`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` when the joined path is not a valid URL.
    pub fn object_url(&self, key: &str) -> Result<Url, StorageError> {
        let path = format!(
            "storage/v1/object/{}/{}",
            self.bucket.trim_matches('/'),
            key.trim_start_matches('/')
        );
        self.base_url
            .join(&path)
            .map_err(|e| StorageError::InvalidUrl(e.to_string()))
    }
}

#[async_trait::async_trait]
impl ObjectStore for HttpObjectStore {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let mut request = self.client.get(self.object_url(key)?);
        if let Some(token) = &self.service_key {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::HttpStatus {
                status: status.as_u16(),
                body: sanitize_http_error_body(&body),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}
