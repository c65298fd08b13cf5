//! Language-model provider abstraction.
//!
//! Defines the [`LlmProvider`] trait and the request/response types shared
//! by every backend. The model is an unreliable collaborator: callers treat
//! every [`ProviderError`] as an ordinary control-flow branch.
//!
//! Two providers are implemented:
//! - [`huggingface::HuggingFaceProvider`] — hosted text-generation inference API
//! - [`ollama::OllamaProvider`] — Ollama `/api/chat` API

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use crate::config::{LlmConfig, ProviderKind};

pub mod huggingface;
pub mod ollama;

// ---------------------------------------------------------------------------
// Request / Response
// ---------------------------------------------------------------------------

/// A single-turn text completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System instructions, if the backend supports them separately.
    pub system: Option<String>,
    /// The prompt text.
    pub prompt: String,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
}

/// The generated text returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    /// Generated text (prompt excluded).
    pub text: String,
    /// The model identifier that served this response.
    pub model: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by model providers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP transport failure.
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Response did not match expected schema.
    #[error("provider response parse error: {0}")]
    Parse(String),
    /// Upstream provider responded with an error status.
    #[error("provider returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
    /// The hosted model is still being loaded and cannot serve requests yet.
    #[error("model is loading (estimated {estimated_secs:?}s)")]
    ModelLoading {
        /// Estimated seconds until ready, when the provider reports one.
        estimated_secs: Option<f64>,
    },
    /// Provider cannot satisfy the request with current configuration.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// HTTP helpers (shared by all providers)
// ---------------------------------------------------------------------------

/// Check HTTP response status and return body text or a structured error.
///
/// # Errors
///
/// Returns `ProviderError::Request` on transport failure, `ProviderError::HttpStatus` on non-2xx.
pub async fn check_http_response(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ProviderError::HttpStatus {
            status: status.as_u16(),
            body: sanitize_http_error_body(&body),
        });
    }
    Ok(body)
}

/// Collapse whitespace, redact credential-looking tokens, and truncate an
/// upstream error body so it is safe to log.
pub fn sanitize_http_error_body(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut sanitized = collapsed;
    for pattern in [
        r"hf_[A-Za-z0-9]{20,}",
        r"sk-[A-Za-z0-9_\-]{20,}",
        r"eyJ[A-Za-z0-9_\-]{10,}\.[A-Za-z0-9_\-]{10,}\.[A-Za-z0-9_\-]{10,}",
        r"(?i)bearer\s+[A-Za-z0-9._\-]{16,}",
    ] {
        if let Ok(regex) = Regex::new(pattern) {
            sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
        }
    }

    const MAX_ERROR_BODY_CHARS: usize = 256;
    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}

/// Build the shared reqwest client with the configured timeout.
///
/// # Errors
///
/// Returns `ProviderError::Request` if the TLS backend cannot be initialised.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Core LLM provider interface.
///
/// Implementations must be `Send + Sync` so one instance can serve every
/// request handled by the server.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Request a completion from the model.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on API, network, loading, or parse failure.
    async fn complete(&self, request: CompletionRequest)
        -> Result<CompletionResponse, ProviderError>;

    /// The model identifier string this provider is instantiated for.
    fn model_id(&self) -> &str;
}

/// Instantiate the configured provider.
///
/// Returns `Ok(None)` when the configuration cannot reach a model (for
/// example a hosted provider without an API key); classification then runs
/// on the deterministic fallback only.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub fn from_config(config: &LlmConfig) -> Result<Option<Arc<dyn LlmProvider>>, ProviderError> {
    let client = http_client(Duration::from_secs(config.timeout_secs))?;
    match config.provider {
        ProviderKind::None => Ok(None),
        ProviderKind::HuggingFace => {
            let Some(api_key) = config.api_key.clone().filter(|k| !k.trim().is_empty()) else {
                tracing::info!("no inference API key configured, model classification disabled");
                return Ok(None);
            };
            let provider = huggingface::HuggingFaceProvider::new(
                config.base_url.clone(),
                config.model.clone(),
                api_key,
                client,
            );
            Ok(Some(Arc::new(provider)))
        }
        ProviderKind::Ollama => {
            let base_url = if config.base_url == huggingface::DEFAULT_INFERENCE_URL {
                ollama::DEFAULT_OLLAMA_URL.to_owned()
            } else {
                config.base_url.clone()
            };
            let provider = ollama::OllamaProvider::new(base_url, config.model.clone(), client);
            Ok(Some(Arc::new(provider)))
        }
    }
}
