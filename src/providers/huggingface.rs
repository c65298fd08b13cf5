//! Hosted text-generation inference provider.
//!
//! Speaks the `POST {base_url}/models/{model}` text-generation API. A model
//! that is cold on the hosting side answers with
//! `{"error": "Model ... is currently loading", "estimated_time": 20.0}`,
//! usually with status 503; that case surfaces as
//! [`ProviderError::ModelLoading`] so the caller can fall back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    sanitize_http_error_body, CompletionRequest, CompletionResponse, LlmProvider, ProviderError,
};

/// Default inference API base URL.
pub const DEFAULT_INFERENCE_URL: &str = "https://api-inference.huggingface.co";

/// Text-generation request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct GenerationRequest {
    /// Full prompt text.
    pub inputs: String,
    /// Generation parameters.
    pub parameters: GenerationParameters,
}

/// Text-generation parameters.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct GenerationParameters {
    /// Maximum new tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_new_tokens: Option<u32>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Exclude the prompt from `generated_text`.
    pub return_full_text: bool,
}

#[derive(Debug, Deserialize)]
struct Generation {
    generated_text: String,
}

/// Hosted text-generation provider.
#[derive(Clone)]
pub struct HuggingFaceProvider {
    /// Base URL for the inference API.
    #[doc(hidden)]
    pub base_url: String,
    /// Model repository id.
    #[doc(hidden)]
    pub model: String,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for HuggingFaceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"__REDACTED__")
            .finish()
    }
}

impl HuggingFaceProvider {
    /// Create a provider for `model` served at `base_url`.
    pub fn new(base_url: String, model: String, api_key: String, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            model,
            api_key,
            client,
        }
    }

    /// Endpoint URL for the configured model.
    pub fn endpoint(&self) -> String {
        format!("{}/models/{}", self.base_url, self.model)
    }
}

/// Build the request body, folding the system prompt into the input text.
#[doc(hidden)]
pub fn build_request(request: &CompletionRequest) -> GenerationRequest {
    let inputs = match &request.system {
        Some(system) => format!("{system}\n\n{}", request.prompt),
        None => request.prompt.clone(),
    };
    GenerationRequest {
        inputs,
        parameters: GenerationParameters {
            max_new_tokens: request.max_tokens,
            temperature: request.temperature,
            return_full_text: false,
        },
    }
}

/// Returns the loading estimate when `body` is a "model is loading" payload.
fn loading_signal(body: &str) -> Option<Option<f64>> {
    let value: Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?.as_str()?;
    if !error.to_lowercase().contains("loading") {
        return None;
    }
    Some(value.get("estimated_time").and_then(Value::as_f64))
}

/// Interpret a raw HTTP status and body.
///
/// # Errors
///
/// Returns `ModelLoading` for loading payloads, `HttpStatus` for other
/// non-2xx responses, and `Parse` when no generated text can be found.
#[doc(hidden)]
pub fn parse_response(status: u16, body: &str, model: &str) -> Result<CompletionResponse, ProviderError> {
    if let Some(estimated_secs) = loading_signal(body) {
        return Err(ProviderError::ModelLoading { estimated_secs });
    }
    if !(200..300).contains(&status) {
        return Err(ProviderError::HttpStatus {
            status,
            body: sanitize_http_error_body(body),
        });
    }

    let value: Value =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    let first = match value {
        Value::Array(items) => items.into_iter().next(),
        other @ Value::Object(_) => Some(other),
        _ => None,
    };
    let Some(first) = first else {
        return Err(ProviderError::Parse("no generated_text in response".to_owned()));
    };
    let generation: Generation =
        serde_json::from_value(first).map_err(|e| ProviderError::Parse(e.to_string()))?;

    Ok(CompletionResponse {
        text: generation.generated_text,
        model: model.to_owned(),
    })
}

#[async_trait::async_trait]
impl LlmProvider for HuggingFaceProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let body = build_request(&request);
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let payload = response.text().await?;
        parse_response(status, &payload, &self.model)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
