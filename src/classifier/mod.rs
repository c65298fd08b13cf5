//! Entity classification.
//!
//! [`EntityClassifier::classify`] never fails: the model path returns
//! `Result<_, ClassifierFailure>` and every failure variant is answered by
//! the deterministic [`fallback::fallback_entities`]. The result is always
//! non-empty.

pub mod entity;
pub mod fallback;
pub mod prompt;

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{ClassifierConfig, LlmConfig};
use crate::extractors::contact::ExtractedContactInfo;
use crate::providers::{LlmProvider, ProviderError};

pub use entity::{ClassifiedEntity, EntityType};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A board offered to the model as a task destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSummary {
    /// Board name.
    pub name: String,
    /// Optional board description.
    pub description: Option<String>,
}

/// Everything the classifier sees about one request.
#[derive(Debug, Clone, Default)]
pub struct ClassificationInput {
    /// Normalized content.
    pub content: String,
    /// Original filename hint.
    pub file_name: Option<String>,
    /// MIME type hint.
    pub file_type: Option<String>,
    /// Caller's boards.
    pub boards: Vec<BoardSummary>,
}

/// Which path produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationSource {
    /// Parsed from model output.
    Model,
    /// Deterministic keyword fallback.
    Fallback,
}

/// Classifier output.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Entities in model (or fallback) order.
    pub entities: Vec<ClassifiedEntity>,
    /// Producing path.
    pub source: ClassificationSource,
}

/// Why the model path was abandoned.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierFailure {
    /// No provider is configured.
    #[error("no language model configured")]
    Unavailable,

    /// Transport failure or non-2xx response.
    #[error("provider error: {0}")]
    Provider(ProviderError),

    /// The hosted model is still loading.
    #[error("model is loading")]
    ModelLoading,

    /// Generated text holds no JSON array or object.
    #[error("no JSON found in model output")]
    NoJson,

    /// JSON fragment failed to parse.
    #[error("invalid JSON in model output: {0}")]
    InvalidJson(String),

    /// JSON parsed but yielded no usable entity.
    #[error("model output contained no entities")]
    NoEntities,
}

impl From<ProviderError> for ClassifierFailure {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::ModelLoading { .. } => Self::ModelLoading,
            other => Self::Provider(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// LLM-backed classifier with a deterministic fallback.
#[derive(Clone)]
pub struct EntityClassifier {
    provider: Option<Arc<dyn LlmProvider>>,
    max_prompt_chars: usize,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl std::fmt::Debug for EntityClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityClassifier")
            .field("model", &self.provider.as_ref().map(|p| p.model_id().to_owned()))
            .field("max_prompt_chars", &self.max_prompt_chars)
            .finish()
    }
}

impl EntityClassifier {
    /// Create a classifier; `provider = None` always uses the fallback.
    pub fn new(
        provider: Option<Arc<dyn LlmProvider>>,
        classifier: &ClassifierConfig,
        llm: &LlmConfig,
    ) -> Self {
        Self {
            provider,
            max_prompt_chars: classifier.max_prompt_chars,
            max_tokens: Some(llm.max_new_tokens),
            temperature: Some(llm.temperature),
        }
    }

    /// Classifier with no model.
    pub fn fallback_only() -> Self {
        Self::new(None, &ClassifierConfig::default(), &LlmConfig::default())
    }

    /// Classify `input`, falling back on any model-path failure.
    ///
    /// Every returned entity has been NUL-stripped.
    pub async fn classify(
        &self,
        input: &ClassificationInput,
        info: &ExtractedContactInfo,
    ) -> Classification {
        let (mut entities, source) = match self.classify_with_model(input).await {
            Ok(entities) => (entities, ClassificationSource::Model),
            Err(failure) => {
                match &failure {
                    ClassifierFailure::Unavailable => {
                        debug!("no model configured, using fallback classifier");
                    }
                    other => warn!(error = %other, "model classification failed, using fallback"),
                }
                (
                    fallback::fallback_entities(&input.content, info),
                    ClassificationSource::Fallback,
                )
            }
        };

        if fallback::ensure_party_entity(&mut entities, &input.content, info) {
            debug!(
                has_contact_info = !info.is_empty(),
                "synthesized contact entity"
            );
        }
        for entity in &mut entities {
            entity.strip_nul();
        }

        info!(
            source = ?source,
            count = entities.len(),
            "content classified"
        );
        Classification { entities, source }
    }

    /// Run only the model path.
    ///
    /// # Errors
    ///
    /// Returns a [`ClassifierFailure`] describing why no entities were produced.
    pub async fn classify_with_model(
        &self,
        input: &ClassificationInput,
    ) -> Result<Vec<ClassifiedEntity>, ClassifierFailure> {
        let provider = self.provider.as_ref().ok_or(ClassifierFailure::Unavailable)?;

        let mut request = prompt::build_prompt(input, self.max_prompt_chars);
        request.max_tokens = self.max_tokens;
        request.temperature = self.temperature;

        debug!(model = %provider.model_id(), "classification request starting");
        let response = provider.complete(request).await?;
        parse_entities(&response.text)
    }
}

// ---------------------------------------------------------------------------
// Output parsing
// ---------------------------------------------------------------------------

/// Parse generated text into entities.
///
/// Takes the first balanced JSON array or object in `text`; a single object
/// becomes a one-element list. Elements that do not decode as a known
/// entity type are dropped.
///
/// # Errors
///
/// Returns `NoJson`, `InvalidJson` or `NoEntities`.
pub fn parse_entities(text: &str) -> Result<Vec<ClassifiedEntity>, ClassifierFailure> {
    let fragment = first_json_fragment(text).ok_or(ClassifierFailure::NoJson)?;
    let value: Value = serde_json::from_str(fragment).map_err(|e| {
        warn!(
            error = %e,
            text_preview = %crate::extractors::truncate_chars(text, 200),
            "failed to parse classifier JSON"
        );
        ClassifierFailure::InvalidJson(e.to_string())
    })?;

    let items = match value {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        _ => return Err(ClassifierFailure::NoJson),
    };

    let entities: Vec<ClassifiedEntity> = items
        .into_iter()
        .filter_map(|item| match ClassifiedEntity::from_value(item) {
            Ok(entity) => Some(entity),
            Err(e) => {
                warn!(error = %e, "dropping undecodable classifier element");
                None
            }
        })
        .collect();

    if entities.is_empty() {
        return Err(ClassifierFailure::NoEntities);
    }
    Ok(entities)
}

/// Locate the first JSON array or object in `text`.
///
/// Scans for the bracket that balances the first `[` or `{`, honoring
/// string literals. An unbalanced fragment runs to the last matching
/// closer, which still lets the parser report a precise error.
fn first_json_fragment(text: &str) -> Option<&str> {
    let start = text.find(['[', '{'])?;
    let (open, close) = if text[start..].starts_with('[') {
        ('[', ']')
    } else {
        ('{', '}')
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            c if c == open => depth = depth.saturating_add(1),
            c if c == close => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let end = start.saturating_add(offset).saturating_add(ch.len_utf8());
                    return text.get(start..end);
                }
            }
            _ => {}
        }
    }

    let end = text.rfind(close)?;
    if end < start {
        return None;
    }
    text.get(start..=end)
}
