//! Configuration loading.
//!
//! Loads configuration from `./config.toml` (or `$SIFT_CONFIG_PATH`).
//! Environment variables override file values; file values override defaults.
//!
//! Precedence: env vars > config file > defaults.
//!
//! The resulting [`SiftConfig`] is injected into the classifier, the
//! attachment decoder and the store at construction time; nothing below the
//! binary reads the process environment.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

// ── Top-level config ────────────────────────────────────────────

/// Top-level configuration loaded from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SiftConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Language-model provider settings.
    pub llm: LlmConfig,
    /// Attachment object storage. Absent means attachments cannot be fetched.
    pub storage: Option<StorageConfig>,
    /// Classification settings.
    pub classifier: ClassifierConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl SiftConfig {
    /// Load configuration with precedence: env vars > `./.env` > TOML file > defaults.
    ///
    /// Config file path: `$SIFT_CONFIG_PATH` or `./config.toml`.
    /// If the file does not exist, returns defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let dotenv = read_dotenv(Path::new(".env"))?;
        Self::load_with(|key| std::env::var(key).ok().or_else(|| dotenv.get(key).cloned()))
    }

    /// Load using a custom env resolver (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = Self::config_path_with(&env);
        let mut config = Self::load_from_file(&path)?;
        config.apply_overrides(env);
        Ok(config)
    }

    fn load_from_file(path: &PathBuf) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config file found, using defaults");
                Ok(SiftConfig::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config file {}: {e}",
                path.display()
            )),
        }
    }

    /// Resolve the config path using a custom env resolver.
    fn config_path_with(env: &impl Fn(&str) -> Option<String>) -> PathBuf {
        env("SIFT_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function for testability (avoids unsafe `set_var` in tests).
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        // Server.
        if let Some(v) = env("SIFT_BIND") {
            self.server.bind = v;
        }

        // Database.
        if let Some(v) = env("SIFT_DATABASE_URL") {
            self.database.url = v;
        }

        // LLM.
        if let Some(v) = env("SIFT_LLM_PROVIDER") {
            match ProviderKind::parse(&v) {
                Some(kind) => self.llm.provider = kind,
                None => tracing::warn!(
                    var = "SIFT_LLM_PROVIDER",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("SIFT_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = env("SIFT_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = env("SIFT_LLM_API_KEY") {
            self.llm.api_key = Some(v);
        }

        // Storage (URL presence creates the section).
        if let Some(url) = env("SIFT_STORAGE_URL") {
            let mut storage = self.storage.take().unwrap_or_default();
            storage.base_url = url;
            self.storage = Some(storage);
        }
        if let Some(storage) = self.storage.as_mut() {
            if let Some(v) = env("SIFT_STORAGE_BUCKET") {
                storage.bucket = v;
            }
            if let Some(v) = env("SIFT_STORAGE_KEY") {
                storage.service_key = Some(v);
            }
        }

        // Logging.
        if let Some(v) = env("SIFT_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env("SIFT_LOG_DIR") {
            self.logging.dir = Some(PathBuf::from(v));
        }
        if let Some(v) = env("SIFT_LOG_FORMAT") {
            match LogFormat::parse(&v) {
                Some(format) => self.logging.console = format,
                None => tracing::warn!(
                    var = "SIFT_LOG_FORMAT",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
    }

    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or has wrongly typed fields.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: SiftConfig = toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }
}

/// Read `KEY=value` pairs from a `.env` file without touching the process
/// environment. A missing file yields an empty map.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be parsed.
pub fn read_dotenv(path: &Path) -> Result<BTreeMap<String, String>> {
    let mut vars = BTreeMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let iter = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    for item in iter {
        let (key, value) =
            item.with_context(|| format!("failed to parse entry in {}", path.display()))?;
        vars.insert(key, value);
    }
    Ok(vars)
}

// ── Server config ───────────────────────────────────────────────

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

// ── Database config ─────────────────────────────────────────────

/// Database connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection URL.
    pub url: String,
    /// Pool size.
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://sift.db".to_string(),
            max_connections: 5,
        }
    }
}

// ── LLM config ──────────────────────────────────────────────────

/// Which inference backend to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Hosted text-generation inference API.
    #[default]
    HuggingFace,
    /// Local Ollama server.
    Ollama,
    /// No model; every request uses the deterministic fallback.
    None,
}

impl ProviderKind {
    /// Parse the lowercase name used in config and env vars.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "huggingface" => Some(Self::HuggingFace),
            "ollama" => Some(Self::Ollama),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

/// Language-model provider settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend selection.
    pub provider: ProviderKind,
    /// API base URL.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// API key. Hosted providers are disabled without one.
    pub api_key: Option<String>,
    /// Maximum generated tokens.
    pub max_new_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// HTTP client timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "__REDACTED__"))
            .field("max_new_tokens", &self.max_new_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::HuggingFace,
            base_url: crate::providers::huggingface::DEFAULT_INFERENCE_URL.to_string(),
            model: "mistralai/Mistral-7B-Instruct-v0.2".to_string(),
            api_key: None,
            max_new_tokens: 1024,
            temperature: 0.1,
            timeout_secs: 30,
        }
    }
}

// ── Storage config ──────────────────────────────────────────────

/// Attachment object storage settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage API base URL.
    pub base_url: String,
    /// Bucket holding attachment objects.
    pub bucket: String,
    /// Service key sent as a bearer token.
    pub service_key: Option<String>,
    /// Prefix prepended to the attachment id to form the object key.
    pub key_prefix: String,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("base_url", &self.base_url)
            .field("bucket", &self.bucket)
            .field(
                "service_key",
                &self.service_key.as_ref().map(|_| "__REDACTED__"),
            )
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            bucket: "attachments".to_string(),
            service_key: None,
            key_prefix: String::new(),
        }
    }
}

// ── Classifier config ───────────────────────────────────────────

/// How task positions are assigned within a board column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionPolicy {
    /// Atomic per-column sequence row.
    #[default]
    Sequence,
    /// Read the current max, then write max + 1.
    MaxPlusOne,
}

/// Classification settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Content characters embedded in the prompt.
    pub max_prompt_chars: usize,
    /// Task position assignment policy.
    pub position_policy: PositionPolicy,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_prompt_chars: 6000,
            position_policy: PositionPolicy::Sequence,
        }
    }
}

// ── Logging config ──────────────────────────────────────────────

/// Console log encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event, for log shippers reading stderr.
    Json,
}

impl LogFormat {
    /// Parse the lowercase name used in config and env vars.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for rotated JSON logs; console only when absent.
    pub dir: Option<PathBuf>,
    /// Console encoding.
    pub console: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
            console: LogFormat::Pretty,
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────
