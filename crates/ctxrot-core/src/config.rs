//! Configuration loader and typed settings.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g. `APP_LLM__API_KEY`).
//! Provides a helper to expand `~` and `${VAR}` in path values.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
    env_name: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, env_name };
        config.validate_for_env()?;
        Ok(config)
    }

    /// Wrap an already assembled figment (used by tests and embedders of the library).
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment, env_name: "dev".to_string() }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed, validated settings.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self) -> anyhow::Result<()> {
        let settings = self.settings()?;
        match self.env_name.as_str() {
            "prod" | "production" => {
                if settings.embedding.provider == EmbeddingProviderKind::Fake {
                    anyhow::bail!("Prod config must not use the fake embedding provider");
                }
            }
            "dev" | "development" | "test" | "testing" => {}
            _ => {}
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    /// Character budget for the assembled retrieval context.
    pub max_context_chars: usize,
    /// Word-overlap (Jaccard) above which a hit is dropped as a near-duplicate of a closer one.
    pub dedup_threshold: Option<f64>,
    pub embedding_model: String,
    pub llm_provider: LlmProviderKind,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let chunking = ChunkingConfig::default();
        Self {
            chunk_size: chunking.size,
            chunk_overlap: chunking.overlap,
            top_k: 3,
            max_context_chars: 4000,
            dedup_threshold: None,
            embedding_model: "all-MiniLM-L6-v2".to_string(),
            llm_provider: LlmProviderKind::Gemini,
            embedding: EmbeddingSettings::default(),
            llm: LlmSettings::default(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.chunking().validate()?;
        if self.top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be greater than 0".into()));
        }
        if self.max_context_chars == 0 {
            return Err(Error::InvalidConfig("max_context_chars must be greater than 0".into()));
        }
        if self.chunk_size > self.max_context_chars {
            return Err(Error::InvalidConfig(format!(
                "chunk_size {} exceeds max_context_chars {}; no segment would fit the context",
                self.chunk_size, self.max_context_chars
            )));
        }
        if let Some(t) = self.dedup_threshold {
            if !(t > 0.0 && t <= 1.0) {
                return Err(Error::InvalidConfig(format!("dedup_threshold {t} outside (0, 1]")));
            }
        }
        if self.embedding.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be greater than 0".into()));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size must be greater than 0".into()));
        }
        if self.embedding.cache && self.embedding.cache_capacity == 0 {
            return Err(Error::InvalidConfig("embedding.cache_capacity must be greater than 0".into()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::InvalidConfig(format!("llm.temperature {} outside [0, 2]", self.llm.temperature)));
        }
        Ok(())
    }

    pub fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig { size: self.chunk_size, overlap: self.chunk_overlap }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Sentence-transformer weights loaded from `model_dir` and run with candle.
    Local,
    /// OpenAI-compatible `/embeddings` endpoint.
    OpenAi,
    /// Deterministic token-hashing embedder for tests and offline runs.
    Fake,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProviderKind,
    pub dimension: usize,
    pub max_len: usize,
    pub model_dir: Option<String>,
    pub base_url: String,
    pub api_key: Option<String>,
    pub batch_size: usize,
    pub timeout_secs: u64,
    pub cache: bool,
    /// Maximum cached vectors; the oldest entries are evicted first.
    pub cache_capacity: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Local,
            dimension: 384,
            max_len: 256,
            model_dir: None,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            batch_size: 32,
            timeout_secs: 30,
            cache: true,
            cache_capacity: 10_000,
        }
    }
}

impl EmbeddingSettings {
    pub fn model_dir_path(&self) -> Option<PathBuf> {
        self.model_dir.as_deref().map(expand_path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    Ollama,
    OpenAi,
    #[serde(alias = "claude")]
    Anthropic,
    Gemini,
}

impl LlmProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        }
    }
}

impl fmt::Display for LlmProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Falls back to the provider's default model when unset.
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self { model: None, base_url: None, api_key: None, temperature: 0.7, max_tokens: 500, timeout_secs: 120 }
    }
}
