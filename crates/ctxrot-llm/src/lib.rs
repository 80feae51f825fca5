//! Text generation providers behind one `Generator` trait.

pub mod provider;
pub mod providers;

use std::time::Duration;

use tracing::info;

use ctxrot_core::config::{LlmProviderKind, LlmSettings};

pub use provider::{Generation, GenerationParams, Generator, LlmError};
use providers::{anthropic, gemini, ollama, openai};

/// Sampling parameters from configuration.
pub fn params_from(settings: &LlmSettings) -> GenerationParams {
    GenerationParams { temperature: settings.temperature, max_tokens: settings.max_tokens }
}

fn api_key(configured: &Option<String>, env_vars: &[&str]) -> Option<String> {
    configured
        .clone()
        .filter(|k| !k.is_empty())
        .or_else(|| env_vars.iter().find_map(|v| std::env::var(v).ok().filter(|k| !k.is_empty())))
}

/// Create the generation provider selected by configuration.
pub fn create_generator(kind: LlmProviderKind, settings: &LlmSettings) -> Result<Box<dyn Generator>, LlmError> {
    let timeout = Duration::from_secs(settings.timeout_secs);
    let model = |default: &str| settings.model.clone().unwrap_or_else(|| default.to_string());
    let base_url = |default: &str| settings.base_url.clone().unwrap_or_else(|| default.to_string());

    let generator: Box<dyn Generator> = match kind {
        LlmProviderKind::Ollama => Box::new(ollama::OllamaProvider::new(
            base_url(ollama::DEFAULT_BASE_URL),
            model(ollama::DEFAULT_MODEL),
            timeout,
        )),
        LlmProviderKind::OpenAi => {
            let key = api_key(&settings.api_key, &["OPENAI_API_KEY"])
                .ok_or_else(|| LlmError::NotConfigured("OPENAI_API_KEY not set".into()))?;
            Box::new(openai::OpenAiProvider::new(key, model(openai::DEFAULT_MODEL), base_url(openai::DEFAULT_BASE_URL), timeout))
        }
        LlmProviderKind::Anthropic => {
            let key = api_key(&settings.api_key, &["ANTHROPIC_API_KEY"])
                .ok_or_else(|| LlmError::NotConfigured("ANTHROPIC_API_KEY not set".into()))?;
            Box::new(anthropic::AnthropicProvider::new(
                key,
                model(anthropic::DEFAULT_MODEL),
                base_url(anthropic::DEFAULT_BASE_URL),
                timeout,
            ))
        }
        LlmProviderKind::Gemini => {
            let key = api_key(&settings.api_key, &["GEMINI_API_KEY", "GOOGLE_API_KEY"])
                .ok_or_else(|| LlmError::NotConfigured("GEMINI_API_KEY not set".into()))?;
            Box::new(gemini::GeminiProvider::new(key, model(gemini::DEFAULT_MODEL), base_url(gemini::DEFAULT_BASE_URL), timeout))
        }
    };
    info!(provider = generator.provider(), model = generator.model(), "generation provider ready");
    Ok(generator)
}
