//! LLM providers and the model-fallback gateway.

mod gemini;
mod groq;
pub(crate) mod prompt;

pub use gemini::GeminiProvider;
pub use groq::GroqProvider;
pub use prompt::Prompt;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::models::LlmConfig;
use crate::utils::{FallbackResult, Retryable, with_fallback};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Groq,
    Gemini,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Groq => "groq",
            ProviderKind::Gemini => "gemini",
        }
    }

    /// Name used in user-facing messages.
    pub fn display_name(self) -> &'static str {
        match self {
            ProviderKind::Groq => "Groq",
            ProviderKind::Gemini => "Gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(ProviderKind::Groq),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(LlmError::UnknownProvider(other.to_string())),
        }
    }
}

/// A hosted LLM API.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Models to try, highest priority first.
    fn candidate_models(&self) -> &[String];

    /// Run one completion against a single model.
    async fn generate(&self, model: &str, prompt: &Prompt) -> Result<String, LlmError>;

    /// Models offered to clients. Never fails; falls back to the static list.
    async fn list_models(&self) -> Vec<String>;
}

pub(crate) fn network_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Network(format!("request timed out: {e}"))
    } else {
        LlmError::Network(e.to_string())
    }
}

/// Routes prompts to a provider and walks its model list on rate limits.
#[derive(Clone)]
pub struct LlmGateway {
    providers: HashMap<ProviderKind, Arc<dyn ChatProvider>>,
}

impl LlmGateway {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        if config.groq.api_key.is_none() {
            tracing::warn!("GROQ_API_KEY not set; Groq requests will fail");
        }
        if config.gemini.api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY not set; Gemini requests will fail");
        }

        let groq: Arc<dyn ChatProvider> = Arc::new(GroqProvider::new(&config.groq)?);
        let gemini: Arc<dyn ChatProvider> = Arc::new(GeminiProvider::new(&config.gemini)?);
        Ok(Self::with_providers(vec![groq, gemini]))
    }

    pub fn with_providers(providers: Vec<Arc<dyn ChatProvider>>) -> Self {
        Self {
            providers: providers.into_iter().map(|p| (p.kind(), p)).collect(),
        }
    }

    fn provider(&self, kind: ProviderKind) -> Result<&Arc<dyn ChatProvider>, LlmError> {
        self.providers
            .get(&kind)
            .ok_or_else(|| LlmError::UnknownProvider(kind.to_string()))
    }

    /// Complete `prompt` with the first model that isn't rate limited.
    ///
    /// A non-empty `model` restricts the candidates to that single model.
    pub async fn complete(
        &self,
        kind: ProviderKind,
        model: Option<&str>,
        prompt: &Prompt,
    ) -> Result<String, LlmError> {
        let provider = self.provider(kind)?;
        let candidates: Vec<String> = match model.map(str::trim).filter(|m| !m.is_empty()) {
            Some(forced) => vec![forced.to_string()],
            None => provider.candidate_models().to_vec(),
        };

        let result = with_fallback(candidates, |model| async move {
            let result = provider.generate(&model, prompt).await;
            if let Err(e) = &result
                && e.is_retryable()
            {
                tracing::warn!("{kind} model {model} rate limited, trying next: {e}");
            }
            result.map(|text| (model, text))
        })
        .await;

        match result {
            FallbackResult::Success {
                value: (model, text),
                attempts,
            } => {
                tracing::debug!("{kind} answered with {model} after {attempts} attempt(s)");
                Ok(text)
            }
            FallbackResult::Aborted { error, .. } => Err(error),
            FallbackResult::Exhausted { last_error, .. } => Err(LlmError::Exhausted {
                provider: kind.display_name(),
                last_error: last_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no models configured".to_string()),
            }),
        }
    }

    pub async fn list_models(&self, kind: ProviderKind) -> Result<Vec<String>, LlmError> {
        Ok(self.provider(kind)?.list_models().await)
    }
}
