//! Google Gemini `generateContent` API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{ChatProvider, Prompt, ProviderKind, network_error};
use crate::error::LlmError;
use crate::models::{DEFAULT_GEMINI_MODELS, DEFAULT_GEMINI_URL, ProviderConfig};

const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";
const GENERATE_CONTENT: &str = "generateContent";

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

pub struct GeminiProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    models: Vec<String>,
}

impl GeminiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            base_url: config.base_url_or(DEFAULT_GEMINI_URL),
            models: config.models_or(DEFAULT_GEMINI_MODELS),
        })
    }

    fn api_key(&self) -> Result<&str, LlmError> {
        self.api_key.as_deref().ok_or(LlmError::MissingApiKey {
            provider: "Gemini",
            env_var: "GEMINI_API_KEY",
        })
    }

    async fn fetch_models(&self) -> Result<Vec<String>, LlmError> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .query(&[("key", self.api_key()?), ("pageSize", "1000")])
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error("models", status, &body));
        }

        let list: ModelList = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(list
            .models
            .into_iter()
            .filter(|m| {
                m.supported_generation_methods
                    .iter()
                    .any(|method| method == GENERATE_CONTENT)
            })
            .map(|m| strip_model_prefix(&m.name).to_string())
            .collect())
    }
}

/// Catalogue names look like `models/gemini-1.5-pro`.
pub fn strip_model_prefix(name: &str) -> &str {
    name.strip_prefix("models/")
        .or_else(|| name.strip_prefix("model/"))
        .unwrap_or(name)
}

fn classify_error(model: &str, status: StatusCode, body: &str) -> LlmError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);
    let message = parsed
        .as_ref()
        .map(|e| e.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string());

    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || parsed
            .as_ref()
            .is_some_and(|e| e.status.as_deref() == Some(RESOURCE_EXHAUSTED));

    if rate_limited {
        LlmError::RateLimited {
            model: model.to_string(),
            message,
        }
    } else {
        LlmError::Api {
            model: model.to_string(),
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn candidate_models(&self) -> &[String] {
        &self.models
    }

    async fn generate(&self, model: &str, prompt: &Prompt) -> Result<String, LlmError> {
        let api_key = self.api_key()?;
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_text(),
                }],
            }],
        };

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url,
                strip_model_prefix(model)
            ))
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(model, status, &body));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let text: String = generated
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(LlmError::InvalidResponse(format!(
                "no text returned by {model}"
            )));
        }
        Ok(text)
    }

    /// Live catalogue filtered to text generation, or the configured list if it can't be fetched.
    async fn list_models(&self) -> Vec<String> {
        match self.fetch_models().await {
            Ok(models) => models,
            Err(e) => {
                tracing::warn!("failed to fetch Gemini model list, using defaults: {e}");
                self.models
                    .iter()
                    .map(|m| strip_model_prefix(m).to_string())
                    .collect()
            }
        }
    }
}
