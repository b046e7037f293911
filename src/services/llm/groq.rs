//! Groq chat completions (OpenAI-compatible).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{ChatProvider, Prompt, ProviderKind, network_error};
use crate::error::LlmError;
use crate::models::{ChatMessage, DEFAULT_GROQ_MODELS, DEFAULT_GROQ_URL, ProviderConfig};

const RATE_LIMIT_CODE: &str = "rate_limit_exceeded";

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
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
    code: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

pub struct GroqProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    models: Vec<String>,
}

impl GroqProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            base_url: config.base_url_or(DEFAULT_GROQ_URL),
            models: config.models_or(DEFAULT_GROQ_MODELS),
        })
    }
}

fn classify_error(model: &str, status: StatusCode, body: &str) -> LlmError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);
    let message = parsed
        .as_ref()
        .map(|e| e.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string());

    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || parsed.as_ref().is_some_and(|e| {
            e.code.as_deref() == Some(RATE_LIMIT_CODE) || e.kind.as_deref() == Some(RATE_LIMIT_CODE)
        });

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
impl ChatProvider for GroqProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Groq
    }

    fn candidate_models(&self) -> &[String] {
        &self.models
    }

    async fn generate(&self, model: &str, prompt: &Prompt) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey {
            provider: "Groq",
            env_var: "GROQ_API_KEY",
        })?;

        let request = CompletionRequest {
            model,
            messages: prompt.to_messages(),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(model, status, &body));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse(format!("no completion returned by {model}")))
    }

    /// Groq models come from configuration; the catalogue is not queried.
    async fn list_models(&self) -> Vec<String> {
        self.models.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer, api_key: Option<&str>) -> GroqProvider {
        let config = ProviderConfig {
            api_key: api_key.map(str::to_string),
            base_url: Some(server.uri()),
            ..Default::default()
        };
        GroqProvider::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_generate_sends_structured_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama3-8b-8192",
                "messages": [
                    {"role": "system", "content": crate::services::llm::prompt::SUMMARIZE_INSTRUCTION},
                    {"role": "user", "content": "some text"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "short"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server, Some("test-key"));
        let answer = provider
            .generate("llama3-8b-8192", &Prompt::summarize("some text"))
            .await
            .unwrap();
        assert_eq!(answer, "short");
    }

    #[tokio::test]
    async fn test_429_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "slow down", "type": "tokens", "code": "rate_limit_exceeded"}
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server, Some("k"));
        let err = provider
            .generate("m", &Prompt::summarize("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::RateLimited { ref message, .. } if message == "slow down"));
    }

    #[tokio::test]
    async fn test_server_error_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("model decommissioned"))
            .mount(&server)
            .await;

        let provider = provider_for(&server, Some("k"));
        let err = provider
            .generate("gemma-7b-it", &Prompt::summarize("x"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LlmError::Api { status: 400, ref message, .. } if message == "model decommissioned"
        ));
    }

    #[tokio::test]
    async fn test_missing_key() {
        let server = MockServer::start().await;
        let provider = provider_for(&server, None);
        let err = provider
            .generate("m", &Prompt::summarize("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey { env_var: "GROQ_API_KEY", .. }));
    }

    #[tokio::test]
    async fn test_list_models_is_static() {
        let provider = GroqProvider::new(&ProviderConfig::default()).unwrap();
        assert_eq!(provider.list_models().await, DEFAULT_GROQ_MODELS);
    }
}
