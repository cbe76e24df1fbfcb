use super::LLMClient;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

/// Chat-completions client for OpenRouter and API-compatible gateways.
pub struct OpenRouterClient {
    client: reqwest::Client,
}

impl OpenRouterClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn api_key(config: &LLMConfig) -> Result<&str> {
        config
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::LLMError("Missing API key for OpenRouter".to_string()))
    }
}

impl Default for OpenRouterClient {
    fn default() -> Self {
        Self::new()
    }
}

fn completions_url(base_url: &str) -> String {
    if base_url.ends_with('/') {
        format!("{}chat/completions", base_url)
    } else {
        format!("{}/chat/completions", base_url)
    }
}

fn extract_content(json: &serde_json::Value) -> Result<String> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| AppError::LLMError("Invalid response format".to_string()))
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl<'a> ChatRequest<'a> {
    fn new(config: &'a LLMConfig, system: &'a str, user: &'a str) -> Self {
        Self {
            model: &config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

#[async_trait]
impl LLMClient for OpenRouterClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        let api_key = Self::api_key(config)?;
        let url = completions_url(&config.base_url);
        debug!(model = %config.model, "Requesting SQL completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&ChatRequest::new(config, system, user))
            .send()
            .await
            .map_err(|e| AppError::LLMError(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::LLMError(format!("API error ({}): {}", status, text)));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::LLMError(format!("Failed to parse JSON: {}", e)))?;

        extract_content(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_completions_url_handles_trailing_slash() {
        assert_eq!(
            completions_url("https://openrouter.ai/api/v1"),
            "https://openrouter.ai/api/v1/chat/completions"
        );
        assert_eq!(
            completions_url("https://openrouter.ai/api/v1/"),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }

    #[test]
    fn test_extract_content() {
        let json = json!({
            "choices": [{"message": {"role": "assistant", "content": "SELECT name FROM employees;"}}]
        });
        assert_eq!(extract_content(&json).unwrap(), "SELECT name FROM employees;");

        let missing = json!({"error": {"message": "rate limited"}});
        assert!(matches!(extract_content(&missing), Err(AppError::LLMError(_))));
    }

    #[test]
    fn test_request_body_shape() {
        let config = LLMConfig {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "google/gemma-7b-it:free".to_string(),
            api_key: Some("sk".to_string()),
            max_tokens: Some(200),
            temperature: None,
        };
        let body = serde_json::to_value(ChatRequest::new(&config, "rules", "who earns most")).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "google/gemma-7b-it:free",
                "messages": [
                    {"role": "system", "content": "rules"},
                    {"role": "user", "content": "who earns most"}
                ],
                "max_tokens": 200
            })
        );
    }

    #[tokio::test]
    async fn test_generate_requires_api_key() {
        let client = OpenRouterClient::new();
        let config = LLMConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            model: "meta-llama/llama-3.1-8b-instruct:free".to_string(),
            api_key: None,
            max_tokens: Some(200),
            temperature: Some(0.1),
        };
        let err = client.generate(&config, "system", "user").await.unwrap_err();
        assert!(err.to_string().contains("Missing API key"));
    }
}
