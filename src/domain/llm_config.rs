use serde::{Deserialize, Serialize};

/// Settings for a single chat-completion call.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LLMConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Remote text-to-SQL provider settings, loaded once at startup.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RemoteModelConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Tried strictly in this order.
    pub models: Vec<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl RemoteModelConfig {
    /// A blank key counts as missing.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn for_model(&self, model: &str) -> LLMConfig {
        LLMConfig {
            base_url: self.base_url.clone(),
            model: model.to_string(),
            api_key: self.credential().map(str::to_string),
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
        }
    }
}

impl Default for RemoteModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key: None,
            models: vec![
                "meta-llama/llama-3.1-8b-instruct:free".to_string(),
                "microsoft/phi-3-mini-128k-instruct:free".to_string(),
                "google/gemma-7b-it:free".to_string(),
            ],
            max_tokens: 200,
            temperature: 0.1,
            timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_key_is_missing() {
        let config = RemoteModelConfig {
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(config.credential().is_none());
    }

    #[test]
    fn test_for_model_carries_limits() {
        let config = RemoteModelConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let llm = config.for_model("google/gemma-7b-it:free");
        assert_eq!(llm.model, "google/gemma-7b-it:free");
        assert_eq!(llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(llm.max_tokens, Some(200));
        assert_eq!(llm.temperature, Some(0.1));
    }
}
