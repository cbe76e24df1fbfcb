//! Remote Query Generator
//!
//! Asks hosted chat models for SQL, one model at a time in configured order. Each attempt
//! is bounded by the configured timeout; any failure moves on to the next model. The
//! caller only ever sees a candidate query or `None`.

use crate::domain::llm_config::RemoteModelConfig;
use crate::domain::query::GeneratedQuery;
use crate::infrastructure::llm_clients::LLMClient;
use crate::infrastructure::response::{clean_llm_response, strip_code_fences};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct RemoteQueryGenerator {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    config: RemoteModelConfig,
}

impl RemoteQueryGenerator {
    pub fn new(llm_client: Arc<dyn LLMClient + Send + Sync>, config: RemoteModelConfig) -> Self {
        Self { llm_client, config }
    }

    /// Whether a credential is configured at all.
    pub fn is_enabled(&self) -> bool {
        self.config.credential().is_some() && !self.config.models.is_empty()
    }

    /// First non-empty cleaned reply, tagged with the model that produced it.
    pub async fn generate(&self, question: &str, system_prompt: &str) -> Option<GeneratedQuery> {
        if self.config.credential().is_none() {
            return None;
        }
        let timeout = Duration::from_secs(self.config.timeout_secs);

        for model in &self.config.models {
            let llm_config = self.config.for_model(model);
            let reply = tokio::time::timeout(
                timeout,
                self.llm_client.generate(&llm_config, system_prompt, question),
            )
            .await;

            match reply {
                Ok(Ok(raw)) => {
                    let sql = strip_code_fences(&clean_llm_response(&raw));
                    if sql.is_empty() {
                        warn!(model = %model, "Remote model returned an empty reply");
                        continue;
                    }
                    info!(model = %model, sql = %sql, "Remote model generated SQL");
                    return Some(GeneratedQuery::remote(model, sql));
                }
                Ok(Err(e)) => {
                    warn!(model = %model, "Remote model failed: {}", e);
                }
                Err(_) => {
                    warn!(
                        model = %model,
                        timeout_secs = self.config.timeout_secs,
                        "Remote model timed out"
                    );
                }
            }
        }

        info!("All remote models exhausted");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::{AppError, Result};
    use crate::domain::llm_config::LLMConfig;
    use crate::domain::query::Provenance;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted replies per model; models without a script fail.
    struct ScriptedClient {
        replies: HashMap<String, String>,
        slow_models: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(replies: &[(&str, &str)]) -> Self {
            Self {
                replies: replies
                    .iter()
                    .map(|(m, r)| (m.to_string(), r.to_string()))
                    .collect(),
                slow_models: Vec::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LLMClient for ScriptedClient {
        async fn generate(&self, config: &LLMConfig, _system: &str, _user: &str) -> Result<String> {
            self.calls.lock().unwrap().push(config.model.clone());
            if self.slow_models.contains(&config.model) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            self.replies
                .get(&config.model)
                .cloned()
                .ok_or_else(|| AppError::LLMError("API error (429): rate limited".to_string()))
        }
    }

    fn config(models: &[&str], api_key: Option<&str>) -> RemoteModelConfig {
        RemoteModelConfig {
            api_key: api_key.map(str::to_string),
            models: models.iter().map(|m| m.to_string()).collect(),
            timeout_secs: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_call() {
        let client = Arc::new(ScriptedClient::new(&[("m1", "SELECT 1")]));
        let generator = RemoteQueryGenerator::new(client.clone(), config(&["m1"], None));

        assert!(!generator.is_enabled());
        assert!(generator.generate("anything", "prompt").await.is_none());
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_falls_through_failed_models_in_order() {
        let client = Arc::new(ScriptedClient::new(&[
            ("m2", ""),
            ("m3", "```sql\nSELECT name FROM employees\n```"),
        ]));
        let generator =
            RemoteQueryGenerator::new(client.clone(), config(&["m1", "m2", "m3"], Some("sk")));

        let query = generator.generate("list names", "prompt").await.unwrap();
        assert_eq!(query.sql(), "SELECT name FROM employees");
        assert_eq!(query.provenance(), &Provenance::Remote("m3".to_string()));
        assert_eq!(client.calls(), vec!["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn test_stops_at_first_usable_reply() {
        let client = Arc::new(ScriptedClient::new(&[
            ("m1", "<think>easy</think>SELECT COUNT(*) FROM employees;"),
            ("m2", "SELECT 2"),
        ]));
        let generator = RemoteQueryGenerator::new(client.clone(), config(&["m1", "m2"], Some("sk")));

        let query = generator.generate("how many", "prompt").await.unwrap();
        assert_eq!(query.sql(), "SELECT COUNT(*) FROM employees;");
        assert_eq!(client.calls(), vec!["m1"]);
    }

    #[tokio::test]
    async fn test_timeout_moves_to_next_model() {
        let mut scripted = ScriptedClient::new(&[("slow", "SELECT 1"), ("fast", "SELECT name FROM employees")]);
        scripted.slow_models.push("slow".to_string());
        let client = Arc::new(scripted);
        let generator =
            RemoteQueryGenerator::new(client.clone(), config(&["slow", "fast"], Some("sk")));

        let query = generator.generate("names", "prompt").await.unwrap();
        assert_eq!(query.provenance(), &Provenance::Remote("fast".to_string()));
    }

    #[tokio::test]
    async fn test_all_models_failing_is_none() {
        let client = Arc::new(ScriptedClient::new(&[]));
        let generator = RemoteQueryGenerator::new(client.clone(), config(&["a", "b"], Some("sk")));
        assert!(generator.generate("q", "prompt").await.is_none());
        assert_eq!(client.calls().len(), 2);
    }
}
