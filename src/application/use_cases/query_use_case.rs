//! Natural-language query pipeline
//!
//! cache → remote generation (else rule-based fallback) → sanitize → execute → respond.
//! The introspected schema feeds both generators: the prompt for the remote models and
//! the resolved optional columns for the fallback templates.
//! Every request produces exactly one query log entry, cached or not. Nothing in here
//! returns an error to the transport layer; failures become `success: false` responses.

use super::fallback_generator::FallbackQueryGenerator;
use super::prompt_builder::build_system_prompt;
use super::query_cache::{cache_key, QueryCache};
use super::query_executor::QueryExecutor;
use super::remote_generator::RemoteQueryGenerator;
use super::schema_introspector::SchemaIntrospector;
use super::sql_sanitizer::SqlSanitizer;
use crate::domain::error::AppError;
use crate::domain::query::{GeneratedQuery, QueryResponse};
use crate::domain::query_log::{QueryLogEntry, QueryLogSink};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::db::pool::DbPool;
use crate::infrastructure::llm_clients::LLMClient;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

pub struct QueryUseCase {
    introspector: SchemaIntrospector,
    remote: RemoteQueryGenerator,
    fallback: FallbackQueryGenerator,
    sanitizer: SqlSanitizer,
    executor: QueryExecutor,
    cache: Arc<dyn QueryCache>,
    cache_ttl: Duration,
    log_sink: Arc<dyn QueryLogSink>,
}

impl QueryUseCase {
    pub fn new(
        pool: DbPool,
        config: &AppConfig,
        llm_client: Arc<dyn LLMClient + Send + Sync>,
        cache: Arc<dyn QueryCache>,
        log_sink: Arc<dyn QueryLogSink>,
    ) -> Self {
        let table = &config.database.table;
        Self {
            introspector: SchemaIntrospector::new(
                pool.clone(),
                table,
                &config.database.fallback_schema,
            ),
            remote: RemoteQueryGenerator::new(llm_client, config.remote.clone()),
            fallback: FallbackQueryGenerator::new(table, pool.db_type()),
            sanitizer: SqlSanitizer::new(table),
            executor: QueryExecutor::new(
                pool,
                Duration::from_secs(config.database.query_timeout_secs),
            ),
            cache,
            cache_ttl: Duration::from_secs(config.cache.ttl_secs),
            log_sink,
        }
    }

    pub async fn execute(&self, question: &str) -> QueryResponse {
        let span = info_span!("nl_query", request_id = %Uuid::new_v4());
        self.run(question.trim()).instrument(span).await
    }

    async fn run(&self, question: &str) -> QueryResponse {
        let start = Instant::now();
        if question.is_empty() {
            return QueryResponse::failure(question, None, AppError::EmptyInput.to_string());
        }

        let key = cache_key(question);
        if let Some(mut response) = self.cache.get(&key) {
            info!("Returning cached response");
            response.cached = true;
            response.original_query = question.to_string();
            self.record(question, response.sql_query.as_deref(), &response, start, true)
                .await;
            return response;
        }

        let candidate = self.generate(question).await;
        let response = match self.sanitizer.sanitize(&candidate) {
            Ok(query) => {
                let result = self.executor.execute(&query).await;
                QueryResponse::from_execution(question, query.sql(), result)
            }
            Err(rejection) => {
                warn!(
                    provenance = %candidate.provenance(),
                    code = rejection.code(),
                    sql = %candidate.sql(),
                    "Generated SQL rejected"
                );
                QueryResponse::failure(
                    question,
                    None,
                    AppError::SanitizationRejected(rejection.to_string()).to_string(),
                )
            }
        };

        if response.success {
            self.cache.set(&key, response.clone(), self.cache_ttl);
        }

        let logged_sql = response.sql_query.as_deref().unwrap_or(candidate.sql());
        self.record(question, Some(logged_sql), &response, start, false)
            .await;
        response
    }

    async fn generate(&self, question: &str) -> GeneratedQuery {
        let schema = self.introspector.describe().await;
        if self.remote.is_enabled() {
            let prompt = build_system_prompt(&schema);
            if let Some(query) = self.remote.generate(question, &prompt).await {
                return query;
            }
        }
        info!("Using rule-based fallback generator");
        self.fallback.generate(question, &schema.presence)
    }

    async fn record(
        &self,
        question: &str,
        sql: Option<&str>,
        response: &QueryResponse,
        start: Instant,
        cached: bool,
    ) {
        let elapsed = start.elapsed().as_secs_f64();
        info!(
            success = response.success,
            rows = response.row_count,
            cached,
            elapsed_secs = elapsed,
            "Query processed"
        );

        let entry = QueryLogEntry::new(
            question,
            sql,
            response.success,
            response.error.clone(),
            elapsed,
            response.row_count,
            cached,
        );
        if let Err(e) = self.log_sink.create(&entry).await {
            warn!("Failed to log query: {}", e);
        }
    }
}
