use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::application::{InMemoryQueryCache, QueryUseCase};
use crate::domain::error::AppError;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::db::pool::DbPool;
use crate::infrastructure::db::query_logs::QueryLogRepository;
use crate::infrastructure::llm_clients::{LLMClient, OpenRouterClient};
use crate::interfaces::http::{start_server, HttpState};

fn io_error(err: AppError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
}

pub async fn run() -> std::io::Result<()> {
    let config = AppConfig::load().map_err(io_error)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_str()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    if config.remote.credential().is_none() {
        info!("No remote model credential configured; using rule-based generation only");
    }

    let pool = DbPool::connect(&config.database).await.map_err(io_error)?;
    let query_logs = Arc::new(
        QueryLogRepository::connect(&config.query_log.path)
            .await
            .map_err(io_error)?,
    );

    let llm_client: Arc<dyn LLMClient + Send + Sync> = Arc::new(OpenRouterClient::new());
    let query_use_case = QueryUseCase::new(
        pool.clone(),
        &config,
        llm_client,
        Arc::new(InMemoryQueryCache::new(config.cache.max_entries)),
        query_logs.clone(),
    );

    let state = HttpState {
        query_use_case: Arc::new(query_use_case),
        query_logs,
    };

    start_server(state, &config.server.host, config.server.port)?.await?;

    pool.close().await;
    info!("Server stopped");
    Ok(())
}
