use crate::application::QueryUseCase;
use crate::domain::error::AppError;
use crate::domain::query::{QueryRequest, QueryResponse};
use crate::domain::query_log::{QueryLogEntry, QueryLogSink};
use crate::infrastructure::db::query_logs::QueryLogRepository;
use actix_cors::Cors;
use actix_web::{dev::Server, get, http::StatusCode, post, web, App, HttpResponse, HttpServer, Responder, Scope};
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use validator::Validate;

const DEFAULT_LOG_LIMIT: i64 = 50;

const EXAMPLE_QUESTIONS: &[&str] = &[
    "Show me all employees in the company",
    "Give me the list of all employees who joined last year",
    "How many employees work in the IT department?",
    "Show me employees with salary greater than 50000",
    "List all employees who joined this year",
    "Find employees in the Sales department",
    "Show me the highest paid employees",
    "Count of employees in each department",
    "Employees who joined in 2023",
    "Show me all employees with their salaries sorted by name",
    "Find all software engineers",
    "Show me employees earning between 40000 and 80000",
    "List employees who have been with company for more than 5 years",
    "Show me the average salary by department",
    "Find employees with Gmail addresses",
];

pub struct HttpState {
    pub query_use_case: Arc<QueryUseCase>,
    pub query_logs: Arc<QueryLogRepository>,
}

fn error_response(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(json!({
        "success": false,
        "error": message,
    }))
}

/// Runs the pipeline on its own task so a panic becomes an error instead of a dropped connection.
async fn run_guarded<F>(task: F) -> crate::domain::error::Result<QueryResponse>
where
    F: Future<Output = QueryResponse> + Send + 'static,
{
    tokio::spawn(task)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))
}

#[post("/query/")]
async fn process_query(data: web::Data<HttpState>, body: web::Bytes) -> impl Responder {
    let mut request: QueryRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("{}", AppError::MalformedRequest(e.to_string()));
            return error_response(StatusCode::BAD_REQUEST, "Invalid JSON in request body");
        }
    };

    request.query = request.query.trim().to_string();
    if request.validate().is_err() {
        let message = if request.query.is_empty() {
            AppError::EmptyInput.to_string()
        } else {
            "Query must be at most 4096 characters".to_string()
        };
        return error_response(StatusCode::BAD_REQUEST, &message);
    }

    let use_case = data.query_use_case.clone();
    let question = request.query;
    let preview: String = question.chars().take(50).collect();
    let start = Instant::now();

    let task_question = question.clone();
    match run_guarded(async move { use_case.execute(&task_question).await }).await {
        Ok(response) => {
            if response.success {
                info!(cached = response.cached, "Query processed successfully: {}", preview);
            } else {
                warn!(
                    "Query failed: {} - {}",
                    preview,
                    response.error.as_deref().unwrap_or("Unknown error")
                );
            }
            HttpResponse::Ok().json(response)
        }
        Err(fault) => {
            let detail = match fault {
                AppError::Internal(detail) => detail,
                other => other.to_string(),
            };
            error!("Unexpected error in process_query: {}", detail);

            let entry = QueryLogEntry::new(
                &question,
                None,
                false,
                Some(format!("Unexpected error: {}", detail)),
                start.elapsed().as_secs_f64(),
                0,
                false,
            );
            if let Err(e) = data.query_logs.create(&entry).await {
                warn!("Failed to log query: {}", e);
            }

            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Unexpected error: {}", detail),
            )
        }
    }
}

#[get("/examples/")]
async fn query_examples() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "success": true,
        "examples": EXAMPLE_QUESTIONS,
    }))
}

#[get("/health/")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "DataFabric AI Employee Query Backend",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[get("/info/")]
async fn api_info() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "name": "DataFabric Employee Query API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Convert natural language queries to SQL and execute against employee database",
        "endpoints": {
            "POST /api/query/": "Process natural language query",
            "GET /api/examples/": "Get example queries",
            "GET /api/health/": "Health check",
            "GET /api/info/": "API information",
            "GET /api/logs/": "Recent query history",
        },
        "supported_queries": [
            "Employee listings and filtering",
            "Department-based queries",
            "Salary-based filtering",
            "Date-based filtering (joining dates)",
            "Aggregation queries (count, average)",
            "Sorting and limiting results",
        ],
    }))
}

#[derive(Deserialize)]
struct LogsQuery {
    limit: Option<i64>,
}

#[get("/logs/")]
async fn query_logs(data: web::Data<HttpState>, query: web::Query<LogsQuery>) -> impl Responder {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT);
    match data.query_logs.list_recent(limit).await {
        Ok(entries) => HttpResponse::Ok().json(json!({
            "success": true,
            "logs": entries,
        })),
        Err(e) => {
            error!("Failed to read query logs: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

pub fn api_scope() -> Scope {
    web::scope("/api")
        .service(process_query)
        .service(query_examples)
        .service(health_check)
        .service(api_info)
        .service(query_logs)
}

pub fn start_server(state: HttpState, host: &str, port: u16) -> std::io::Result<Server> {
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .service(api_scope())
    })
    .bind((host, port))?
    .run();

    info!("HTTP API listening on {}:{}", host, port);
    Ok(server)
}
