use clap::Parser;
use datafabric_lib::application::use_cases::query_executor::QueryExecutor;
use datafabric_lib::application::use_cases::schema_introspector::SchemaIntrospector;
use datafabric_lib::application::use_cases::sql_sanitizer::SqlSanitizer;
use datafabric_lib::application::TableInspector;
use datafabric_lib::infrastructure::config::AppConfig;
use datafabric_lib::infrastructure::db::pool::DbPool;
use std::process::ExitCode;
use std::time::Duration;

/// Print the structure and a data sample of the employee table
#[derive(Parser)]
#[command(name = "inspect_table")]
#[command(about = "Inspect the employee table: columns, record count, sample rows")]
struct Args {
    /// Table to inspect
    #[arg(short, long, default_value = "employees")]
    table: String,

    /// Number of sample rows to print
    #[arg(short, long, default_value_t = 5)]
    sample_size: u32,

    /// Connection URL (default: the configured database)
    #[arg(long, env = "DATAFABRIC_DATABASE__URL")]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let _ = tracing_subscriber::fmt().with_env_filter("warn").try_init();

    let mut config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(url) = args.database_url {
        config.database.url = url;
    }

    let pool = match DbPool::connect(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Error inspecting table: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let inspector = TableInspector::new(
        SchemaIntrospector::new(pool.clone(), &args.table, &config.database.fallback_schema),
        SqlSanitizer::new(&args.table),
        QueryExecutor::new(
            pool.clone(),
            Duration::from_secs(config.database.query_timeout_secs),
        ),
    );

    let outcome = inspector.inspect(args.sample_size).await;
    pool.close().await;

    match outcome {
        Ok(report) => {
            print!("{}", report.render());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error inspecting table: {}", e);
            ExitCode::FAILURE
        }
    }
}
