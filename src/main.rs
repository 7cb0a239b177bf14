//! SQL Agent - Main entry point.
//!
//! Connects to one database, describes its schema once, then answers
//! questions from the terminal (or a single `--question`).

use clap::Parser;
use sql_agent::Config;
use sql_agent::agent::SqlAgent;
use sql_agent::db::{DbPool, QueryExecutor, QueryRunner, SchemaInspector};
use sql_agent::error::{AgentError, AgentResult};
use sql_agent::llm::build_client;
use sql_agent::render::render_response;
use sql_agent::repl::run_session;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Initialize the tracing subscriber for logging.
///
/// The filter sits behind a reload layer so `debug on|off` can change it at runtime.
fn init_tracing(config: &Config) -> FilterHandle {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let (filter, handle) = reload::Layer::new(filter);

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    handle
}

fn print_startup_error(e: &AgentError) {
    eprintln!("Error: {}", e);
    if let Some(suggestion) = e.suggestion() {
        eprintln!("Hint: {}", suggestion);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Parse configuration from command line and environment
    let config = Config::parse();

    let filter_handle = init_tracing(&config);

    if let Err(e) = run(&config, filter_handle).await {
        error!(error = %e, "Fatal error");
        print_startup_error(&e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(config: &Config, filter_handle: FilterHandle) -> AgentResult<()> {
    config.validate()?;
    let db_config = config.database_config()?;
    let llm_settings = config.llm_settings()?;

    info!(
        db_type = %db_config.db_type,
        provider = %llm_settings.provider,
        model = %llm_settings.model,
        "Starting SQL agent v{}",
        env!("CARGO_PKG_VERSION")
    );

    let pool = DbPool::connect(&db_config, config.connect_timeout_duration()).await?;
    let schema = SchemaInspector::describe_database(&pool, config.sample_rows).await;
    if schema.is_empty() {
        warn!("No tables found; questions will be answered without schema context");
    }

    let executor: Arc<dyn QueryRunner> = Arc::new(
        QueryExecutor::new(pool.clone())
            .with_timeout(config.query_timeout)
            .with_row_limit(config.row_limit)
            .with_enforce_readonly(config.enforce_readonly),
    );
    let completion = build_client(&llm_settings)?;
    let agent = SqlAgent::new(completion, executor, schema, pool.db_type());

    let result = match &config.question {
        Some(question) => {
            let response = agent.ask_question(question).await;
            println!("{}", render_response(&response));
            Ok(())
        }
        None => interactive(&agent, config, &filter_handle).await,
    };

    pool.close().await;
    info!("Database connection closed");
    result
}

async fn interactive(
    agent: &SqlAgent,
    config: &Config,
    filter_handle: &FilterHandle,
) -> AgentResult<()> {
    let mut stdout = tokio::io::stdout();
    let banner = format!(
        "SQL Agent ready ({} tables described).\nType 'quit' to exit, 'debug on/off' to toggle debug mode\n",
        agent.schema().tables().len()
    );
    stdout
        .write_all(banner.as_bytes())
        .await
        .map_err(|e| AgentError::internal(format!("Terminal I/O error: {}", e)))?;

    let set_debug = |enabled: bool| {
        filter_handle
            .reload(EnvFilter::new(config.log_directive(enabled)))
            .map_err(|e| AgentError::internal(format!("Failed to change log level: {}", e)))
    };

    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = run_session(agent, stdin, &mut stdout, set_debug) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt");
        }
    }

    println!("\nGoodbye!");
    Ok(())
}
