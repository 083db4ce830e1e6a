//! Student records binary entry point.
//!
//! Opens a fresh in-memory store, runs the demonstration sequence and prints
//! each result to stdout. All logs go to stderr.
//!
//! Any store or output failure is fatal: it is logged and the process exits
//! with status 1.

use student_records::config::Config;
use student_records::demo;
use student_records::storage::StudentStore;

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    // Initialize logging to stderr only (stdout carries the results)
    tracing_subscriber::fmt()
        .with_env_filter(
            config
                .log_level
                .parse()
                .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("student-records starting...");

    let store = match StudentStore::open(&config).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to open store: {e}");
            std::process::exit(1);
        }
    };

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = demo::run(&store, &mut stdout).await {
        tracing::error!("Run failed: {e}");
        std::process::exit(1);
    }

    tracing::info!("student-records finished");
}
