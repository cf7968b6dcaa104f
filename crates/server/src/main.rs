//! maaboo web server.

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::{Context, Result};
use catalog::HttpTransport;
use clap::Parser;
use server::{handlers, AppState};
use shared::{Config, Database, LogConfig, Store};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[actix_web::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Initialize logging
    let mut log_config = LogConfig::from_config(&config, "maaboo");
    if args.verbose {
        log_config.default_level = tracing::Level::DEBUG;
    }
    shared::logging::init(log_config)?;

    info!("maaboo starting");
    info!(config_file = %args.config.display(), "Loaded configuration");

    // Initialize database
    let db_path = config.database_path();
    info!(db_path = %db_path.display(), "Opening database");
    let database = Database::open(&db_path).context("Failed to open database")?;
    let mut store = Store::new(database);
    store
        .purge_expired_sessions(config.session_ttl())
        .context("Failed to purge expired sessions")?;

    let stats = store.get_stats().context("Failed to get store stats")?;
    info!(
        anime = stats.anime,
        manga = stats.manga,
        books = stats.books,
        users = stats.users,
        progress = stats.progress,
        "Store statistics"
    );

    // Initialize catalog transport
    let transport = HttpTransport::new(
        Duration::from_secs(config.catalogs.timeout_seconds),
        &config.catalogs.user_agent,
    )
    .context("Failed to create HTTP transport")?;

    let (host, port) = config.bind_addr();
    let workers = config.server.workers;
    let state = web::Data::new(AppState::new(config, store, Arc::new(transport)));

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(handlers::configure)
    });
    if workers > 0 {
        server = server.workers(workers);
    }

    info!(host = %host, port = port, "Starting HTTP server");
    server
        .bind((host.as_str(), port))
        .with_context(|| format!("Failed to bind {}:{}", host, port))?
        .run()
        .await
        .context("HTTP server failed")?;

    info!("maaboo stopped");
    Ok(())
}
