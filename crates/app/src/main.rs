use anyhow::Context;
use clap::Parser;
use course_server::config::{Config, normalize_sqlite_url, prepare_sqlite_file};
use course_server::cors_layer;
use course_server::http::create_router;
use services::{AppServices, Clock};
use tracing::info;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,course_server=debug")),
        )
        .init();

    let config = Config::parse();

    if let Err(e) = run(config).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let db_url = normalize_sqlite_url(&config.db_url);
    prepare_sqlite_file(&db_url)
        .map_err(|e| anyhow::anyhow!(e))
        .with_context(|| format!("preparing database {db_url}"))?;

    let services = AppServices::new_sqlite(&db_url, &config.content_dir, Clock::system())
        .await
        .with_context(|| format!("loading course from {}", config.content_dir.display()))?;

    let app = create_router(services, cors_layer(&config.allow_origins));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    info!(addr = %config.bind, db = %db_url, "course server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("course server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}
