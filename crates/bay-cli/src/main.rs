use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use bay_config::Config;
use bay_core::{
    init_logging, Allocator, DockerContainerDriver, Forwarder, HttpReadinessProbe, Scheduler,
};
use bay_db::Database;

#[derive(Parser)]
#[command(name = "bayctl", about = "Bay sandbox orchestration control plane", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API and Ship scheduler
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve => serve().await?,
    }
    Ok(())
}

async fn serve() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    init_logging(&config.log_level, None, config.log_format == "json");
    info!("Bay control plane starting...");

    let config = Arc::new(config);

    let db = Arc::new(
        Database::new(&config.database_url)
            .await
            .context("Failed to connect to database")?,
    );
    db.initialize()
        .await
        .context("Failed to initialize database schema")?;
    info!("Database initialized");

    let driver: Arc<dyn bay_core::ContainerDriver> = Arc::new(DockerContainerDriver::new());
    let forwarder = Arc::new(Forwarder::new().context("Failed to build forwarder")?);
    let readiness: Arc<dyn bay_core::ReadinessProbe> =
        Arc::new(HttpReadinessProbe::new().context("Failed to build readiness probe")?);
    let scheduler = Arc::new(Scheduler::new(db.clone(), driver.clone()));
    let allocator = Arc::new(Allocator::new(
        db.clone(),
        driver,
        forwarder,
        readiness,
        scheduler,
        config.clone(),
    ));

    let app = bay_web::router(bay_web::AppState::new(allocator, config.clone()));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "Bay API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    db.close().await;
    info!("Bay control plane stopped.");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received.");
}
