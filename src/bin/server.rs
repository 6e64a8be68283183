use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use dogwatch::alerting::evaluation_service::EvaluationService;
use dogwatch::db::{EntryStore, loader};
use dogwatch::notifications::senders::webhook::WebhookSender;
use dogwatch::notifications::service::NotificationService;
use dogwatch::server::config::ServerConfig;
use dogwatch::server::scheduler::Scheduler;
use dogwatch::services::checkin_service::CheckinService;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "dogwatch.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for the shutdown signal.");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // --- Config Setup ---
    // Logging is not up yet, so a config failure goes straight to stderr.
    let config = Arc::new(ServerConfig::load(args.config.as_deref())?);

    init_logging(&config.log_dir);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting dogwatch.");

    // --- Entry Store Setup ---
    let store = Arc::new(EntryStore::new());
    if let Err(e) =
        loader::load_definitions(&config.definitions_file, &config.namespace, &store).await
    {
        error!(error = %e, "Failed to load watchdog definitions.");
        return Err(e.into());
    }

    // --- Notification Service Setup ---
    let sender = Arc::new(WebhookSender::new(config.webhook_timeout())?);
    let notification_service = Arc::new(NotificationService::new(sender));

    // --- Watchdog Evaluation Task ---
    let evaluation_service = Arc::new(EvaluationService::new(
        store.clone(),
        notification_service,
        config.namespace.clone(),
    ));
    let scheduler = Arc::new(Scheduler::new(
        evaluation_service,
        config.evaluation_interval(),
    ));
    scheduler.clone().start().await;

    // --- Axum HTTP Server Setup ---
    let checkin_service = Arc::new(CheckinService::new(store, config.max_body_bytes));
    let app = dogwatch::web::create_axum_router(checkin_service);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "HTTP server listening.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    info!("dogwatch stopped.");
    Ok(())
}
