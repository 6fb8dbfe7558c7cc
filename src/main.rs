use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use netledger::accounting::AccountingEngine;
use netledger::db::StateStore;
use netledger::server::config::ServerConfig;
use netledger::server::scheduler::PollScheduler;
use netledger::server::shutdown::forward_shutdown;
use netledger::server::system_info::SystemMonitor;
use netledger::sources::{DishAdapter, RouterAdapter};
use netledger::web::{AppState, create_axum_router};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "netledger.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=warn,reqwest=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&config.log_dir);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting netledger.");

    // --- Accounting Engine ---
    let engine = Arc::new(AccountingEngine::open(StateStore::new(config.state_path())));

    // --- Sources & Scheduler ---
    let router_adapter = Arc::new(RouterAdapter::from_config(&config));
    let dish_adapter = Arc::new(DishAdapter::from_config(&config)?);
    info!(
        router = %format!("{}@{}:{}", config.router_username, config.router_host, config.router_port),
        dish = %dish_adapter.url(),
        period_secs = config.poll_interval_seconds,
        "Configured traffic sources."
    );

    let scheduler = PollScheduler::new(engine.clone(), config.poll_interval())
        .with_adapter(router_adapter)
        .with_adapter(dish_adapter);

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx.clone()));
    let signal_task = tokio::spawn(forward_shutdown(tokio::signal::ctrl_c(), shutdown_tx));

    // --- HTTP Server ---
    let app_state = Arc::new(AppState {
        engine: engine.clone(),
        system_monitor: config.system_stats.then(|| Arc::new(SystemMonitor::new())),
    });
    let app = create_axum_router(app_state);

    let addr: SocketAddr = config.listen_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "Status API listening.");

    let mut server_shutdown_rx = shutdown_rx;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = server_shutdown_rx.changed().await;
        })
        .await?;

    signal_task.abort();
    if let Err(e) = scheduler_task.await {
        error!(error = %e, "Poll scheduler task failed.");
    }
    info!("netledger stopped.");
    Ok(())
}
