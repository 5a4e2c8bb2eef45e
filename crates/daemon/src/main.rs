//! drayd - dray worker daemon
//! Pulls work from the configured queues and executes registered job types.

mod jobs;
mod telemetry;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dray_core::application::{Broker, BrokerConfig, Worker, WorkerConfig};
use dray_core::port::time_provider::SystemTimeProvider;
use dray_infra_redis::{connect, RedisStore};
use dray_infra_system::HostIdProvider;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_QUEUES: &str = "default";

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging (JSON for production, pretty for development)
    let log_format = std::env::var("DRAY_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("dray=info,drayd=info"))
        .expect("Failed to create env filter");

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    info!("drayd v{} starting...", VERSION);

    // 1.1. Initialize OpenTelemetry (optional)
    if let Err(e) = telemetry::init_telemetry() {
        tracing::warn!(error = ?e, "Failed to initialize OpenTelemetry (continuing without it)");
    }

    // 2. Load configuration
    let redis_url =
        std::env::var("DRAY_REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string());
    let namespace = std::env::var("DRAY_NAMESPACE").ok();
    let queues: Vec<String> = std::env::var("DRAY_QUEUES")
        .unwrap_or_else(|_| DEFAULT_QUEUES.to_string())
        .split(',')
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .collect();

    info!(redis_url = %redis_url, queues = ?queues, "Connecting to store...");

    // 3. Connect to the store
    let store = Arc::new(RedisStore::new(connect(&redis_url).await?));

    // 4. Setup dependencies (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let registry = Arc::new(jobs::registry());

    let mut broker_config = BrokerConfig::default();
    if let Some(ns) = namespace {
        broker_config.namespace = ns;
    }
    let broker = Arc::new(Broker::new(
        store,
        registry,
        time_provider,
        broker_config,
    ));

    // 5. Start the worker (poll loop + heartbeat loop)
    let mut worker = Worker::new(broker, queues, &HostIdProvider, WorkerConfig::default());
    info!(worker_id = %worker.worker_id(), "Starting worker...");

    // Drain non-fatal error events into the log; external alerting would
    // hang off this same channel.
    let mut error_events = worker.error_events();
    tokio::spawn(async move {
        while let Some(event) = error_events.recv().await {
            tracing::warn!(
                worker_id = %event.worker_id,
                stage = ?event.stage,
                message = %event.message,
                "worker reported an error"
            );
        }
    });

    let handle = worker.start();

    info!("Worker running. Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Draining loops...");

    // 7. Graceful shutdown: both loops finish their current iteration
    handle.stop().await;

    info!("Shutdown complete.");

    Ok(())
}
