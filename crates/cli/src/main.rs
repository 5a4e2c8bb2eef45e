//! dray CLI - Operator interface for queues, workers, and failed jobs.
//! Talks to the shared store directly; no daemon required.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use dray_core::application::{Broker, BrokerConfig};
use dray_core::domain::Payload;
use dray_core::port::time_provider::SystemTimeProvider;
use dray_core::port::JobRegistry;
use dray_infra_redis::{connect, RedisStore};
use std::sync::Arc;
use tabled::{Table, Tabled};

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

#[derive(Parser)]
#[command(name = "dray")]
#[command(about = "dray job broker CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Redis URL of the shared store
    #[arg(long, env = "DRAY_REDIS_URL", default_value = DEFAULT_REDIS_URL)]
    redis_url: String,

    /// Key namespace
    #[arg(long, env = "DRAY_NAMESPACE", default_value = "dray")]
    namespace: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List known queues and their pending counts
    Queues,

    /// List pending payloads in a queue, head to tail
    Jobs {
        /// Queue name
        queue: String,
    },

    /// List failed jobs
    Failed,

    /// List workers in the heartbeat registry
    Workers,

    /// Enqueue a raw payload
    Enqueue {
        /// Job type identifier (must be registered in the consuming worker)
        #[arg(short = 't', long)]
        job_type: String,

        /// Queue name
        #[arg(short, long, default_value = "default")]
        queue: String,

        /// Positional argument, repeatable; parsed as JSON, falling back to
        /// a plain string (e.g. -a '"quoted"' -a 42 -a plain)
        #[arg(short = 'a', long = "arg")]
        args: Vec<String>,

        /// Retry budget
        #[arg(short, long, default_value = "0")]
        retries: i32,
    },
}

#[derive(Tabled)]
struct QueueRow {
    queue: String,
    pending: usize,
}

#[derive(Tabled)]
struct JobRow {
    #[tabled(rename = "type")]
    job_type: String,
    arguments: String,
    retries: i32,
}

#[derive(Tabled)]
struct FailedRow {
    worker: String,
    #[tabled(rename = "type")]
    job_type: String,
    queue: String,
    message: String,
}

#[derive(Tabled)]
struct WorkerRow {
    id: String,
    #[tabled(rename = "last checkin")]
    last_checkin: String,
    queues: String,
    #[tabled(rename = "current job")]
    current_job: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let store = Arc::new(RedisStore::new(connect(&cli.redis_url).await?));
    // Introspection and raw enqueue never construct jobs, so the registry
    // stays empty here.
    let broker = Broker::new(
        store,
        Arc::new(JobRegistry::new()),
        Arc::new(SystemTimeProvider),
        BrokerConfig {
            namespace: cli.namespace.clone(),
            ..BrokerConfig::default()
        },
    );

    match cli.command {
        Commands::Queues => {
            let mut rows = Vec::new();
            for queue in broker.queues().await? {
                let pending = broker.jobs(&queue).await?.len();
                rows.push(QueueRow { queue, pending });
            }
            if rows.is_empty() {
                println!("{}", "no queues".dimmed());
            } else {
                println!("{}", Table::new(rows));
            }
        }

        Commands::Jobs { queue } => {
            let rows: Vec<JobRow> = broker
                .jobs(&queue)
                .await?
                .into_iter()
                .map(|p| JobRow {
                    job_type: p.job_type,
                    arguments: serde_json::Value::Array(p.arguments).to_string(),
                    retries: p.retries,
                })
                .collect();
            if rows.is_empty() {
                println!("{}", format!("queue {} is empty", queue).dimmed());
            } else {
                println!("{}", Table::new(rows));
            }
        }

        Commands::Failed => {
            let failed = broker.failed_jobs().await?;
            if failed.is_empty() {
                println!("{}", "no failed jobs".green());
            } else {
                println!("{}", format!("{} failed job(s)", failed.len()).red().bold());
                let rows: Vec<FailedRow> = failed
                    .into_iter()
                    .map(|f| FailedRow {
                        worker: f.worker,
                        job_type: f.work.job_type,
                        queue: f.work.queue,
                        message: f.message,
                    })
                    .collect();
                println!("{}", Table::new(rows));
            }
        }

        Commands::Workers => {
            let rows: Vec<WorkerRow> = broker
                .workers()
                .await?
                .into_iter()
                .map(|w| WorkerRow {
                    id: w.id,
                    last_checkin: w.last_checkin.format("%Y-%m-%d %H:%M:%S").to_string(),
                    queues: w.queues.join(","),
                    current_job: match w.in_flight {
                        Some(in_flight) => format!(
                            "{} (since {})",
                            in_flight.work.job_type,
                            in_flight.started_at.format("%H:%M:%S")
                        ),
                        None => "-".to_string(),
                    },
                })
                .collect();
            if rows.is_empty() {
                println!("{}", "no workers checked in".dimmed());
            } else {
                println!("{}", Table::new(rows));
            }
        }

        Commands::Enqueue {
            job_type,
            queue,
            args,
            retries,
        } => {
            let arguments = args
                .iter()
                .map(|raw| {
                    serde_json::from_str(raw)
                        .unwrap_or_else(|_| serde_json::Value::String(raw.clone()))
                })
                .collect();
            let payload = Payload {
                job_type,
                queue,
                arguments,
                retries,
            };
            broker.enqueue_payload(&payload).await?;
            println!(
                "{} {} -> {}",
                "enqueued".green().bold(),
                payload.job_type,
                payload.queue
            );
        }
    }

    Ok(())
}
