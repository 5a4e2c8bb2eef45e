// Worker - poll/execute/report loop plus heartbeat loop

pub mod constants;
mod shutdown;

use constants::*;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::broker::Broker;
use crate::domain::Job;
use crate::error::Result;
use crate::port::IdProvider;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Worker loop configuration, passed explicitly to [`Worker::new`].
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub checkin_interval: Duration,
    pub no_work_delay: Duration,
    pub internal_error_delay: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            checkin_interval: CHECKIN_INTERVAL,
            no_work_delay: NO_WORK_DELAY,
            internal_error_delay: INTERNAL_ERROR_DELAY,
        }
    }
}

/// Which loop surfaced a non-fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStage {
    Poll,
    Checkin,
    Execute,
}

/// A non-fatal error event, published to the registered error channel.
///
/// Consumed by external alerting; never affects loop control flow.
#[derive(Debug, Clone)]
pub struct WorkerError {
    pub worker_id: String,
    pub stage: WorkerStage,
    pub message: String,
}

/// One worker process's execution engine.
///
/// Two loops run concurrently: the poll loop
/// ([`run`](Self::run)) pulls and executes work, the heartbeat loop
/// ([`checkin_loop`](Self::checkin_loop)) refreshes the liveness timestamp.
/// [`start`](Self::start) spawns both under a shared shutdown token;
/// [`run_once`](Self::run_once) is the single-shot mode with the heartbeat
/// run inline.
///
/// Every failure mode inside the loops is logged, published to the error
/// channel, and absorbed with a backoff delay; the only way the loops stop
/// is the shutdown signal.
pub struct Worker {
    broker: Arc<Broker>,
    queues: Vec<String>,
    worker_id: String,
    config: WorkerConfig,
    error_tx: Option<mpsc::Sender<WorkerError>>,
}

impl Worker {
    /// Create a worker assigned to `queues` (immutable for the process
    /// lifetime) with a freshly generated worker id.
    pub fn new(
        broker: Arc<Broker>,
        queues: Vec<String>,
        id_provider: &dyn IdProvider,
        config: WorkerConfig,
    ) -> Self {
        Self {
            broker,
            queues,
            worker_id: id_provider.generate_id(),
            config,
            error_tx: None,
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub fn queues(&self) -> &[String] {
        &self.queues
    }

    /// Register the error observer: returns the receiving end of a bounded
    /// channel carrying every non-fatal error either loop encounters.
    /// When the channel is full events are dropped, never blocking a loop.
    pub fn error_events(&mut self) -> mpsc::Receiver<WorkerError> {
        let (tx, rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
        self.error_tx = Some(tx);
        rx
    }

    fn report(&self, stage: WorkerStage, message: String) {
        if let Some(tx) = &self.error_tx {
            if tx
                .try_send(WorkerError {
                    worker_id: self.worker_id.clone(),
                    stage,
                    message,
                })
                .is_err()
            {
                debug!(worker_id = %self.worker_id, "error channel full, dropping event");
            }
        }
    }

    /// Spawn the poll loop and the heartbeat loop as concurrent tasks under
    /// one shutdown token.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, token) = shutdown_channel();
        let worker = Arc::new(self);

        let poll = tokio::spawn({
            let worker = worker.clone();
            let token = token.clone();
            async move { worker.run(token).await }
        });
        let heartbeat = tokio::spawn({
            let worker = worker;
            async move { worker.checkin_loop(token).await }
        });

        WorkerHandle {
            shutdown: shutdown_tx,
            tasks: vec![poll, heartbeat],
        }
    }

    /// The poll loop: until shutdown, ask the broker for work and run the
    /// per-job lifecycle. No work sleeps the no-work delay; a poll error
    /// (store or decode failure) is logged, reported, and followed by the
    /// internal-error delay — never fatal.
    pub async fn run(&self, mut shutdown: ShutdownToken) {
        info!(worker_id = %self.worker_id, queues = ?self.queues, "worker started");
        loop {
            if shutdown.is_shutdown() {
                break;
            }
            match self.poll_once().await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(worker_id = %self.worker_id, "no work found");
                    if shutdown.sleep(self.config.no_work_delay).await {
                        break;
                    }
                }
                Err(e) => {
                    error!(worker_id = %self.worker_id, error = %e, "error looking for work");
                    self.report(WorkerStage::Poll, e.to_string());
                    if shutdown.sleep(self.config.internal_error_delay).await {
                        break;
                    }
                }
            }
        }
        info!(worker_id = %self.worker_id, "worker stopped");
    }

    /// The heartbeat loop: until shutdown, check in and sleep the checkin
    /// interval. Checkin errors are logged and reported but never end the
    /// loop.
    pub async fn checkin_loop(&self, mut shutdown: ShutdownToken) {
        loop {
            if shutdown.is_shutdown() {
                break;
            }
            debug!(worker_id = %self.worker_id, "checking in");
            if let Err(e) = self.broker.checkin(&self.worker_id, &self.queues).await {
                error!(worker_id = %self.worker_id, error = %e, "error checking in");
                self.report(WorkerStage::Checkin, e.to_string());
            }
            if shutdown.sleep(self.config.checkin_interval).await {
                break;
            }
        }
        debug!(worker_id = %self.worker_id, "heartbeat stopped");
    }

    /// Single-shot mode: one inline checkin, then exactly one poll
    /// iteration — including its backoff sleeps — regardless of outcome.
    pub async fn run_once(&self) {
        if let Err(e) = self.broker.checkin(&self.worker_id, &self.queues).await {
            error!(worker_id = %self.worker_id, error = %e, "error checking in");
            self.report(WorkerStage::Checkin, e.to_string());
        }
        match self.poll_once().await {
            Ok(true) => {}
            Ok(false) => tokio::time::sleep(self.config.no_work_delay).await,
            Err(e) => {
                error!(worker_id = %self.worker_id, error = %e, "error looking for work");
                self.report(WorkerStage::Poll, e.to_string());
                tokio::time::sleep(self.config.internal_error_delay).await;
            }
        }
    }

    /// One poll iteration. Returns `Ok(true)` when a job was pulled and its
    /// lifecycle completed (in success or failure), `Ok(false)` when every
    /// assigned queue was empty.
    async fn poll_once(&self) -> Result<bool> {
        let Some(job) = self.broker.get_work(&self.worker_id, &self.queues).await? else {
            return Ok(false);
        };

        let job: Arc<dyn Job> = Arc::from(job);
        debug!(worker_id = %self.worker_id, job_type = %job.job_type(), "starting work");
        self.broker.start_work(&self.worker_id, job.as_ref()).await?;

        // Execute on a spawned task: a panicking job is converted into an
        // execution failure instead of taking the worker down.
        let outcome = tokio::spawn({
            let job = job.clone();
            async move { job.execute().await }
        })
        .await;

        match outcome {
            Ok(Ok(())) => {
                debug!(worker_id = %self.worker_id, job_type = %job.job_type(), "completing work");
                self.broker.complete_work(&self.worker_id).await?;
            }
            Ok(Err(e)) => {
                error!(worker_id = %self.worker_id, job_type = %job.job_type(), error = %e, "error executing work");
                self.broker.fail_work(&self.worker_id, job.as_ref(), &e).await?;
                self.report(WorkerStage::Execute, e.to_string());
            }
            Err(join_err) => {
                let e = anyhow::anyhow!("job panicked: {join_err}");
                error!(worker_id = %self.worker_id, job_type = %job.job_type(), error = %e, "job panicked");
                self.broker.fail_work(&self.worker_id, job.as_ref(), &e).await?;
                self.report(WorkerStage::Execute, e.to_string());
            }
        }
        Ok(true)
    }
}

/// Handle to a started worker's task pair.
pub struct WorkerHandle {
    shutdown: ShutdownSender,
    tasks: Vec<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request shutdown without blocking. Both loops observe the flag
    /// between iterations.
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// Request shutdown and wait until both loops have observed it and
    /// exited their current iteration.
    pub async fn stop(self) {
        self.shutdown.shutdown();
        for task in self.tasks {
            let _ = task.await;
        }
    }
}
