// Queue Coordinator
// Owns the queueing protocol on top of the Store port: enqueue,
// dequeue-with-reclaim, the worker heartbeat registry, the failure ledger,
// and introspection queries.

use crate::application::codec;
use crate::domain::{FailedJob, InFlightJob, Job, Payload, WorkerStatus};
use crate::error::Result;
use crate::port::{JobRegistry, Store, TimeProvider};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default staleness threshold: a worker that has not checked in for ten
/// heartbeat intervals (10 x 30s) is considered dead.
pub const DEFAULT_STALE_CHECKIN_SECS: i64 = 300;

/// Broker configuration, passed explicitly to [`Broker::new`].
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Key namespace prefix shared by every process of one deployment.
    pub namespace: String,
    /// Heartbeat age beyond which a worker is reaped.
    pub stale_checkin_secs: i64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            namespace: "dray".to_string(),
            stale_checkin_secs: DEFAULT_STALE_CHECKIN_SECS,
        }
    }
}

/// The queue coordination service.
///
/// Sits directly on the [`Store`]; every method is a small sequence of
/// single-key store operations. Multiple brokers over the same store
/// cooperate through the key layout alone, so producers, workers, and
/// operator tools can run in separate processes.
pub struct Broker {
    store: Arc<dyn Store>,
    registry: Arc<JobRegistry>,
    time: Arc<dyn TimeProvider>,
    config: BrokerConfig,
}

impl Broker {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<JobRegistry>,
        time: Arc<dyn TimeProvider>,
        config: BrokerConfig,
    ) -> Self {
        Self {
            store,
            registry,
            time,
            config,
        }
    }

    // Key layout: {ns}::queues, {ns}::queue::{q}, {ns}::failed,
    // {ns}::workers, {ns}::worker::{id}, {ns}::worker::{id}::job

    fn queues_key(&self) -> String {
        format!("{}::queues", self.config.namespace)
    }

    fn queue_key(&self, queue: &str) -> String {
        format!("{}::queue::{}", self.config.namespace, queue)
    }

    fn failed_key(&self) -> String {
        format!("{}::failed", self.config.namespace)
    }

    fn workers_key(&self) -> String {
        format!("{}::workers", self.config.namespace)
    }

    fn worker_key(&self, worker_id: &str) -> String {
        format!("{}::worker::{}", self.config.namespace, worker_id)
    }

    fn worker_job_key(&self, worker_id: &str) -> String {
        format!("{}::worker::{}::job", self.config.namespace, worker_id)
    }

    // ------------------------------------------------------------------
    // Producer surface
    // ------------------------------------------------------------------

    /// Enqueue a job. `retry = true` marks a failure-triggered requeue and
    /// consumes one retry in the encoded payload.
    pub async fn enqueue(&self, job: &dyn Job, retry: bool) -> Result<()> {
        self.enqueue_payload(&codec::encode(job, retry)).await
    }

    /// Push an already-encoded payload.
    ///
    /// The raw producer entry point: the wire form is language-independent,
    /// so foreign producers (and the CLI) enqueue without a registered type.
    pub async fn enqueue_payload(&self, payload: &Payload) -> Result<()> {
        self.store
            .set_add(&self.queues_key(), &payload.queue)
            .await?;
        self.store
            .list_push_back(&self.queue_key(&payload.queue), &serde_json::to_string(payload)?)
            .await?;
        debug!(queue = %payload.queue, job_type = %payload.job_type, "enqueued");
        Ok(())
    }

    /// Every queue name ever enqueued to. No ordering.
    pub async fn queues(&self) -> Result<Vec<String>> {
        self.store.set_members(&self.queues_key()).await
    }

    /// Every payload resident in a queue, head to tail.
    pub async fn jobs(&self, queue: &str) -> Result<Vec<Payload>> {
        let mut jobs = Vec::new();
        for raw in self.store.list_all(&self.queue_key(queue)).await? {
            jobs.push(serde_json::from_str(&raw)?);
        }
        Ok(jobs)
    }

    /// Every failed-job record, in append order.
    pub async fn failed_jobs(&self) -> Result<Vec<FailedJob>> {
        let mut failed = Vec::new();
        for raw in self.store.list_all(&self.failed_key()).await? {
            failed.push(serde_json::from_str(&raw)?);
        }
        Ok(failed)
    }

    /// Snapshot of the heartbeat registry: every known worker, its assigned
    /// queues, and its in-flight job if it has one.
    pub async fn workers(&self) -> Result<Vec<WorkerStatus>> {
        let mut statuses = Vec::new();
        for (worker_id, raw_checkin) in self.store.hash_get_all(&self.workers_key()).await? {
            let Ok(last_checkin) = raw_checkin.parse::<i64>() else {
                warn!(worker_id = %worker_id, value = %raw_checkin, "unreadable heartbeat entry");
                continue;
            };

            let queues = match self
                .store
                .hash_get(&self.worker_key(&worker_id), "queues")
                .await?
            {
                Some(raw) => serde_json::from_str(&raw)?,
                None => Vec::new(),
            };

            statuses.push(WorkerStatus {
                id: worker_id.clone(),
                last_checkin: timestamp(last_checkin),
                queues,
                in_flight: self.in_flight_job(&worker_id).await?,
            });
        }
        Ok(statuses)
    }

    async fn in_flight_job(&self, worker_id: &str) -> Result<Option<InFlightJob>> {
        let key = self.worker_job_key(worker_id);
        let Some(raw_work) = self.store.hash_get(&key, "work").await? else {
            return Ok(None);
        };
        let started_at = self
            .store
            .hash_get(&key, "started_at")
            .await?
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0);
        Ok(Some(InFlightJob {
            started_at: timestamp(started_at),
            work: serde_json::from_str(&raw_work)?,
        }))
    }

    // ------------------------------------------------------------------
    // Worker surface
    // ------------------------------------------------------------------

    /// Upsert the worker's heartbeat timestamp and assigned queues.
    /// Idempotent; safe to call repeatedly.
    pub async fn checkin(&self, worker_id: &str, queues: &[String]) -> Result<()> {
        let now = self.time.now_secs();
        self.store
            .hash_set(&self.workers_key(), worker_id, &now.to_string())
            .await?;
        self.store
            .hash_set(
                &self.worker_key(worker_id),
                "queues",
                &serde_json::to_string(queues)?,
            )
            .await?;
        Ok(())
    }

    /// Dequeue entry point: reclaim stuck work, then pop the head of the
    /// first non-empty assigned queue (in the order given) and decode it.
    ///
    /// Returns `None` when every assigned queue is empty. A decode failure
    /// (unknown type, unbindable arguments) surfaces as an error; the popped
    /// payload is not requeued and not moved to the failed list, so it is
    /// dropped — kept for wire-level compatibility.
    pub async fn get_work(&self, worker_id: &str, queues: &[String]) -> Result<Option<Box<dyn Job>>> {
        self.reclaim_stuck_work().await?;
        let Some(payload) = self.next_payload(queues).await? else {
            return Ok(None);
        };
        debug!(
            worker_id = %worker_id,
            queue = %payload.queue,
            job_type = %payload.job_type,
            retries = payload.retries,
            "dequeued work"
        );
        codec::decode(&self.registry, &payload).map(Some)
    }

    /// Record the worker's in-flight job: started-at now, payload encoded
    /// with its current (not yet decremented) retry budget.
    pub async fn start_work(&self, worker_id: &str, job: &dyn Job) -> Result<()> {
        let key = self.worker_job_key(worker_id);
        self.store
            .hash_set(&key, "started_at", &self.time.now_secs().to_string())
            .await?;
        self.store
            .hash_set(
                &key,
                "work",
                &serde_json::to_string(&codec::encode(job, false))?,
            )
            .await?;
        Ok(())
    }

    /// Delete the worker's in-flight record. No-op if none exists.
    pub async fn complete_work(&self, worker_id: &str) -> Result<()> {
        self.store.delete(&self.worker_job_key(worker_id)).await
    }

    /// Report a failed execution.
    ///
    /// With retry budget remaining the in-flight record is cleared and the
    /// job re-enqueued, consuming one retry. With the budget exhausted a
    /// failed-job record is appended instead; the in-flight record is left
    /// in place and is cleared by a later reclamation sweep.
    pub async fn fail_work(
        &self,
        worker_id: &str,
        job: &dyn Job,
        error: &anyhow::Error,
    ) -> Result<()> {
        if job.retries() > 0 {
            self.complete_work(worker_id).await?;
            self.enqueue(job, true).await
        } else {
            let record = FailedJob {
                work: codec::encode(job, false),
                worker: worker_id.to_string(),
                message: error.to_string(),
                backtrace: error.chain().skip(1).map(|cause| cause.to_string()).collect(),
            };
            info!(
                worker_id = %worker_id,
                job_type = %record.work.job_type,
                message = %record.message,
                "retries exhausted, parking job on the failed list"
            );
            self.store
                .list_push_back(&self.failed_key(), &serde_json::to_string(&record)?)
                .await
        }
    }

    // ------------------------------------------------------------------
    // Reclamation
    // ------------------------------------------------------------------

    /// Scan the heartbeat registry and reap every worker whose last checkin
    /// is older than the staleness threshold.
    ///
    /// Runs on the hot path of every [`get_work`](Self::get_work) call
    /// rather than on a timer, so the system self-heals whenever any worker
    /// asks for work. Entries with unreadable timestamps are skipped. The
    /// scan is read-then-write: two workers may reap the same stale worker
    /// and double-push its in-flight payload, an accepted at-least-once
    /// duplication.
    async fn reclaim_stuck_work(&self) -> Result<()> {
        let threshold = self.time.now_secs() - self.config.stale_checkin_secs;
        for (worker_id, raw_checkin) in self.store.hash_get_all(&self.workers_key()).await? {
            match raw_checkin.parse::<i64>() {
                Ok(last_checkin) if last_checkin < threshold => {
                    self.reap_worker(&worker_id).await?;
                }
                Ok(_) => {}
                Err(_) => {
                    warn!(worker_id = %worker_id, value = %raw_checkin, "skipping unreadable heartbeat entry");
                }
            }
        }
        Ok(())
    }

    /// Return a dead worker's in-flight payload (if any) to the tail of its
    /// original queue, unchanged — reclamation is not a failure and does not
    /// consume a retry — then delete all of the worker's bookkeeping.
    async fn reap_worker(&self, worker_id: &str) -> Result<()> {
        let job_key = self.worker_job_key(worker_id);
        if let Some(raw) = self.store.hash_get(&job_key, "work").await? {
            let payload: Payload = serde_json::from_str(&raw)?;
            info!(
                worker_id = %worker_id,
                queue = %payload.queue,
                job_type = %payload.job_type,
                "reclaiming in-flight work from dead worker"
            );
            self.store
                .list_push_back(&self.queue_key(&payload.queue), &raw)
                .await?;
        } else {
            info!(worker_id = %worker_id, "reaping idle dead worker");
        }
        self.store.delete(&job_key).await?;
        self.store.delete(&self.worker_key(worker_id)).await?;
        self.store.hash_delete(&self.workers_key(), worker_id).await?;
        Ok(())
    }

    async fn next_payload(&self, queues: &[String]) -> Result<Option<Payload>> {
        for queue in queues {
            if let Some(raw) = self.store.list_pop_front(&self.queue_key(queue)).await? {
                return Ok(Some(serde_json::from_str(&raw)?));
            }
        }
        Ok(None)
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
