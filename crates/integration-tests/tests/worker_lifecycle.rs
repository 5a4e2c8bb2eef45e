// Worker loop lifecycle: execution, failure reporting, panic containment,
// and cooperative shutdown of the poll and heartbeat loops.

use async_trait::async_trait;
use dray_core::application::{Broker, BrokerConfig, Worker, WorkerConfig, WorkerStage};
use dray_core::domain::Job;
use dray_core::port::id_provider::UuidProvider;
use dray_core::port::store::memory::MemoryStore;
use dray_core::port::time_provider::SystemTimeProvider;
use dray_core::port::JobRegistry;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared behavior switch for the test job: fail the first `fail_first`
/// executions, succeed afterwards; panic instead when `panic_always`.
#[derive(Debug)]
struct Behavior {
    executions: AtomicUsize,
    fail_first: usize,
    panic_always: bool,
}

impl Behavior {
    fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            executions: AtomicUsize::new(0),
            fail_first: 0,
            panic_always: false,
        })
    }

    fn failing(times: usize) -> Arc<Self> {
        Arc::new(Self {
            executions: AtomicUsize::new(0),
            fail_first: times,
            panic_always: false,
        })
    }

    fn panicking() -> Arc<Self> {
        Arc::new(Self {
            executions: AtomicUsize::new(0),
            fail_first: 0,
            panic_always: true,
        })
    }

    fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct Probe {
    queue: String,
    retries: i32,
    behavior: Arc<Behavior>,
}

#[async_trait]
impl Job for Probe {
    fn job_type(&self) -> &str {
        "Probe"
    }
    fn queue(&self) -> &str {
        &self.queue
    }
    fn arguments(&self) -> Vec<serde_json::Value> {
        vec![]
    }
    fn retries(&self) -> i32 {
        self.retries
    }
    fn set_retries(&mut self, retries: i32) {
        self.retries = retries;
    }
    async fn execute(&self) -> anyhow::Result<()> {
        let n = self.behavior.executions.fetch_add(1, Ordering::SeqCst);
        if self.behavior.panic_always {
            panic!("probe exploded");
        }
        if n < self.behavior.fail_first {
            anyhow::bail!("probe failure #{}", n + 1);
        }
        Ok(())
    }
}

fn fixture(behavior: Arc<Behavior>) -> Arc<Broker> {
    let mut registry = JobRegistry::new();
    registry.register("Probe", move |payload| {
        Ok(Box::new(Probe {
            queue: payload.queue.clone(),
            retries: 0,
            behavior: behavior.clone(),
        }))
    });
    Arc::new(Broker::new(
        Arc::new(MemoryStore::new()),
        Arc::new(registry),
        Arc::new(SystemTimeProvider),
        BrokerConfig::default(),
    ))
}

fn fast_config() -> WorkerConfig {
    WorkerConfig {
        checkin_interval: Duration::from_millis(10),
        no_work_delay: Duration::from_millis(5),
        internal_error_delay: Duration::from_millis(5),
    }
}

fn probes() -> Vec<String> {
    vec!["probes".to_string()]
}

fn probe_job(retries: i32, behavior: &Arc<Behavior>) -> Probe {
    Probe {
        queue: "probes".to_string(),
        retries,
        behavior: behavior.clone(),
    }
}

async fn eventually<F: Fn() -> bool>(condition: F, what: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for: {}",
            what
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn single_shot_executes_one_job_and_checks_in() {
    let behavior = Behavior::succeeding();
    let broker = fixture(behavior.clone());
    broker
        .enqueue(&probe_job(0, &behavior), false)
        .await
        .unwrap();

    let worker = Worker::new(broker.clone(), probes(), &UuidProvider, fast_config());
    worker.run_once().await;

    assert_eq!(behavior.executions(), 1);
    assert!(broker.jobs("probes").await.unwrap().is_empty());

    // inline heartbeat ran before the poll iteration
    let workers = broker.workers().await.unwrap();
    assert_eq!(workers.len(), 1);
    assert_eq!(workers[0].id, worker.worker_id());
    // lifecycle completed, no in-flight record left
    assert!(workers[0].in_flight.is_none());
}

#[tokio::test]
async fn failing_job_retries_then_parks_on_the_failed_list() {
    let behavior = Behavior::failing(usize::MAX);
    let broker = fixture(behavior.clone());
    broker
        .enqueue(&probe_job(1, &behavior), false)
        .await
        .unwrap();

    let worker = Worker::new(broker.clone(), probes(), &UuidProvider, fast_config());

    // first execution consumes the single retry
    worker.run_once().await;
    assert_eq!(broker.jobs("probes").await.unwrap()[0].retries, 0);

    // second execution exhausts the budget
    worker.run_once().await;
    assert_eq!(behavior.executions(), 2);
    assert!(broker.jobs("probes").await.unwrap().is_empty());

    let failed = broker.failed_jobs().await.unwrap();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].message.contains("probe failure"));
    assert_eq!(failed[0].worker, worker.worker_id());
}

#[tokio::test]
async fn execution_failure_is_published_to_the_error_channel() {
    let behavior = Behavior::failing(usize::MAX);
    let broker = fixture(behavior.clone());
    broker
        .enqueue(&probe_job(0, &behavior), false)
        .await
        .unwrap();

    let mut worker = Worker::new(broker.clone(), probes(), &UuidProvider, fast_config());
    let mut events = worker.error_events();
    worker.run_once().await;

    let event = events.recv().await.expect("an error event");
    assert_eq!(event.stage, WorkerStage::Execute);
    assert!(event.message.contains("probe failure"));
}

#[tokio::test]
async fn panicking_job_is_contained_and_fails_normally() {
    let behavior = Behavior::panicking();
    let broker = fixture(behavior.clone());
    broker
        .enqueue(&probe_job(0, &behavior), false)
        .await
        .unwrap();

    let worker = Worker::new(broker.clone(), probes(), &UuidProvider, fast_config());
    worker.run_once().await;

    let failed = broker.failed_jobs().await.unwrap();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].message.contains("panicked"));
}

#[tokio::test]
async fn decode_failure_is_absorbed_and_reported() {
    let behavior = Behavior::succeeding();
    let broker = fixture(behavior.clone());
    broker
        .enqueue_payload(&dray_core::domain::Payload {
            job_type: "NotRegistered".to_string(),
            queue: "probes".to_string(),
            arguments: vec![],
            retries: 0,
        })
        .await
        .unwrap();

    let mut worker = Worker::new(broker.clone(), probes(), &UuidProvider, fast_config());
    let mut events = worker.error_events();
    worker.run_once().await;

    let event = events.recv().await.expect("an error event");
    assert_eq!(event.stage, WorkerStage::Poll);
    assert!(event.message.contains("NotRegistered"));
}

#[tokio::test]
async fn started_worker_drains_the_queue_and_heartbeats() {
    let behavior = Behavior::succeeding();
    let broker = fixture(behavior.clone());
    for _ in 0..5 {
        broker
            .enqueue(&probe_job(0, &behavior), false)
            .await
            .unwrap();
    }

    let worker = Worker::new(broker.clone(), probes(), &UuidProvider, fast_config());
    let worker_id = worker.worker_id().to_string();
    let handle = worker.start();

    {
        let behavior = behavior.clone();
        eventually(move || behavior.executions() == 5, "all jobs executed").await;
    }

    let workers = broker.workers().await.unwrap();
    assert_eq!(workers.len(), 1);
    assert_eq!(workers[0].id, worker_id);
    assert_eq!(workers[0].queues, vec!["probes"]);

    handle.stop().await;
}

#[tokio::test]
async fn stop_returns_once_both_loops_have_drained() {
    let behavior = Behavior::succeeding();
    let broker = fixture(behavior.clone());

    let worker = Worker::new(broker.clone(), probes(), &UuidProvider, fast_config());
    let handle = worker.start();

    // let both loops reach their sleeps
    tokio::time::sleep(Duration::from_millis(30)).await;

    // stop implies shutdown; both loops observe the flag at their next
    // suspension point, so the await must complete promptly
    tokio::time::timeout(Duration::from_secs(5), handle.stop())
        .await
        .expect("stop() must return after both loops drain");
}

#[tokio::test]
async fn shutdown_is_non_blocking_and_loops_exit_between_iterations() {
    let behavior = Behavior::succeeding();
    let broker = fixture(behavior.clone());
    broker
        .enqueue(&probe_job(0, &behavior), false)
        .await
        .unwrap();

    let worker = Worker::new(broker.clone(), probes(), &UuidProvider, fast_config());
    let handle = worker.start();

    {
        let behavior = behavior.clone();
        eventually(move || behavior.executions() == 1, "job executed").await;
    }

    handle.shutdown(); // returns immediately
    tokio::time::timeout(Duration::from_secs(5), handle.stop())
        .await
        .expect("loops drain after shutdown");

    // the executed job completed its lifecycle before the loop exited
    assert!(broker.workers().await.unwrap()[0].in_flight.is_none());
}
