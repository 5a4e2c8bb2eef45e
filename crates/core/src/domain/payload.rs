// Wire types: queued payloads, failed-job records, worker snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The wire form of a job while resident in a queue list.
///
/// Schema: `{"type": string, "queue": string, "arguments": array,
/// "retries": integer}`. Immutable once pushed; `retries` defaults to 0 when
/// a foreign producer omits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(rename = "type")]
    pub job_type: String,
    pub queue: String,
    pub arguments: Vec<serde_json::Value>,
    #[serde(default)]
    pub retries: i32,
}

/// A job whose retry budget was exhausted, parked on the global failed list.
///
/// Append-only; never consumed automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedJob {
    pub work: Payload,
    pub worker: String,
    pub message: String,
    pub backtrace: Vec<String>,
}

/// The payload a worker is currently executing, with its start time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InFlightJob {
    pub started_at: DateTime<Utc>,
    pub work: Payload,
}

/// One entry of the heartbeat registry, as reported by introspection.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub id: String,
    pub last_checkin: DateTime<Utc>,
    pub queues: Vec<String>,
    /// Absent when the worker is idle.
    pub in_flight: Option<InFlightJob>,
}
