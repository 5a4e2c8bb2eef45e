// Job Codec
// Serializes jobs into wire payloads and reconstructs executable instances
// through the job-type registry.

use crate::domain::{Job, Payload};
use crate::error::{AppError, Result};
use crate::port::JobRegistry;
use serde::de::DeserializeOwned;

/// Encode a job into its wire payload.
///
/// A failure-triggered requeue (`retry = true`) consumes one retry: the
/// encoded `retries` field is the job's current budget minus one.
pub fn encode(job: &dyn Job, retry: bool) -> Payload {
    Payload {
        job_type: job.job_type().to_string(),
        queue: job.queue().to_string(),
        arguments: job.arguments(),
        retries: if retry {
            job.retries() - 1
        } else {
            job.retries()
        },
    }
}

/// Decode a payload into an executable job instance.
///
/// Looks the type identifier up in the registry and binds the argument list
/// through the type's factory; the decoded job's retry budget comes from the
/// payload (0 when the producer omitted it, via serde default).
///
/// # Errors
/// - `AppError::UnknownJobType` when the identifier is not registered
/// - `AppError::MissingArgument` / `AppError::InvalidArgument` from binding
pub fn decode(registry: &JobRegistry, payload: &Payload) -> Result<Box<dyn Job>> {
    let mut job = registry.construct(payload)?;
    job.set_retries(payload.retries);
    Ok(job)
}

/// Bind the positional argument at `index`, failing when absent.
pub fn required_arg<T: DeserializeOwned>(payload: &Payload, index: usize) -> Result<T> {
    match payload.arguments.get(index) {
        Some(value) => bind(payload, index, value),
        None => Err(AppError::MissingArgument {
            job_type: payload.job_type.clone(),
            index,
        }),
    }
}

/// Bind the positional argument at `index`, substituting the declared
/// default when the argument list is too short.
pub fn optional_arg<T: DeserializeOwned>(payload: &Payload, index: usize, default: T) -> Result<T> {
    match payload.arguments.get(index) {
        Some(value) => bind(payload, index, value),
        None => Ok(default),
    }
}

fn bind<T: DeserializeOwned>(payload: &Payload, index: usize, value: &serde_json::Value) -> Result<T> {
    serde_json::from_value(value.clone()).map_err(|e| AppError::InvalidArgument {
        job_type: payload.job_type.clone(),
        index,
        reason: e.to_string(),
    })
}
