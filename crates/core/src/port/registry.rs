// Job Type Registry
// Explicit type-identifier -> factory map. Replaces runtime type discovery:
// every job type a worker can execute is registered up front, which keeps
// construction testable and the set of executable types auditable.

use crate::domain::{Job, Payload};
use crate::error::{AppError, Result};
use std::collections::HashMap;

type Factory = dyn Fn(&Payload) -> Result<Box<dyn Job>> + Send + Sync;

/// Maps a job type identifier to a factory constructing the job from a
/// decoded payload.
///
/// Factories receive the whole payload so the constructed job carries the
/// payload's queue; argument binding uses the positional helpers in
/// [`codec`](crate::application::codec).
///
/// ```ignore
/// let mut registry = JobRegistry::new();
/// registry.register("SendEmail", |payload| {
///     Ok(Box::new(SendEmail {
///         queue: payload.queue.clone(),
///         to: codec::required_arg(payload, 0)?,
///         retries: 0,
///     }))
/// });
/// ```
#[derive(Default)]
pub struct JobRegistry {
    factories: HashMap<String, Box<Factory>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a type identifier, replacing any previous
    /// registration for the same identifier.
    pub fn register<F>(&mut self, job_type: impl Into<String>, factory: F)
    where
        F: Fn(&Payload) -> Result<Box<dyn Job>> + Send + Sync + 'static,
    {
        self.factories.insert(job_type.into(), Box::new(factory));
    }

    /// Construct a job instance for a payload.
    ///
    /// # Errors
    /// - `AppError::UnknownJobType` when the payload's type is not registered
    /// - whatever the factory returns for unbindable arguments
    pub fn construct(&self, payload: &Payload) -> Result<Box<dyn Job>> {
        let factory = self
            .factories
            .get(&payload.job_type)
            .ok_or_else(|| AppError::UnknownJobType(payload.job_type.clone()))?;
        factory(payload)
    }

    pub fn contains(&self, job_type: &str) -> bool {
        self.factories.contains_key(job_type)
    }
}
