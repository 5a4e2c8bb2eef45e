// Job capability trait

use async_trait::async_trait;

/// A unit of background work.
///
/// Concrete job types implement this trait and are registered under their
/// type identifier in a [`JobRegistry`](crate::port::JobRegistry); the broker
/// never learns the concrete type, only the identifier and the positional
/// argument list that reconstructs it.
///
/// Implementations must be `Send + Sync + 'static`: execution runs on a
/// spawned task so a panicking job cannot take the worker down with it.
#[async_trait]
pub trait Job: Send + Sync + std::fmt::Debug {
    /// Type identifier this job is registered under.
    fn job_type(&self) -> &str;

    /// Queue the job is routed to.
    fn queue(&self) -> &str;

    /// Positional constructor arguments, in declaration order.
    ///
    /// Trailing parameters with declared defaults may be omitted when a
    /// payload is decoded; `arguments` always returns the full list so an
    /// encode/decode round trip is stable.
    fn arguments(&self) -> Vec<serde_json::Value>;

    /// Remaining retry budget.
    fn retries(&self) -> i32;

    /// Overwrite the retry budget (set from the payload at decode time).
    fn set_retries(&mut self, retries: i32);

    /// Run the job's behavior. The only place job-specific logic executes.
    async fn execute(&self) -> anyhow::Result<()>;
}
