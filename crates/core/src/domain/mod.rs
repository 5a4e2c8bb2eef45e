// Domain Layer - Job capability trait and wire types

pub mod job;
pub mod payload;

// Re-exports
pub use job::Job;
pub use payload::{FailedJob, InFlightJob, Payload, WorkerStatus};
