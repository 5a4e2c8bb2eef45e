// Application Layer - Queue coordination and worker execution

pub mod broker;
pub mod codec;
pub mod worker;

// Re-exports
pub use broker::{Broker, BrokerConfig};
pub use worker::{shutdown_channel, Worker, WorkerConfig, WorkerError, WorkerHandle, WorkerStage};
