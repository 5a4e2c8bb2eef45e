// dray Core - Queue protocol, worker loop, ports
// NO infrastructure dependencies: the store and host identity are injected.

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
