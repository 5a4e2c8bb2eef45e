// dray Infrastructure - Redis Adapter
// Implements: Store

mod connection;
mod store_impl;

pub use connection::connect;
pub use store_impl::RedisStore;

// Note: redis::RedisError conversion is handled by a helper function here
// due to Rust's orphan rules (cannot implement From<redis::RedisError> for
// AppError in this crate).
