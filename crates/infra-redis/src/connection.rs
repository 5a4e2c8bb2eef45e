// Redis connection setup

use crate::store_impl::map_redis_error;
use dray_core::error::Result;
use redis::aio::ConnectionManager;
use tracing::info;

/// Open a managed connection to the Redis server at `url`
/// (e.g. `redis://127.0.0.1:6379`).
///
/// The returned manager reconnects transparently; individual command
/// failures during an outage surface as `AppError::Store` and are absorbed
/// by the worker loops' backoff.
pub async fn connect(url: &str) -> Result<ConnectionManager> {
    let client = redis::Client::open(url).map_err(map_redis_error)?;
    let manager = ConnectionManager::new(client)
        .await
        .map_err(map_redis_error)?;
    info!(url = %url, "connected to redis");
    Ok(manager)
}
