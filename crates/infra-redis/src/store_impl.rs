// Redis Store Implementation

use async_trait::async_trait;
use dray_core::error::{AppError, Result};
use dray_core::port::Store;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, ErrorKind};

// Helper to convert redis::RedisError to AppError with a usable category
pub(crate) fn map_redis_error(err: redis::RedisError) -> AppError {
    match err.kind() {
        ErrorKind::IoError => AppError::Store(format!("connection error: {}", err)),
        ErrorKind::AuthenticationFailed => {
            AppError::Store(format!("authentication failed: {}", err))
        }
        ErrorKind::TypeError => AppError::Store(format!("unexpected value type: {}", err)),
        ErrorKind::ResponseError => AppError::Store(format!("server error: {}", err)),
        _ => AppError::Store(format!("redis error: {}", err)),
    }
}

/// [`Store`] adapter over a managed Redis connection.
///
/// Every port operation maps to a single Redis command, which provides the
/// single-operation atomicity the broker protocol relies on.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn set_add(&self, key: &str, member: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.sadd::<_, _, ()>(key, member)
            .await
            .map_err(map_redis_error)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        conn.smembers(key).await.map_err(map_redis_error)
    }

    async fn list_push_back(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.rpush::<_, _, ()>(key, value)
            .await
            .map_err(map_redis_error)
    }

    async fn list_pop_front(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.lpop(key, None).await.map_err(map_redis_error)
    }

    async fn list_all(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        conn.lrange(key, 0, -1).await.map_err(map_redis_error)
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(key, field, value)
            .await
            .map_err(map_redis_error)
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.hget(key, field).await.map_err(map_redis_error)
    }

    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>> {
        let mut conn = self.conn.clone();
        conn.hgetall(key).await.map_err(map_redis_error)
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.hdel::<_, _, ()>(key, field)
            .await
            .map_err(map_redis_error)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(map_redis_error)
    }
}

// Integration tests need a live server; run with
//   DRAY_TEST_REDIS_URL=redis://127.0.0.1:6379 cargo test -- --ignored
#[cfg(test)]
mod tests {
    use super::*;
    use crate::connect;

    async fn test_store() -> RedisStore {
        let url = std::env::var("DRAY_TEST_REDIS_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        RedisStore::new(connect(&url).await.expect("redis server reachable"))
    }

    #[tokio::test]
    #[ignore = "requires a running redis server"]
    async fn list_round_trip() {
        let store = test_store().await;
        let key = "dray-test::list";
        store.delete(key).await.unwrap();

        store.list_push_back(key, "a").await.unwrap();
        store.list_push_back(key, "b").await.unwrap();
        assert_eq!(store.list_all(key).await.unwrap(), vec!["a", "b"]);
        assert_eq!(store.list_pop_front(key).await.unwrap(), Some("a".into()));
        assert_eq!(store.list_pop_front(key).await.unwrap(), Some("b".into()));
        assert_eq!(store.list_pop_front(key).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore = "requires a running redis server"]
    async fn hash_round_trip() {
        let store = test_store().await;
        let key = "dray-test::hash";
        store.delete(key).await.unwrap();

        store.hash_set(key, "f1", "v1").await.unwrap();
        store.hash_set(key, "f2", "v2").await.unwrap();
        assert_eq!(store.hash_get(key, "f1").await.unwrap(), Some("v1".into()));
        assert_eq!(store.hash_get_all(key).await.unwrap().len(), 2);

        store.hash_delete(key, "f1").await.unwrap();
        assert_eq!(store.hash_get(key, "f1").await.unwrap(), None);

        store.delete(key).await.unwrap();
        assert!(store.hash_get_all(key).await.unwrap().is_empty());
    }
}
