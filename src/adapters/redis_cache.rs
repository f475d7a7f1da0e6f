//! Redis implementation of the Cache port.
//!
//! Every operation fails open: a Redis error is logged and surfaces as a
//! cache miss (or a skipped write), never as a request failure.

use async_trait::async_trait;
use redis::AsyncCommands;

use crate::ports::Cache;

#[derive(Clone)]
pub struct RedisCache {
    client: redis::Client,
}

impl RedisCache {
    pub fn new(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Option<redis::aio::MultiplexedConnection> {
        match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => Some(conn),
            Err(err) => {
                tracing::warn!("Redis connection failed: {}", err);
                None
            }
        }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_json(&self, key: &str) -> Option<serde_json::Value> {
        let mut conn = self.connection().await?;

        let raw: Option<String> = match conn.get(key).await {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key = %key, "Cache read failed: {}", err);
                return None;
            }
        };

        raw.and_then(|value| match serde_json::from_str(&value) {
            Ok(json) => Some(json),
            Err(err) => {
                tracing::warn!(key = %key, "Dropping undecodable cache entry: {}", err);
                None
            }
        })
    }

    async fn set_json(&self, key: &str, value: &serde_json::Value, ttl_secs: u64) {
        let Some(mut conn) = self.connection().await else {
            return;
        };

        let serialized = match serde_json::to_string(value) {
            Ok(serialized) => serialized,
            Err(err) => {
                tracing::warn!(key = %key, "Cache serialization failed: {}", err);
                return;
            }
        };

        if let Err(err) = conn.set_ex::<_, _, ()>(key, serialized, ttl_secs).await {
            tracing::warn!(key = %key, "Cache write failed: {}", err);
        }
    }

    async fn invalidate_pattern(&self, pattern: &str) {
        let Some(mut conn) = self.connection().await else {
            return;
        };

        let keys: Vec<String> = {
            let mut iter = match conn.scan_match::<_, String>(pattern).await {
                Ok(iter) => iter,
                Err(err) => {
                    tracing::warn!(pattern = %pattern, "Cache scan failed: {}", err);
                    return;
                }
            };

            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            keys
        };

        if keys.is_empty() {
            return;
        }

        if let Err(err) = conn.del::<_, ()>(keys).await {
            tracing::warn!(pattern = %pattern, "Cache invalidation failed: {}", err);
        }
    }
}
