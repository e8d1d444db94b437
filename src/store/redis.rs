//! Redis-backed implementation of the store interface.
//!
//! The four-step rate-window update runs as a `MULTI`/`EXEC` pipeline so
//! concurrent requests from the same client cannot race past the limit.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{counter_key, mapping_key, KvStore, SlugMapping, WindowSample};

/// Store client over a shared multiplexed connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to the store. The connection manager reconnects on its own
    /// after transient failures.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get_mapping(&self, slug: &str) -> Result<Option<SlugMapping>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(mapping_key(slug))
            .query_async(&mut conn)
            .await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put_mapping(&self, mapping: &SlugMapping) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let key = mapping_key(&mapping.slug);
        let json = serde_json::to_string(mapping)?;

        // SET NX enforces slug uniqueness at the store.
        let created: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(json)
            .arg("NX")
            .query_async(&mut conn)
            .await?;
        if created.is_none() {
            return Err(StoreError::AlreadyExists(key));
        }

        let _: Option<String> = redis::cmd("SET")
            .arg(counter_key(&mapping.slug))
            .arg(0)
            .arg("NX")
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn incr_counter(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        let value: i64 = redis::cmd("INCR").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn record_window(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
    ) -> Result<WindowSample, StoreError> {
        let mut conn = self.conn.clone();
        let cutoff = now_ms - window_ms;
        // Member must be unique per request; two requests in the same
        // millisecond would otherwise collapse into one set entry.
        let member = format!("{}-{}", now_ms, Uuid::new_v4().simple());
        let ttl_secs = (window_ms / 1000).max(1);

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.cmd("ZADD").arg(key).arg(now_ms).arg(&member).ignore();
        pipe.cmd("ZREMRANGEBYSCORE")
            .arg(key)
            .arg("-inf")
            .arg(format!("({}", cutoff))
            .ignore();
        pipe.cmd("ZCARD").arg(key);
        pipe.cmd("EXPIRE").arg(key).arg(ttl_secs).ignore();

        let (count,): (u64,) = pipe.query_async(&mut conn).await?;

        let oldest: Vec<(String, i64)> = redis::cmd("ZRANGE")
            .arg(key)
            .arg(0)
            .arg(0)
            .arg("WITHSCORES")
            .query_async(&mut conn)
            .await?;

        Ok(WindowSample {
            count,
            oldest_ms: oldest.first().map(|(_, score)| *score),
        })
    }
}
