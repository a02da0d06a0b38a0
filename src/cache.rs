//! TTL'd persistent cache for the latest aggregate

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use fjall::Keyspace;
use serde::Deserialize;
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Debug;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task;

use crate::error::GatewayError;
use crate::sensors::AggregateResult;

#[derive(Serialize, Deserialize)]
struct StoredEntry<T> {
    value: T,
    expires_at: u64, // Unix timestamp (seconds)
}

/// Embedded key-value store with per-entry expiry. Blocking store calls are
/// moved off the async runtime.
pub struct AggregateCache {
    store: Keyspace,
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> anyhow::Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

fn unix_now() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

impl AggregateCache {
    /// Open (or create) the cache at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(&path).open()?;
        let items = db.keyspace("cache", fjall::KeyspaceCreateOptions::default)?;
        Ok(AggregateCache { store: items })
    }

    /// Stores a serializable value with a time-to-live (TTL).
    #[tracing::instrument(name = "put_cache", level = "debug", skip(self, value))]
    pub async fn put<T: Serialize + Send + Debug + 'static>(
        &self,
        key: &str,
        value: T,
        ttl: Duration,
    ) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        let expires_at = SystemTime::now()
            .checked_add(ttl)
            .ok_or(anyhow!("TTL overflow"))?
            .duration_since(UNIX_EPOCH)?
            .as_secs();
        let entry = StoredEntry { value, expires_at };
        let bytes = postcard::to_stdvec(&entry)?;

        let _ = task::spawn_blocking(move || store.insert(key, bytes)).await?;
        Ok(())
    }

    /// Retrieves a value if it exists and has not expired. Expired entries
    /// are removed on read. `None` covers both misses and expiry.
    #[tracing::instrument(name = "query_cache", level = "debug", skip(self))]
    pub async fn get<T: DeserializeOwned + Send + 'static>(&self, key: &str) -> Result<Option<T>> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        let maybe_bytes: Option<Vec<u8>> =
            task::spawn_blocking(move || get_from_store(store, key_bytes)).await??;

        if let Some(bytes) = maybe_bytes {
            let entry: StoredEntry<T> = postcard::from_bytes(&bytes)?;
            let now = unix_now()?;

            if now < entry.expires_at {
                tracing::debug!("Key found and still fresh");
                Ok(Some(entry.value))
            } else {
                tracing::debug!("Key found but expired");
                self.remove(key).await?;
                Ok(None)
            }
        } else {
            tracing::debug!("Key not found");
            Ok(None)
        }
    }

    /// Remaining lifetime of `key` in seconds, without touching the entry:
    /// `None` when absent, `<= 0` when present but already expired.
    ///
    /// Readiness probes go through here so that checking readiness never
    /// mutates the cache.
    #[tracing::instrument(name = "probe_cache", level = "debug", skip(self))]
    pub async fn ttl_remaining<T: DeserializeOwned + Send + 'static>(
        &self,
        key: &str,
    ) -> Result<Option<i64>> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        let maybe_bytes: Option<Vec<u8>> =
            task::spawn_blocking(move || get_from_store(store, key_bytes)).await??;

        let Some(bytes) = maybe_bytes else {
            return Ok(None);
        };
        let entry: StoredEntry<T> = postcard::from_bytes(&bytes)?;
        let now = unix_now()?;
        Ok(Some(entry.expires_at as i64 - now as i64))
    }

    /// Manually removes a key from the cache.
    pub async fn remove(&self, key: &str) -> Result<()> {
        let key = key.as_bytes().to_vec();
        let store = self.store.clone();
        let _ = task::spawn_blocking(move || store.remove(key)).await?;
        Ok(())
    }
}

/// Narrow cache contract the coordinator and readiness check rely on:
/// present-vs-absent and remaining TTL, nothing else.
#[async_trait]
pub trait AggregateStore: Send + Sync {
    async fn get(&self, key: &str) -> crate::Result<Option<AggregateResult>>;
    async fn put(
        &self,
        key: &str,
        value: AggregateResult,
        ttl: Duration,
    ) -> crate::Result<()>;
    async fn ttl_remaining(&self, key: &str) -> crate::Result<Option<i64>>;
}

#[async_trait]
impl AggregateStore for AggregateCache {
    async fn get(&self, key: &str) -> crate::Result<Option<AggregateResult>> {
        AggregateCache::get::<AggregateResult>(self, key)
            .await
            .map_err(|e| GatewayError::cache(e.to_string()))
    }

    async fn put(
        &self,
        key: &str,
        value: AggregateResult,
        ttl: Duration,
    ) -> crate::Result<()> {
        AggregateCache::put(self, key, value, ttl)
            .await
            .map_err(|e| GatewayError::cache(e.to_string()))
    }

    async fn ttl_remaining(&self, key: &str) -> crate::Result<Option<i64>> {
        AggregateCache::ttl_remaining::<AggregateResult>(self, key)
            .await
            .map_err(|e| GatewayError::cache(e.to_string()))
    }
}
