//! In-memory key-value store.
//!
//! The default backing store for single-process deployments and tests.
//! Entries expire on read; `cleanup_expired` performs a full sweep.

use super::{KvStore, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn new(value: &[u8], ttl: Duration) -> StoreResult<Self> {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            let ttl = ChronoDuration::from_std(ttl)
                .map_err(|e| StoreError::Unknown(format!("ttl out of range: {}", e)))?;
            Some(Utc::now() + ttl)
        };
        Ok(Self {
            value: value.to_vec(),
            expires_at,
        })
    }

    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => Utc::now() >= expires,
            None => false,
        }
    }
}

/// An in-memory `KvStore` using tokio RwLocks.
///
/// Sorted indexes are kept as score-ordered BTreeMaps keyed by
/// `(score_bits, member)` so range queries stay ordered and cheap.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, Entry>>,
    indexes: RwLock<HashMap<String, BTreeMap<(u64, String), f64>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes all expired entries.
    pub async fn cleanup_expired(&self) {
        let mut data = self.data.write().await;
        data.retain(|_, entry| !entry.is_expired());
    }

    /// Clears all entries and indexes.
    pub async fn clear(&self) {
        self.data.write().await.clear();
        self.indexes.write().await.clear();
    }

    /// Current number of live keyed entries.
    pub async fn len(&self) -> usize {
        let data = self.data.read().await;
        data.values().filter(|e| !e.is_expired()).count()
    }

    /// Whether the store holds no live keyed entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    // f64 scores are non-negative timestamps here, so the raw bit pattern
    // orders the same way as the float value.
    fn score_key(score: f64, member: &str) -> (u64, String) {
        (score.max(0.0).to_bits(), member.to_string())
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let data = self.data.read().await;
        match data.get(key) {
            Some(entry) if !entry.is_expired() => Ok(Some(entry.value.clone())),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        let entry = Entry::new(value, ttl)?;
        let mut data = self.data.write().await;
        data.insert(key.to_string(), entry);
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<bool> {
        let entry = Entry::new(value, ttl)?;
        let mut data = self.data.write().await;
        match data.get(key) {
            Some(existing) if !existing.is_expired() => Ok(false),
            _ => {
                data.insert(key.to_string(), entry);
                Ok(true)
            }
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        match data.remove(key) {
            Some(entry) => Ok(!entry.is_expired()),
            None => Ok(false),
        }
    }

    async fn index_add(&self, key: &str, member: &str, score: f64) -> StoreResult<()> {
        let mut indexes = self.indexes.write().await;
        let index = indexes.entry(key.to_string()).or_default();
        // Drop any previous position for this member before re-inserting.
        index.retain(|(_, m), _| m != member);
        index.insert(Self::score_key(score, member), score);
        Ok(())
    }

    async fn index_range(&self, key: &str, min: f64, max: f64) -> StoreResult<Vec<String>> {
        let indexes = self.indexes.read().await;
        let Some(index) = indexes.get(key) else {
            return Ok(Vec::new());
        };
        Ok(index
            .iter()
            .filter(|(_, score)| **score >= min && **score <= max)
            .map(|((_, member), _)| member.clone())
            .collect())
    }

    async fn index_prune(&self, key: &str, cutoff: f64) -> StoreResult<u64> {
        let mut indexes = self.indexes.write().await;
        let Some(index) = indexes.get_mut(key) else {
            return Ok(0);
        };
        let before = index.len();
        index.retain(|_, score| *score >= cutoff);
        Ok((before - index.len()) as u64)
    }
}
