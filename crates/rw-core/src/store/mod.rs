//! Key-value store abstraction backing profiles, sliding windows, and
//! handler-side deny lists and quotas.
//!
//! The `KvStore` trait supports TTL expiry, an atomic set-if-absent used by
//! idempotent handlers, and a sorted time-index used for sliding-window
//! velocity counters and time-ordered incident lookup. Any key-value cache
//! can back it; store unavailability always degrades, never errors out of
//! risk scoring.

mod incident;
mod memory;

pub use incident::{IncidentStore, MemoryIncidentStore};
pub use memory::MemoryStore;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// Failed to reach the backing store.
    #[error("store connection failed: {0}")]
    Connection(String),

    /// Failed to serialize or deserialize stored data.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The store is disabled or intentionally unavailable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// An unknown error occurred.
    #[error("unknown store error: {0}")]
    Unknown(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A TTL-aware key-value store with a sorted time index.
///
/// Implementations must be thread-safe. A TTL of `Duration::ZERO` means
/// the entry never expires.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Gets a value by key. Expired entries read as `None`.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Sets a value with a TTL.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()>;

    /// Sets a value only if the key is absent (or expired).
    ///
    /// Returns `true` if the value was written, `false` if the key already
    /// held a live entry. This is the upsert primitive deny-list and quota
    /// handlers rely on to stay idempotent under concurrent incidents.
    async fn set_nx(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<bool>;

    /// Deletes a key. Returns `true` if a live entry existed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Adds a member to the sorted index under `key` with the given score.
    ///
    /// Scores are typically unix timestamps. Re-adding an existing member
    /// updates its score.
    async fn index_add(&self, key: &str, member: &str, score: f64) -> StoreResult<()>;

    /// Returns members of the sorted index with scores in `[min, max]`,
    /// ordered by score ascending.
    async fn index_range(&self, key: &str, min: f64, max: f64) -> StoreResult<Vec<String>>;

    /// Removes members with scores strictly below `cutoff`.
    ///
    /// Returns the number of members removed. Sliding windows call this
    /// lazily on each access to prune entries past the horizon.
    async fn index_prune(&self, key: &str, cutoff: f64) -> StoreResult<u64>;
}

/// Serializes a value for storage.
pub fn encode<T: serde::Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Deserializes a stored value.
pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Connection("redis://localhost:6379".to_string());
        assert!(err.to_string().contains("redis://localhost:6379"));

        let err = StoreError::Unavailable("maintenance".to_string());
        assert!(err.to_string().contains("maintenance"));
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let value = vec!["a".to_string(), "b".to_string()];
        let bytes = encode(&value).unwrap();
        let back: Vec<String> = decode(&bytes).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result: StoreResult<Vec<String>> = decode(b"not json");
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
