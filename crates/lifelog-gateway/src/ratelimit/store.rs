//! Window store: per-key request timestamp sequences.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Storage backend for rate-limit windows.
///
/// Keys map to ordered unix-millisecond timestamps. The limiter only needs
/// `get`/`set`; a distributed cache can implement this trait to make the
/// limiter correct across replicas.
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Returns the stored timestamps for a key, if any.
    async fn get(&self, key: &str) -> Option<Vec<u64>>;

    /// Replaces the stored timestamps for a key.
    ///
    /// Entries are created lazily on first set and never destroyed; unbounded
    /// growth across distinct keys is a known limitation of this design.
    async fn set(&self, key: &str, timestamps: Vec<u64>);
}

/// In-memory window store, process-local.
///
/// State is lost on restart and not shared across replicas.
#[derive(Debug, Default)]
pub struct MemoryWindowStore {
    entries: RwLock<HashMap<String, Vec<u64>>>,
}

impl MemoryWindowStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }

    /// Returns the number of tracked keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if no keys are tracked.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl WindowStore for MemoryWindowStore {
    async fn get(&self, key: &str) -> Option<Vec<u64>> {
        let entries = self.entries.read().await;
        entries.get(key).cloned()
    }

    async fn set(&self, key: &str, timestamps: Vec<u64>) {
        debug!(key = %key, count = timestamps.len(), "Persisting window");
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), timestamps);
    }
}
