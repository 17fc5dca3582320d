//! Query result cache
//!
//! Maps [`QuerySignature`]s to shared payloads with a fixed TTL. Expired
//! entries are treated as absent and evicted lazily, by the next read or
//! write of the same key. [`QueryCache::purge_expired`] is available for
//! callers that want a proactive sweep.
//!
//! The cache holds at most `max_entries` results. Inserting a new signature
//! into a full cache first drops expired entries, then the oldest one.
//!
//! One instance is constructed per process and shared through an `Arc`; tests
//! construct their own.

use crate::signature::QuerySignature;
use crate::types::QueryPayload;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use taskora_config::CacheConfig;
use tokio::time::Instant;
use tracing::{debug, info};

/// Default cache TTL
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Default entry bound
pub const DEFAULT_MAX_ENTRIES: usize = 500;

struct CacheEntry {
    payload: Arc<QueryPayload>,
    created_at: Instant,
}

/// Snapshot of the cache for debugging surfaces
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of live entries
    pub entries: usize,
    /// Signatures of live entries, sorted
    pub signatures: Vec<String>,
}

/// Process-wide query cache
pub struct QueryCache {
    entries: Mutex<HashMap<QuerySignature, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    /// Bound the number of entries; zero is treated as one
    #[must_use]
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl()).with_max_entries(config.max_entries)
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.duration_since(entry.created_at) > self.ttl
    }

    /// Cached payload if present and not older than the TTL
    pub fn get(&self, signature: &QuerySignature) -> Option<Arc<QueryPayload>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let expired = match entries.get(signature) {
            None => return None,
            Some(entry) => self.is_expired(entry, now),
        };

        if expired {
            entries.remove(signature);
            debug!(signature = %signature, "Cache entry expired");
            return None;
        }

        entries.get(signature).map(|entry| Arc::clone(&entry.payload))
    }

    /// Store a payload, replacing any previous entry for the signature
    pub fn set(&self, signature: QuerySignature, payload: Arc<QueryPayload>) {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        if !entries.contains_key(&signature) && entries.len() >= self.max_entries {
            entries.retain(|_, entry| !self.is_expired(entry, now));
            if entries.len() >= self.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.created_at)
                    .map(|(sig, _)| sig.clone());
                if let Some(oldest) = oldest {
                    debug!(signature = %oldest, "Evicting oldest cache entry");
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            signature,
            CacheEntry {
                payload,
                created_at: now,
            },
        );
    }

    /// Remove every entry whose table name starts with `table_prefix`
    ///
    /// Returns the number of entries removed.
    pub fn invalidate(&self, table_prefix: &str) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|sig, _| !sig.matches_table_prefix(table_prefix));
        let removed = before - entries.len();

        if removed > 0 {
            info!(table_prefix, removed, "Invalidated cached queries");
        }
        removed
    }

    /// Clear the cache, returning the number of entries removed
    pub fn invalidate_all(&self) -> usize {
        let mut entries = self.entries.lock();
        let removed = entries.len();
        entries.clear();
        info!(removed, "Invalidated all cached queries");
        removed
    }

    /// Drop every expired entry
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry, now));
        before - entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.entries.lock();
        let mut signatures: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| !self.is_expired(entry, now))
            .map(|(sig, _)| sig.to_string())
            .collect();
        signatures.sort();

        CacheStats {
            entries: signatures.len(),
            signatures,
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
