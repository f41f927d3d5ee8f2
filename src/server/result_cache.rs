//! Two-tier prediction cache
//!
//! - Exact layer: canonical [`CacheKey`] → prediction, bounded by insert
//!   refusal. Once full, new keys are dropped until an explicit clear.
//! - Memo layer: raw scalar arguments → prediction, wrapped around the model
//!   call, with least-recently-used eviction.

use crate::error::PredictError;
use crate::models::{CacheKey, FeatureVector, ScalarKey};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

pub struct ResultCache {
    exact: RwLock<HashMap<CacheKey, f64>>,
    max_entries: usize,
    memo: Mutex<LruCache<ScalarKey, f64>>,
    dropped_inserts: AtomicU64,
}

/// Entries removed by [`ResultCache::clear`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClearStats {
    pub exact_removed: usize,
    pub memo_removed: usize,
}

/// Cache statistics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub cache_size: usize,
    pub max_entries: usize,
    pub memo_size: usize,
    pub memo_capacity: usize,
    pub dropped_inserts: u64,
}

impl ResultCache {
    pub fn new(max_entries: usize, memo_capacity: usize) -> Self {
        let memo_capacity = NonZeroUsize::new(memo_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            exact: RwLock::new(HashMap::with_capacity(max_entries.min(1024))),
            max_entries,
            memo: Mutex::new(LruCache::new(memo_capacity)),
            dropped_inserts: AtomicU64::new(0),
        }
    }

    pub fn get(&self, features: &FeatureVector) -> Option<f64> {
        self.get_key(&features.cache_key())
    }

    pub fn get_key(&self, key: &CacheKey) -> Option<f64> {
        self.exact.read().get(key).copied()
    }

    /// Bounded insert. Returns false when the entry was not stored.
    pub fn put(&self, features: &FeatureVector, value: f64) -> bool {
        self.put_key(features.cache_key(), value)
    }

    pub fn put_key(&self, key: CacheKey, value: f64) -> bool {
        let mut exact = self.exact.write();
        if exact.contains_key(&key) {
            return false;
        }
        if exact.len() >= self.max_entries {
            self.dropped_inserts.fetch_add(1, Ordering::Relaxed);
            debug!("Result cache full ({} entries), dropping {}", exact.len(), key);
            return false;
        }
        exact.insert(key, value);
        true
    }

    /// Memoized call: return the remembered value for these exact scalars or
    /// run `compute` and remember a successful result.
    ///
    /// The second element is true when the value came from the memo layer.
    pub async fn memoized<F, Fut>(
        &self,
        features: &FeatureVector,
        compute: F,
    ) -> Result<(f64, bool), PredictError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<f64, PredictError>>,
    {
        let key = features.scalar_key();
        let remembered = self.memo.lock().get(&key).copied();
        if let Some(value) = remembered {
            return Ok((value, true));
        }
        let value = compute().await?;
        self.memo.lock().put(key, value);
        Ok((value, false))
    }

    /// Empty both layers. Both locks are held together, so no caller sees
    /// one layer cleared and the other still populated.
    pub fn clear(&self) -> ClearStats {
        let mut exact = self.exact.write();
        let mut memo = self.memo.lock();
        let stats = ClearStats {
            exact_removed: exact.len(),
            memo_removed: memo.len(),
        };
        exact.clear();
        memo.clear();
        info!(
            "Result cache cleared ({} exact, {} memoized)",
            stats.exact_removed, stats.memo_removed
        );
        stats
    }

    pub fn len(&self) -> usize {
        self.exact.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn memo_len(&self) -> usize {
        self.memo.lock().len()
    }

    pub fn stats(&self) -> CacheStats {
        // Exact before memo, the same order clear() takes them
        let cache_size = self.len();
        let memo = self.memo.lock();
        CacheStats {
            cache_size,
            max_entries: self.max_entries,
            memo_size: memo.len(),
            memo_capacity: memo.cap().get(),
            dropped_inserts: self.dropped_inserts.load(Ordering::Relaxed),
        }
    }
}
