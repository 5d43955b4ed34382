//! Thread-safe cache for recalculated saving balances

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::types::*;

/// Fingerprint of a balance recalculation
///
/// The version counters make any mutation of the definition or the balance
/// produce a new key, so stale entries can never be hit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BalanceCacheKey {
    pub definition_id: String,
    pub balance_id: String,
    pub year: i32,
    pub month: u32,
    pub start_year: i32,
    pub start_month: u32,
    pub definition_version: u64,
    pub balance_version: u64,
}

/// Cached outcome of a recalculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub balance: SavingBalance,
    /// Months counted from the start month to the target month, inclusive
    pub elapsed_months: u32,
}

/// Hit, miss and invalidation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
    pub entries: usize,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<BalanceCacheKey, BalanceSnapshot>,
    hits: u64,
    misses: u64,
    invalidations: u64,
}

/// Mutex-guarded balance cache
///
/// Lookups, inserts and counters share one lock, so a key's
/// miss-compute-store sequence is atomic and the counters always agree
/// with the entries.
#[derive(Debug, Default)]
pub struct BalanceCache {
    state: Mutex<CacheState>,
}

impl BalanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // Entries are inserted only after a successful compute, so a
        // poisoned lock still guards a consistent map.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached snapshot for `key`, computing and storing it on a miss
    pub fn get_or_compute<F>(&self, key: BalanceCacheKey, compute: F) -> RecurringResult<BalanceSnapshot>
    where
        F: FnOnce() -> RecurringResult<BalanceSnapshot>,
    {
        let mut state = self.lock();
        if let Some(snapshot) = state.entries.get(&key).cloned() {
            state.hits += 1;
            return Ok(snapshot);
        }
        state.misses += 1;
        let snapshot = compute()?;
        state.entries.insert(key, snapshot.clone());
        Ok(snapshot)
    }

    /// Drop every entry of a definition, returns how many were removed
    pub fn invalidate_definition(&self, definition_id: &str) -> usize {
        self.invalidate_where(|key| key.definition_id == definition_id)
    }

    /// Drop every entry of a balance, returns how many were removed
    pub fn invalidate_balance(&self, balance_id: &str) -> usize {
        self.invalidate_where(|key| key.balance_id == balance_id)
    }

    fn invalidate_where(&self, predicate: impl Fn(&BalanceCacheKey) -> bool) -> usize {
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|key, _| !predicate(key));
        let removed = before - state.entries.len();
        state.invalidations += 1;
        debug!(removed, "balance cache invalidated");
        removed
    }

    /// Remove all entries, counters are kept
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.invalidations += 1;
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            invalidations: state.invalidations,
            entries: state.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn key(definition_id: &str, version: u64) -> BalanceCacheKey {
        BalanceCacheKey {
            definition_id: definition_id.to_string(),
            balance_id: format!("{}-balance", definition_id),
            year: 2025,
            month: 6,
            start_year: 2025,
            start_month: 1,
            definition_version: version,
            balance_version: 0,
        }
    }

    fn snapshot(definition_id: &str) -> BalanceSnapshot {
        BalanceSnapshot {
            balance: SavingBalance::new(
                format!("{}-balance", definition_id),
                definition_id.to_string(),
                2025,
                6,
            ),
            elapsed_months: 6,
        }
    }

    #[test]
    fn test_hit_after_miss() {
        let cache = BalanceCache::new();
        cache.get_or_compute(key("rent", 0), || Ok(snapshot("rent"))).unwrap();
        cache
            .get_or_compute(key("rent", 0), || panic!("should be cached"))
            .unwrap();
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[test]
    fn test_new_version_misses() {
        let cache = BalanceCache::new();
        cache.get_or_compute(key("rent", 0), || Ok(snapshot("rent"))).unwrap();
        cache.get_or_compute(key("rent", 1), || Ok(snapshot("rent"))).unwrap();
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_failed_compute_is_not_stored() {
        let cache = BalanceCache::new();
        let result = cache.get_or_compute(key("rent", 0), || {
            Err(RecurringError::validation("boom"))
        });
        assert!(result.is_err());
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_invalidation_is_scoped() {
        let cache = BalanceCache::new();
        cache.get_or_compute(key("rent", 0), || Ok(snapshot("rent"))).unwrap();
        cache.get_or_compute(key("tax", 0), || Ok(snapshot("tax"))).unwrap();
        assert_eq!(cache.invalidate_definition("rent"), 1);
        assert_eq!(cache.invalidate_balance("missing"), 0);
        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.invalidations, 2);
    }

    #[test]
    fn test_concurrent_access_computes_once_per_key() {
        let cache = Arc::new(BalanceCache::new());
        let computations = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                let computations = Arc::clone(&computations);
                thread::spawn(move || {
                    for round in 0..50 {
                        let id = if (i + round) % 2 == 0 { "rent" } else { "tax" };
                        cache
                            .get_or_compute(key(id, 0), || {
                                computations.fetch_add(1, Ordering::SeqCst);
                                Ok(snapshot(id))
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let stats = cache.stats();
        assert_eq!(computations.load(Ordering::SeqCst), 2);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits + stats.misses, 400);
    }
}
