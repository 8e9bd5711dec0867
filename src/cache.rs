//! Route-keyed snapshot cache with explicit staleness.
//!
//! Mutations never touch cached data directly; they mark the route stale and
//! the next read re-queries the store. The stale-set is an injected value, not
//! ambient global state, so invalidation is observable in tests without a real
//! cache backend.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

struct Entry {
    snapshot: Value,
    stale: bool,
}

/// Cached snapshots keyed by logical route string (e.g. the invoices listing).
#[derive(Default)]
pub struct RouteCache {
    inner: RwLock<HashMap<String, Entry>>,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache a fresh snapshot for a route.
    pub fn store(&self, route: &str, snapshot: Value) {
        if let Ok(mut entries) = self.inner.write() {
            entries.insert(
                route.to_string(),
                Entry {
                    snapshot,
                    stale: false,
                },
            );
        }
    }

    /// Fresh snapshot for a route, or `None` when absent or stale.
    pub fn lookup(&self, route: &str) -> Option<Value> {
        let entries = self.inner.read().ok()?;
        entries
            .get(route)
            .filter(|entry| !entry.stale)
            .map(|entry| entry.snapshot.clone())
    }

    /// Mark a route stale. Idempotent, and an unknown route is already
    /// effectively stale, so this never fails observably.
    pub fn invalidate(&self, route: &str) {
        if let Ok(mut entries) = self.inner.write() {
            if let Some(entry) = entries.get_mut(route) {
                entry.stale = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fresh_snapshot_round_trip() {
        let cache = RouteCache::new();
        cache.store("/dashboard/invoices", json!([{"id": "i1"}]));
        assert_eq!(
            cache.lookup("/dashboard/invoices"),
            Some(json!([{"id": "i1"}]))
        );
    }

    #[test]
    fn test_invalidate_hides_snapshot_until_restored() {
        let cache = RouteCache::new();
        cache.store("/dashboard/invoices", json!([]));
        cache.invalidate("/dashboard/invoices");
        assert_eq!(cache.lookup("/dashboard/invoices"), None);

        // A re-read stores a fresh snapshot and the route serves again.
        cache.store("/dashboard/invoices", json!([{"id": "i2"}]));
        assert!(cache.lookup("/dashboard/invoices").is_some());
    }

    #[test]
    fn test_invalidate_is_idempotent() {
        let cache = RouteCache::new();
        cache.store("/dashboard/invoices", json!([]));
        cache.invalidate("/dashboard/invoices");
        cache.invalidate("/dashboard/invoices");
        assert_eq!(cache.lookup("/dashboard/invoices"), None);
    }

    #[test]
    fn test_invalidating_unknown_route_is_a_no_op() {
        let cache = RouteCache::new();
        cache.invalidate("/dashboard/never-cached");
        assert_eq!(cache.lookup("/dashboard/never-cached"), None);
    }
}
