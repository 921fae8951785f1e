//! Per-provider bounded concurrency gate (C3).
//!
//! Each provider gets its own `tokio::sync::Semaphore`. `acquire` hands back
//! an RAII permit — dropping it (on any exit path, including a panic
//! unwinding through it) releases the slot, so nothing downstream has to
//! remember to call a matching `release`.

use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

const UNKNOWN_PROVIDER_DEFAULT_LIMIT: usize = 5;

#[derive(Debug, Default)]
struct ProviderStats {
    total_acquisitions: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

struct ProviderGate {
    semaphore: Arc<Semaphore>,
    limit: usize,
    stats: Arc<ProviderStats>,
}

/// A held concurrency slot. Releases automatically on drop.
pub struct GateGuard {
    _permit: OwnedSemaphorePermit,
    stats: Arc<ProviderStats>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.stats.active.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Snapshot of one provider's gate usage.
#[derive(Debug, Clone, Copy)]
pub struct GateStats {
    pub max_concurrency: usize,
    pub total_acquisitions: usize,
    pub active: usize,
    pub peak_concurrent: usize,
}

/// Router of per-provider semaphores. Safe to share across tasks behind an
/// `Arc`; creating gates for previously-unseen providers is internally
/// synchronized via `DashMap`'s sharded locking.
pub struct ConcurrencyGate {
    gates: DashMap<String, ProviderGate>,
    default_limits: Vec<(&'static str, usize)>,
}

impl ConcurrencyGate {
    /// Builds a gate pre-seeded with the given `(provider, limit)` pairs.
    /// Providers not named here fall back to a default limit of 5 the first
    /// time they're acquired.
    pub fn new(default_limits: Vec<(&'static str, usize)>) -> Self {
        let gates = DashMap::new();
        for (provider, limit) in &default_limits {
            gates.insert((*provider).to_string(), ProviderGate::new(*limit));
        }
        Self {
            gates,
            default_limits,
        }
    }

    fn limit_for(&self, provider: &str) -> usize {
        self.default_limits
            .iter()
            .find(|(name, _)| *name == provider)
            .map(|(_, limit)| *limit)
            .unwrap_or(UNKNOWN_PROVIDER_DEFAULT_LIMIT)
    }

    /// Waits for and returns a slot for `provider`. Unknown providers are
    /// lazily given a gate with the default limit on first use.
    pub async fn acquire(&self, provider: &str) -> GateGuard {
        let semaphore = {
            let gate = self
                .gates
                .entry(provider.to_string())
                .or_insert_with(|| ProviderGate::new(self.limit_for(provider)));
            Arc::clone(&gate.semaphore)
        };

        let permit = semaphore
            .acquire_owned()
            .await
            .expect("gate semaphore is never closed");

        let stats = {
            let gate = self.gates.get(provider).expect("gate just inserted");
            Arc::clone(&gate.stats)
        };

        stats.total_acquisitions.fetch_add(1, Ordering::AcqRel);
        let active_now = stats.active.fetch_add(1, Ordering::AcqRel) + 1;
        stats.peak.fetch_max(active_now, Ordering::AcqRel);

        tracing::trace!(provider, active = active_now, "concurrency slot acquired");

        GateGuard {
            _permit: permit,
            stats,
        }
    }

    /// Changes the limit for `provider` going forward. Existing waiters on
    /// the old semaphore are unaffected and drain normally; this installs a
    /// fresh semaphore for subsequent `acquire` calls.
    pub fn set_limit(&self, provider: &str, limit: usize) {
        assert!(limit >= 1, "concurrency limit must be at least 1");
        self.gates
            .insert(provider.to_string(), ProviderGate::new(limit));
    }

    pub fn available_slots(&self, provider: &str) -> usize {
        self.gates
            .get(provider)
            .map(|g| g.semaphore.available_permits())
            .unwrap_or(UNKNOWN_PROVIDER_DEFAULT_LIMIT)
    }

    pub fn stats(&self, provider: &str) -> GateStats {
        match self.gates.get(provider) {
            Some(gate) => GateStats {
                max_concurrency: gate.limit,
                total_acquisitions: gate.stats.total_acquisitions.load(Ordering::Acquire),
                active: gate.stats.active.load(Ordering::Acquire),
                peak_concurrent: gate.stats.peak.load(Ordering::Acquire),
            },
            None => GateStats {
                max_concurrency: self.limit_for(provider),
                total_acquisitions: 0,
                active: 0,
                peak_concurrent: 0,
            },
        }
    }
}

impl ProviderGate {
    fn new(limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            stats: Arc::new(ProviderStats::default()),
        }
    }
}

impl Default for ConcurrencyGate {
    /// Default limits matching the providers this system fronts:
    /// `fmp=3, polygon=10, fred=1`.
    fn default() -> Self {
        Self::new(vec![("fmp", 3), ("polygon", 10), ("fred", 1)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn unknown_provider_gets_default_limit_of_five() {
        let gate = ConcurrencyGate::new(vec![]);
        assert_eq!(gate.stats("mystery").max_concurrency, 5);
        let _g = gate.acquire("mystery").await;
        assert_eq!(gate.stats("mystery").active, 1);
    }

    #[tokio::test]
    async fn slot_released_on_guard_drop() {
        let gate = ConcurrencyGate::new(vec![("fred", 1)]);
        {
            let _g = gate.acquire("fred").await;
            assert_eq!(gate.available_slots("fred"), 0);
        }
        assert_eq!(gate.available_slots("fred"), 1);
    }

    #[tokio::test]
    async fn peak_concurrent_never_exceeds_limit() {
        let gate = Arc::new(ConcurrencyGate::new(vec![("fmp", 3)]));
        let mut handles = Vec::new();
        for _ in 0..10 {
            let gate = Arc::clone(&gate);
            handles.push(tokio::spawn(async move {
                let _g = gate.acquire("fmp").await;
                tokio::time::sleep(Duration::from_millis(5)).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert!(gate.stats("fmp").peak_concurrent <= 3);
    }

    #[tokio::test]
    async fn guard_releases_even_when_task_panics() {
        let gate = Arc::new(ConcurrencyGate::new(vec![("fred", 1)]));
        let gate2 = Arc::clone(&gate);
        let handle = tokio::spawn(async move {
            let _g = gate2.acquire("fred").await;
            panic!("boom");
        });
        let _ = handle.await;
        assert_eq!(gate.available_slots("fred"), 1);
    }
}
