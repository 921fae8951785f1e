use loader_core::JsonValue;
use serde::{Deserialize, Serialize};

/// On-disk shape of a cache entry. Field names are bit-exact with the
/// reference format for compatibility; unknown fields are ignored on read
/// via `serde`'s default "ignore unknown" behavior for structs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: JsonValue,
    pub timestamp: u64,
    pub ttl_days: u32,
    pub provider: String,
    pub key: String,
}

impl CacheEntry {
    pub fn age_seconds(&self, now: u64) -> u64 {
        now.saturating_sub(self.timestamp)
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.age_seconds(now) >= u64::from(self.ttl_days) * 86_400
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ttl_days: u32, timestamp: u64) -> CacheEntry {
        CacheEntry {
            data: JsonValue::Null,
            timestamp,
            ttl_days,
            provider: "fmp".into(),
            key: "profile:AAPL".into(),
        }
    }

    #[test]
    fn not_expired_within_ttl() {
        let e = entry(7, 1_000);
        assert!(!e.is_expired(1_000 + 86_400));
    }

    #[test]
    fn expired_at_exact_boundary() {
        let e = entry(1, 1_000);
        assert!(e.is_expired(1_000 + 86_400));
    }
}
