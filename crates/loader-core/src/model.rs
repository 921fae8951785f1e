use crate::JsonValue;
use std::sync::atomic::{AtomicU8, Ordering};

/// Process-wide switch between fetching live data and serving cache only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    Live,
    ReadOnly,
}

impl OperatingMode {
    fn as_u8(self) -> u8 {
        match self {
            OperatingMode::Live => 0,
            OperatingMode::ReadOnly => 1,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => OperatingMode::ReadOnly,
            _ => OperatingMode::Live,
        }
    }
}

/// Atomically-swappable holder for [`OperatingMode`], shared between the
/// orchestrator and anything that needs to flip modes at runtime.
#[derive(Debug)]
pub struct OperatingModeCell(AtomicU8);

impl OperatingModeCell {
    pub fn new(mode: OperatingMode) -> Self {
        Self(AtomicU8::new(mode.as_u8()))
    }

    pub fn get(&self) -> OperatingMode {
        OperatingMode::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, mode: OperatingMode) {
        self.0.store(mode.as_u8(), Ordering::Release);
    }
}

impl Default for OperatingModeCell {
    fn default() -> Self {
        Self::new(OperatingMode::Live)
    }
}

/// Outcome of a single `fetch` call, returned to the caller on the
/// non-exceptional path (read-only violations and circuit-open rejections
/// are raised separately; see `loader::OrchestratorError`).
#[derive(Debug, Clone)]
pub enum FetchResponse {
    Success {
        provider: String,
        endpoint: String,
        data: JsonValue,
        from_cache: bool,
        elapsed_ms: u64,
    },
    Failure {
        provider: String,
        endpoint: String,
        error: String,
        from_cache: bool,
        elapsed_ms: u64,
    },
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchResponse::Success { .. })
    }

    pub fn provider(&self) -> &str {
        match self {
            FetchResponse::Success { provider, .. } => provider,
            FetchResponse::Failure { provider, .. } => provider,
        }
    }

    pub fn from_cache(&self) -> bool {
        match self {
            FetchResponse::Success { from_cache, .. } => *from_cache,
            FetchResponse::Failure { from_cache, .. } => *from_cache,
        }
    }
}
