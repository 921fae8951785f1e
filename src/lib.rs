//! Resilient, cache-backed data-aggregation client fronting FMP, Polygon,
//! and FRED behind one uniform retrieval interface.
//!
//! The hard part lives in the component crates this one composes:
//! [`loader_transport`] (HTTP), [`loader_cache`] (filesystem cache),
//! [`loader_gate`] (per-provider concurrency), [`loader_circuitbreaker`],
//! [`loader_retry`], [`loader_health`], [`loader_registry`], and
//! [`loader_providers`] (the FMP/Polygon/FRED adapters). This crate's own
//! job is wiring them together in [`LoaderOrchestrator`] and supplying the
//! ambient configuration and logging scaffolding around it.

pub mod config;
pub mod logging;
mod orchestrator;

pub use config::Config;
pub use loader_core::{FetchResponse, OperatingMode, Params};
pub use orchestrator::{ApiHealthReport, BreakerSnapshot, GateSnapshot, LoaderOrchestrator, LoaderStatsSnapshot, OrchestratorError};

/// Builds an orchestrator from `Config::from_env()` after installing
/// structured logging. Mirrors the source's `create_data_loader()`
/// convenience factory. The returned guard must be held for the life of the
/// process — dropping it stops the file sink's background writer.
pub fn create_data_loader() -> (LoaderOrchestrator, Option<tracing_appender::non_blocking::WorkerGuard>) {
    let config = Config::from_env();
    let guard = logging::init(config.log_level, &config.get_log_dir(), config.logging);
    (LoaderOrchestrator::new(&config), guard)
}
