//! Shared vocabulary for the resilient data-loader pipeline.
//!
//! This crate has no behavior of its own. It exists so that the transport,
//! cache, gate, breaker, retry, health, registry and provider crates can all
//! agree on the same request/response shapes and error kinds without any of
//! them depending on the orchestrator crate that wires them together.

mod error;
mod model;
pub mod sanitize;

pub use error::{ErrorKind, TransportError};
pub use model::{FetchResponse, OperatingMode, OperatingModeCell};

/// Opaque JSON-serializable payload.
///
/// Cache entries and provider responses are represented as this tagged sum
/// rather than as provider-specific structs; the orchestrator never inspects
/// the shape, only adapters and callers do.
pub type JsonValue = serde_json::Value;

/// Parameter map passed by a caller into `fetch`. Values are restricted to
/// primitive JSON types (no nested objects/arrays) so that sorted-key cache
/// key derivation is well defined.
pub type Params = std::collections::BTreeMap<String, JsonValue>;
