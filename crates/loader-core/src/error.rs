use thiserror::Error;

/// Classification of a failed HTTP attempt, assigned once by the transport
/// and never re-derived downstream. Retry, breaker and health logic branch
/// on this enum instead of re-inspecting status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Timeout,
    Connection,
    RateLimit,
    ServerError,
    ClientError,
    Unexpected,
}

impl ErrorKind {
    /// Stable, machine-greppable prefix used at the front of failure messages.
    pub fn message_prefix(self) -> &'static str {
        match self {
            ErrorKind::Timeout => "Request timed out",
            ErrorKind::Connection => "Connection failed",
            ErrorKind::RateLimit => "Rate limit exceeded",
            ErrorKind::ServerError => "Server error",
            ErrorKind::ClientError => "Client error",
            ErrorKind::Unexpected => "Unexpected error",
        }
    }

    /// Whether this kind counts as a breaker failure. All kinds do; the
    /// distinction in the design is between kinds that reach the breaker at
    /// all (read-only violations and circuit rejections never do) and those
    /// that don't, which is enforced by the orchestrator's call order rather
    /// than by this enum.
    pub fn is_retryable_by_default(self) -> bool {
        !matches!(self, ErrorKind::ClientError)
    }
}

/// Error returned by the HTTP transport (C1). Non-2xx responses are
/// converted into one of these before the transport returns; a `Response`
/// value is only ever produced for a 2xx status.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Rate limit exceeded")]
    RateLimit { retry_after: Option<u64> },

    #[error("Server error: {status}")]
    Server { status: u16 },

    #[error("Client error: {status}")]
    Client { status: u16 },

    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Timeout(_) => ErrorKind::Timeout,
            TransportError::Connection(_) => ErrorKind::Connection,
            TransportError::RateLimit { .. } => ErrorKind::RateLimit,
            TransportError::Server { .. } => ErrorKind::ServerError,
            TransportError::Client { .. } => ErrorKind::ClientError,
            TransportError::Other(_) => ErrorKind::Unexpected,
        }
    }

    /// Status code carried by this error, if any was observed on the wire.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            TransportError::Server { status } => Some(*status),
            TransportError::Client { status } => Some(*status),
            _ => None,
        }
    }
}
