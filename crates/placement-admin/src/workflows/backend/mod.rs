//! Access to the agency's REST backend.

mod http;

pub use http::HttpBackend;

/// Failure talking to the remote backend. Every variant is retryable by the operator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("backend resource not found")]
    NotFound,
    #[error("backend rejected the request: {0}")]
    Rejected(String),
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("backend unreachable: {0}")]
    Transport(String),
    #[error("backend response could not be decoded: {0}")]
    Decode(String),
}
