//! Node API error types.

use thiserror::Error;

/// Failure talking to the node. Every variant is a transport-level failure
/// from the caller's point of view: the request did not produce a usable
/// response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The configured base URL or a derived endpoint URL is unusable.
    #[error("invalid node URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The node could not be reached, or the connection broke mid-request.
    #[error("transport error calling {endpoint}: {reason}")]
    Transport { endpoint: String, reason: String },

    /// The node answered with a non-success status.
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The node answered 2xx but the body does not match the schema.
    #[error("unexpected response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
}

impl ApiError {
    /// Endpoint path the failure refers to, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::InvalidUrl { .. } => None,
            Self::Transport { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::Decode { endpoint, .. } => Some(endpoint),
        }
    }
}
