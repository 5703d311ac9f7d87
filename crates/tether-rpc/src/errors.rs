//! RPC error type.

use tether_transport::TransportError;
use thiserror::Error;

/// Errors returned to callers of the transmitters.
///
/// Inbound problems never become an `RpcError`. The dispatchers log and drop
/// them.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The outbound envelope or payload failed validation.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// A payload could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The transport rejected the call.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl RpcError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidEnvelope(message.into())
    }
}

/// Result type for RPC operations.
pub type Result<T> = std::result::Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::LogicalEndpoint;

    #[test]
    fn invalid_envelope_display() {
        let err = RpcError::invalid("method is empty");
        assert_eq!(err.to_string(), "invalid envelope: method is empty");
    }

    #[test]
    fn transport_error_is_transparent() {
        let err: RpcError = TransportError::UnknownEndpoint {
            endpoint: LogicalEndpoint::from("agent"),
        }
        .into();
        assert!(matches!(err, RpcError::Transport(_)));
        assert!(err.to_string().starts_with("logical endpoint 'agent'"));
    }
}
