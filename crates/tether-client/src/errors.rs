//! Client error type.

use tether_rpc::RpcError;
use tether_transport::TransportError;
use thiserror::Error;

/// Errors surfaced to applications using a session.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Unknown endpoint or address: a caller bug.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Outbound validation or serialization failure.
    #[error(transparent)]
    Rpc(RpcError),

    /// The session driver task has stopped.
    #[error("session is closed")]
    SessionClosed,
}

impl From<RpcError> for ClientError {
    fn from(error: RpcError) -> Self {
        match error {
            RpcError::Transport(inner) => Self::Transport(inner),
            other => Self::Rpc(other),
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
