//! Transport error types.
//!
//! These are caller bugs: touching an address that was never initialized, or
//! an endpoint that was never bound. Transient delivery failures are not
//! errors at this layer; they surface as [`Delivery::Deferred`](crate::Delivery).

use tether_core::{LogicalEndpoint, PhysicalAddress};
use thiserror::Error;

/// Errors raised by the transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Operation on an address that has no registered connection.
    #[error("no connection initialized for address '{address}'")]
    UnknownAddress {
        /// The offending address.
        address: PhysicalAddress,
    },

    /// Operation on a logical endpoint that is not bound to any address.
    #[error("logical endpoint '{endpoint}' is not bound to an address")]
    UnknownEndpoint {
        /// The offending endpoint.
        endpoint: LogicalEndpoint,
    },

    /// A transmission frame could not be encoded.
    #[error("failed to encode transmission frame: {0}")]
    Frame(#[from] serde_json::Error),
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
