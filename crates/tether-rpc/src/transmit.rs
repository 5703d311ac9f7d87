//! Outbound transmitters.
//!
//! Each transmitter validates its payload, wraps it in an [`Envelope`] and
//! hands the envelope text to a [`Transmit`] implementation under the
//! `jsonrpc-2.0` protocol tag. Only [`transmit_request`] touches the
//! [`RequestRegistry`], and it registers the id before sending.

use tether_core::LogicalEndpoint;
use tether_core::constants::JSONRPC_PROTOCOL;
use tether_transport::{Delivery, Transmit};
use tracing::{debug, warn};

use crate::errors::{Result, RpcError};
use crate::registry::RequestRegistry;
use crate::types::{Envelope, EnvelopeKind, JsonRpcRequest, JsonRpcResponse};

/// Send a request and record its id for response correlation.
///
/// The correlation entry is rolled back if the transport rejects the call or
/// the replay cache drops the message, since no response can follow.
pub fn transmit_request<T: Transmit + ?Sized>(
    transport: &mut T,
    registry: &mut RequestRegistry,
    endpoint: &LogicalEndpoint,
    request: &JsonRpcRequest,
) -> Result<Delivery> {
    request.validate()?;
    let Some(id) = request.id else {
        return Err(RpcError::invalid("request has no id"));
    };
    let text = encode(EnvelopeKind::Request, request)?;

    registry.register(id, request.method.clone());
    match transport.transmit(endpoint, JSONRPC_PROTOCOL, &text) {
        Ok(Delivery::Dropped) => {
            let _ = registry.take_method_for(id);
            warn!(%endpoint, id, method = %request.method, "request dropped, correlation released");
            Ok(Delivery::Dropped)
        }
        Ok(delivery) => {
            debug!(%endpoint, id, method = %request.method, ?delivery, "request transmitted");
            Ok(delivery)
        }
        Err(error) => {
            let _ = registry.take_method_for(id);
            Err(error.into())
        }
    }
}

/// Send a response to a request the peer issued.
pub fn transmit_response<T: Transmit + ?Sized>(
    transport: &mut T,
    endpoint: &LogicalEndpoint,
    response: &JsonRpcResponse,
) -> Result<Delivery> {
    response.validate()?;
    let text = encode(EnvelopeKind::Response, response)?;
    let delivery = transport.transmit(endpoint, JSONRPC_PROTOCOL, &text)?;
    debug!(%endpoint, id = response.id, ?delivery, "response transmitted");
    Ok(delivery)
}

/// Send a notification (a request without an id).
pub fn transmit_notification<T: Transmit + ?Sized>(
    transport: &mut T,
    endpoint: &LogicalEndpoint,
    notification: &JsonRpcRequest,
) -> Result<Delivery> {
    notification.validate()?;
    if notification.id.is_some() {
        return Err(RpcError::invalid("notification must not carry an id"));
    }
    let text = encode(EnvelopeKind::Request, notification)?;
    let delivery = transport.transmit(endpoint, JSONRPC_PROTOCOL, &text)?;
    debug!(%endpoint, method = %notification.method, ?delivery, "notification transmitted");
    Ok(delivery)
}

fn encode<P: serde::Serialize>(kind: EnvelopeKind, payload: &P) -> Result<String> {
    let envelope = Envelope::new(kind, serde_json::to_string(payload)?);
    let _ = envelope.validate()?;
    Ok(serde_json::to_string(&envelope)?)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
