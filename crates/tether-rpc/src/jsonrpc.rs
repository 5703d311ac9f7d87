//! The JSON-RPC receiver and sender for one session.

use tether_core::LogicalEndpoint;
use tether_transport::{Delivery, Transmit};

use crate::dispatch::{RawDispatcher, RequestHandler, ResponseHandler};
use crate::errors::Result;
use crate::registry::RequestRegistry;
use crate::transmit;
use crate::types::{JsonRpcRequest, JsonRpcResponse};

/// Correlation table plus dispatchers.
///
/// Inbound envelopes go through [`JsonRpc::receive`]. Outbound payloads go
/// through the `transmit_*` methods, which share the same registry.
#[derive(Debug, Default)]
pub struct JsonRpc {
    registry: RequestRegistry,
    dispatcher: RawDispatcher,
}

impl JsonRpc {
    /// Create an empty instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for inbound requests matching `pattern`.
    pub fn register_request_handler(
        &mut self,
        pattern: &str,
        handler: impl RequestHandler + 'static,
    ) {
        self.dispatcher.requests().register(pattern, handler);
    }

    /// Register the handler for responses to `method`.
    pub fn register_response_handler(
        &mut self,
        method: impl Into<String>,
        handler: impl ResponseHandler + 'static,
    ) {
        self.dispatcher.responses().register(method, handler);
    }

    /// Dispatch one inbound envelope. Returns how many handlers ran.
    pub fn receive(&mut self, endpoint: &LogicalEndpoint, message: &str) -> usize {
        self.dispatcher.dispatch(endpoint, message, &mut self.registry)
    }

    /// See [`transmit::transmit_request`].
    pub fn transmit_request(
        &mut self,
        transport: &mut dyn Transmit,
        endpoint: &LogicalEndpoint,
        request: &JsonRpcRequest,
    ) -> Result<Delivery> {
        transmit::transmit_request(transport, &mut self.registry, endpoint, request)
    }

    /// See [`transmit::transmit_response`].
    pub fn transmit_response(
        &self,
        transport: &mut dyn Transmit,
        endpoint: &LogicalEndpoint,
        response: &JsonRpcResponse,
    ) -> Result<Delivery> {
        transmit::transmit_response(transport, endpoint, response)
    }

    /// See [`transmit::transmit_notification`].
    pub fn transmit_notification(
        &self,
        transport: &mut dyn Transmit,
        endpoint: &LogicalEndpoint,
        notification: &JsonRpcRequest,
    ) -> Result<Delivery> {
        transmit::transmit_notification(transport, endpoint, notification)
    }

    /// Requests still waiting for a response.
    pub fn in_flight(&self) -> usize {
        self.registry.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
