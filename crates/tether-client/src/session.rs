//! The composed transport + RPC session.
//!
//! [`TransportSession`] owns every registry for one client. It is synchronous:
//! whoever owns it must feed it socket events and application calls one at a
//! time. [`crate::driver`] does that from a single tokio task.

use serde_json::Value;
use tether_core::constants::JSONRPC_PROTOCOL;
use tether_core::{LogicalEndpoint, PhysicalAddress};
use tether_rpc::{JsonRpc, JsonRpcRequest, JsonRpcResponse, RequestHandler, ResponseHandler};
use tether_settings::TetherSettings;
use tether_transport::{Action, Delivery, SocketEvent, SocketFactory, Subscription, Transport};
use tracing::{debug, warn};

use crate::errors::Result;

/// One client's transport and RPC state.
#[derive(Debug)]
pub struct TransportSession {
    transport: Transport,
    rpc: JsonRpc,
    next_id: i64,
}

impl TransportSession {
    /// Create a session whose sockets come from `factory`.
    pub fn new(factory: Box<dyn SocketFactory>, settings: &TetherSettings) -> Self {
        let mut transport = Transport::new(factory, settings);
        transport.register_protocol(JSONRPC_PROTOCOL);
        Self {
            transport,
            rpc: JsonRpc::new(),
            next_id: 1,
        }
    }

    // ── Endpoints ───────────────────────────────────────────────────

    /// Bind `endpoint` to `address`, register callbacks and connect.
    pub fn initialize_endpoint(
        &mut self,
        endpoint: LogicalEndpoint,
        address: PhysicalAddress,
        on_connect: Vec<Action>,
        on_disconnect: Vec<Action>,
    ) -> Result<Vec<Subscription>> {
        Ok(self
            .transport
            .initialize_endpoint(endpoint, address, on_connect, on_disconnect)?)
    }

    /// Close `endpoint` for good. `on_disconnect` runs once with the others.
    pub fn terminate_endpoint(
        &mut self,
        endpoint: &LogicalEndpoint,
        on_disconnect: Vec<Action>,
    ) -> Result<()> {
        Ok(self.transport.terminate_endpoint(endpoint, on_disconnect)?)
    }

    /// Cancel a connect or disconnect callback.
    pub fn cancel_subscription(&mut self, subscription: &Subscription) -> bool {
        self.transport.cancel_subscription(subscription)
    }

    /// Stop reconnecting `endpoint`.
    pub fn cancel_reconnection(&mut self, endpoint: &LogicalEndpoint) -> Result<()> {
        Ok(self.transport.cancel_reconnection(endpoint)?)
    }

    /// Resume reconnecting `endpoint`, connecting now if it is down.
    pub fn enable_reconnection(&mut self, endpoint: &LogicalEndpoint) -> Result<()> {
        Ok(self.transport.enable_reconnection(endpoint)?)
    }

    /// Whether `endpoint` is connected.
    pub fn is_open(&self, endpoint: &LogicalEndpoint) -> bool {
        self.transport.is_open(endpoint)
    }

    // ── Handlers ────────────────────────────────────────────────────

    /// Handle inbound requests whose method matches `pattern`.
    pub fn register_request_handler(
        &mut self,
        pattern: &str,
        handler: impl RequestHandler + 'static,
    ) {
        self.rpc.register_request_handler(pattern, handler);
    }

    /// Handle responses to requests issued for `method`.
    pub fn register_response_handler(
        &mut self,
        method: impl Into<String>,
        handler: impl ResponseHandler + 'static,
    ) {
        self.rpc.register_response_handler(method, handler);
    }

    // ── Outbound ────────────────────────────────────────────────────

    /// Send a request with a caller-chosen id.
    ///
    /// Ids must not collide with ones handed out by [`Self::call`] while
    /// both are in flight.
    pub fn transmit_request(
        &mut self,
        endpoint: &LogicalEndpoint,
        request: &JsonRpcRequest,
    ) -> Result<Delivery> {
        Ok(self
            .rpc
            .transmit_request(&mut self.transport, endpoint, request)?)
    }

    /// Send a request with the next session id and return that id.
    ///
    /// A call the replay backlog had no room for is logged at `warn` and
    /// leaves nothing in flight (see [`Self::in_flight`]).
    pub fn call(
        &mut self,
        endpoint: &LogicalEndpoint,
        method: impl Into<String>,
        params: Option<Value>,
    ) -> Result<i64> {
        let id = self.next_id;
        let request = JsonRpcRequest::new(id, method, params);
        let delivery = self.transmit_request(endpoint, &request)?;
        self.next_id += 1;
        if delivery == Delivery::Dropped {
            warn!(%endpoint, id, "call dropped, replay backlog full; no response will arrive");
        } else {
            debug!(%endpoint, id, ?delivery, "call issued");
        }
        Ok(id)
    }

    /// Answer a request the peer issued.
    pub fn transmit_response(
        &mut self,
        endpoint: &LogicalEndpoint,
        response: &JsonRpcResponse,
    ) -> Result<Delivery> {
        Ok(self
            .rpc
            .transmit_response(&mut self.transport, endpoint, response)?)
    }

    /// Send a notification.
    pub fn transmit_notification(
        &mut self,
        endpoint: &LogicalEndpoint,
        method: impl Into<String>,
        params: Option<Value>,
    ) -> Result<Delivery> {
        let notification = JsonRpcRequest::notification(method, params);
        Ok(self
            .rpc
            .transmit_notification(&mut self.transport, endpoint, &notification)?)
    }

    // ── Inbound ─────────────────────────────────────────────────────

    /// Apply one socket event. Returns how many RPC handlers ran.
    pub fn handle_event(&mut self, event: SocketEvent) -> usize {
        match self.transport.handle_event(event) {
            Some(inbound) => self.rpc.receive(&inbound.endpoint, &inbound.message),
            None => 0,
        }
    }

    /// Read access to the transport.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Requests waiting for a response.
    pub fn in_flight(&self) -> usize {
        self.rpc.in_flight()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
