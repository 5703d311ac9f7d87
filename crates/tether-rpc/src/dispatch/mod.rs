//! Inbound dispatch.
//!
//! [`RawDispatcher`] decodes the envelope and hands the payload to the
//! [`RequestDispatcher`] or [`ResponseDispatcher`] for its kind. Nothing in
//! this module returns an error: every unroutable message is logged, counted
//! in `tether_rpc_unroutable_total` and dropped.

pub mod raw;
pub mod request;
pub mod response;

pub use raw::RawDispatcher;
pub use request::RequestDispatcher;
pub use response::ResponseDispatcher;

use metrics::counter;
use tether_core::LogicalEndpoint;

use crate::types::{JsonRpcRequest, JsonRpcResponse};

/// Handles inbound requests and notifications.
pub trait RequestHandler: Send {
    /// Handle `request` from `endpoint`.
    fn handle(&mut self, endpoint: &LogicalEndpoint, request: &JsonRpcRequest);
}

impl<F> RequestHandler for F
where
    F: FnMut(&LogicalEndpoint, &JsonRpcRequest) + Send,
{
    fn handle(&mut self, endpoint: &LogicalEndpoint, request: &JsonRpcRequest) {
        self(endpoint, request);
    }
}

/// Handles responses to requests this side issued.
pub trait ResponseHandler: Send {
    /// Handle `response` from `endpoint`.
    fn handle(&mut self, endpoint: &LogicalEndpoint, response: &JsonRpcResponse);
}

impl<F> ResponseHandler for F
where
    F: FnMut(&LogicalEndpoint, &JsonRpcResponse) + Send,
{
    fn handle(&mut self, endpoint: &LogicalEndpoint, response: &JsonRpcResponse) {
        self(endpoint, response);
    }
}

pub(crate) fn count_unroutable(reason: &'static str) {
    counter!("tether_rpc_unroutable_total", "reason" => reason).increment(1);
}
