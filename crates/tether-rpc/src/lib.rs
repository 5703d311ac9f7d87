//! # tether-rpc
//!
//! JSON-RPC 2.0 on top of `tether-transport`.
//!
//! - [`types`]: request, response and envelope wire types
//! - [`MethodPattern`]: exact or trailing-`*` prefix matching
//! - [`RequestRegistry`]: id → method correlation, consumed once
//! - [`dispatch`]: raw, request and response dispatchers
//! - [`transmit`]: validated outbound transmitters
//! - [`JsonRpc`]: registry and dispatchers bundled for one session

#![deny(unsafe_code)]

pub mod dispatch;
pub mod errors;
pub mod jsonrpc;
pub mod pattern;
pub mod registry;
pub mod transmit;
pub mod types;

pub use dispatch::{RawDispatcher, RequestDispatcher, RequestHandler, ResponseDispatcher, ResponseHandler};
pub use errors::{Result, RpcError};
pub use jsonrpc::JsonRpc;
pub use pattern::MethodPattern;
pub use registry::RequestRegistry;
pub use transmit::{transmit_notification, transmit_request, transmit_response};
pub use types::{Envelope, EnvelopeKind, JsonRpcErrorBody, JsonRpcRequest, JsonRpcResponse};
