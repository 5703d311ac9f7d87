//! Response dispatch by originating method.
//!
//! Ids are ephemeral, so handlers are keyed by the method of the request that
//! produced the id. The id is resolved through the [`RequestRegistry`] and the
//! entry is consumed.

use std::collections::HashMap;

use tether_core::LogicalEndpoint;
use tracing::{debug, warn};

use super::{ResponseHandler, count_unroutable};
use crate::registry::RequestRegistry;
use crate::types::JsonRpcResponse;

/// Routes responses to the handler for their request's method.
#[derive(Default)]
pub struct ResponseDispatcher {
    handlers: HashMap<String, Box<dyn ResponseHandler>>,
}

impl ResponseDispatcher {
    /// Create a dispatcher with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for responses to `method`. Replaces any previous
    /// handler for the same method.
    pub fn register(&mut self, method: impl Into<String>, handler: impl ResponseHandler + 'static) {
        let method = method.into();
        if self.handlers.insert(method.clone(), Box::new(handler)).is_some() {
            debug!(%method, "response handler replaced");
        } else {
            debug!(%method, "response handler registered");
        }
    }

    /// Whether a handler is registered for `method`.
    pub fn has_handler(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Parse `payload`, consume its correlation entry and invoke the handler.
    /// Returns whether a handler ran.
    pub fn dispatch(
        &mut self,
        endpoint: &LogicalEndpoint,
        payload: &str,
        registry: &mut RequestRegistry,
    ) -> bool {
        let response: JsonRpcResponse = match serde_json::from_str(payload) {
            Ok(response) => response,
            Err(error) => {
                count_unroutable("malformed_response");
                warn!(%endpoint, %error, "malformed response payload dropped");
                return false;
            }
        };

        let Some(method) = registry.take_method_for(response.id) else {
            count_unroutable("unknown_id");
            warn!(%endpoint, id = response.id, "response for unknown request id dropped");
            return false;
        };

        let Some(handler) = self.handlers.get_mut(&method) else {
            count_unroutable("no_response_handler");
            warn!(%endpoint, id = response.id, %method, "no handler for response method");
            return false;
        };

        handler.handle(endpoint, &response);
        true
    }
}

impl std::fmt::Debug for ResponseDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseDispatcher")
            .field("methods", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
