//! Envelope decoding and routing by kind.

use tether_core::LogicalEndpoint;
use tracing::{trace, warn};

use super::{RequestDispatcher, ResponseDispatcher, count_unroutable};
use crate::registry::RequestRegistry;
use crate::types::{Envelope, EnvelopeKind};

/// First-level dispatcher: owns the request and response dispatchers and
/// picks one by envelope kind.
#[derive(Debug, Default)]
pub struct RawDispatcher {
    requests: RequestDispatcher,
    responses: ResponseDispatcher,
}

impl RawDispatcher {
    /// Create a dispatcher with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// The request dispatcher, for handler registration.
    pub fn requests(&mut self) -> &mut RequestDispatcher {
        &mut self.requests
    }

    /// The response dispatcher, for handler registration.
    pub fn responses(&mut self) -> &mut ResponseDispatcher {
        &mut self.responses
    }

    /// Decode `text` and route it. Returns how many handlers ran.
    pub fn dispatch(
        &mut self,
        endpoint: &LogicalEndpoint,
        text: &str,
        registry: &mut RequestRegistry,
    ) -> usize {
        let envelope: Envelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(error) => {
                count_unroutable("malformed_envelope");
                warn!(%endpoint, %error, "malformed envelope dropped");
                return 0;
            }
        };

        if envelope.kind.is_empty() {
            count_unroutable("missing_kind");
            warn!(%endpoint, "envelope without kind dropped");
            return 0;
        }
        let Some(kind) = EnvelopeKind::parse(&envelope.kind) else {
            count_unroutable("unknown_kind");
            warn!(%endpoint, kind = %envelope.kind, "envelope of unknown kind dropped");
            return 0;
        };

        trace!(%endpoint, %kind, "routing envelope");
        match kind {
            EnvelopeKind::Request => self.requests.dispatch(endpoint, &envelope.payload),
            EnvelopeKind::Response => {
                usize::from(self.responses.dispatch(endpoint, &envelope.payload, registry))
            }
        }
    }
}
