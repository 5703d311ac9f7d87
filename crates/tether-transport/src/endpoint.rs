//! Transport endpoint: socket event fan-out.
//!
//! | event   | effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | opened  | mark open, reset sustainer, replay backlog, connect actions |
//! | closed  | mark closed, disconnect actions, sustainer, teardown if terminating |
//! | message | decode the transmission frame for the protocol receiver      |
//! | error   | log only                                                     |
//!
//! Events for addresses that are not registered are logged and ignored.

use tether_core::{LogicalEndpoint, PhysicalAddress};
use tracing::{debug, error, info, warn};

use crate::actions::ActionKind;
use crate::errors::Result;
use crate::frame::TransmissionFrame;
use crate::socket::SocketEvent;
use crate::transport::Transport;

/// A decoded inbound message, ready for its protocol receiver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    /// Endpoint the message arrived from.
    pub endpoint: LogicalEndpoint,
    /// Protocol tag from the transmission frame.
    pub protocol: String,
    /// Protocol-level message text.
    pub message: String,
}

impl Transport {
    /// Apply one socket event. Returns the decoded message for `Message`
    /// events that carry a frame for a registered protocol.
    pub fn handle_event(&mut self, event: SocketEvent) -> Option<InboundMessage> {
        if !self.connections.contains(event.address()) {
            debug!(
                address = %event.address(),
                event = event.kind(),
                "event for unregistered address ignored"
            );
            return None;
        }

        match event {
            SocketEvent::Opened { address } => {
                if let Err(error) = self.on_open(&address) {
                    error!(%address, %error, "open handling failed");
                }
                None
            }
            SocketEvent::Closed { address, reason } => {
                if let Err(error) = self.on_close(&address, reason.as_deref()) {
                    error!(%address, %error, "close handling failed");
                }
                None
            }
            SocketEvent::Error { address, error } => {
                warn!(%address, %error, "socket error");
                None
            }
            SocketEvent::Message { address, text } => self.on_message(&address, &text),
        }
    }

    fn on_open(&mut self, address: &PhysicalAddress) -> Result<()> {
        self.connections.mark_open(address)?;
        self.sustainer.on_open(address);
        let report = self
            .replay
            .flush(address, &self.identity, &mut self.connections)?;
        let callbacks = self.actions.run(address, ActionKind::Connect);
        info!(
            %address,
            replayed = report.sent,
            requeued = report.requeued,
            callbacks,
            "connection open"
        );
        Ok(())
    }

    fn on_close(&mut self, address: &PhysicalAddress, reason: Option<&str>) -> Result<()> {
        self.connections.mark_closed(address)?;
        let callbacks = self.actions.run(address, ActionKind::Disconnect);
        for subscription in self.farewells.remove(address).unwrap_or_default() {
            let _ = self.actions.cancel(&subscription);
        }
        info!(%address, reason = reason.unwrap_or(""), callbacks, "connection closed");

        let outcome = self.sustainer.on_close(address, &mut self.connections)?;
        debug!(%address, ?outcome, "sustainer handled close");

        if self.connections.is_terminating(address) {
            self.teardown(address);
        }
        Ok(())
    }

    fn on_message(&self, address: &PhysicalAddress, text: &str) -> Option<InboundMessage> {
        let Some(endpoint) = self.identity.endpoint_of(address).cloned() else {
            warn!(%address, "message on address with no endpoint dropped");
            return None;
        };
        let frame = match TransmissionFrame::decode(text) {
            Ok(frame) => frame,
            Err(error) => {
                warn!(%endpoint, %error, "malformed transmission frame dropped");
                return None;
            }
        };
        if !self.protocols.contains(&frame.protocol) {
            warn!(%endpoint, protocol = %frame.protocol, "no receiver for protocol, frame dropped");
            return None;
        }
        Some(InboundMessage {
            endpoint,
            protocol: frame.protocol,
            message: frame.message,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
