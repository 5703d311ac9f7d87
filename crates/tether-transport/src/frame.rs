//! Transmission frame: the outermost wire wrapper.
//!
//! ```json
//! {"protocol":"jsonrpc-2.0","message":"{\"type\":\"request\",...}"}
//! ```
//!
//! The protocol tag travels beside the message, never inside it, so a
//! receiver can pick a decoder without parsing the payload.

use serde::{Deserialize, Serialize};

/// A protocol-tagged text message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransmissionFrame {
    /// Protocol tag, e.g. `jsonrpc-2.0`.
    pub protocol: String,
    /// Serialized message for that protocol.
    pub message: String,
}

impl TransmissionFrame {
    /// Wrap `message` under `protocol`.
    pub fn new(protocol: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            message: message.into(),
        }
    }

    /// Serialize to wire text.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse wire text.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
