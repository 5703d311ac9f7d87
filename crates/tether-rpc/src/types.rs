//! JSON-RPC 2.0 wire types and the envelope that carries them.
//!
//! An [`Envelope`] wraps one serialized payload and names its kind:
//!
//! ```json
//! {"type":"request","message":"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"build-start\"}"}
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tether_core::constants::JSONRPC_VERSION;

use crate::errors::{Result, RpcError};

// ── Error code constants ────────────────────────────────────────────

/// Invalid JSON was received.
pub const PARSE_ERROR: i64 = -32_700;
/// The JSON sent is not a valid request object.
pub const INVALID_REQUEST: i64 = -32_600;
/// The method does not exist or is not available.
pub const METHOD_NOT_FOUND: i64 = -32_601;
/// Invalid method parameters.
pub const INVALID_PARAMS: i64 = -32_602;
/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i64 = -32_603;

// ── Envelope ────────────────────────────────────────────────────────

/// Kinds of payload an [`Envelope`] can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    /// A request or notification.
    Request,
    /// A response.
    Response,
}

impl EnvelopeKind {
    /// Wire name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
        }
    }

    /// Parse a wire name. Unknown names yield `None`.
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "request" => Some(Self::Request),
            "response" => Some(Self::Response),
            _ => None,
        }
    }
}

impl std::fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Self-describing `{type, message}` container.
///
/// `kind` stays a plain string so that frames with unknown kinds still parse
/// and can be reported before they are dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Payload kind (`request` or `response`).
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Serialized payload.
    #[serde(rename = "message", default)]
    pub payload: String,
}

impl Envelope {
    /// Wrap `payload` as `kind`.
    pub fn new(kind: EnvelopeKind, payload: impl Into<String>) -> Self {
        Self {
            kind: kind.as_str().to_owned(),
            payload: payload.into(),
        }
    }

    /// Check the kind is routable and the payload present.
    pub fn validate(&self) -> Result<EnvelopeKind> {
        if self.kind.is_empty() {
            return Err(RpcError::invalid("envelope kind is missing"));
        }
        let kind = EnvelopeKind::parse(&self.kind)
            .ok_or_else(|| RpcError::invalid(format!("unknown envelope kind '{}'", self.kind)))?;
        if self.payload.trim().is_empty() {
            return Err(RpcError::invalid("envelope payload is empty"));
        }
        Ok(kind)
    }
}

// ── Request ─────────────────────────────────────────────────────────

/// A JSON-RPC request, or a notification when `id` is absent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version, always `"2.0"`.
    pub jsonrpc: String,
    /// Correlation id. Absent for notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Build a request expecting a response.
    pub fn new(id: i64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id: Some(id),
            method: method.into(),
            params,
        }
    }

    /// Build a notification (no id, no response).
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id: None,
            method: method.into(),
            params,
        }
    }

    /// Whether this is a notification.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Check version and method.
    pub fn validate(&self) -> Result<()> {
        if self.jsonrpc != JSONRPC_VERSION {
            return Err(RpcError::invalid(format!(
                "unsupported jsonrpc version '{}'",
                self.jsonrpc
            )));
        }
        if self.method.is_empty() {
            return Err(RpcError::invalid("method is empty"));
        }
        Ok(())
    }
}

// ── Response ────────────────────────────────────────────────────────

/// Error object inside a failed [`JsonRpcResponse`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorBody {
    /// Error code (see the `*_ERROR` constants).
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A JSON-RPC response carrying either `result` or `error`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version, always `"2.0"`.
    pub jsonrpc: String,
    /// Id of the request being answered.
    pub id: i64,
    /// Success payload. A `null` result is `Some(Value::Null)`.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,
    /// Failure payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorBody>,
}

/// Keep a present field as `Some`, even when it is `null`. A missing field
/// falls back to `default`.
fn present_value<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcResponse {
    /// Build a success response.
    pub fn success(id: i64, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response.
    pub fn error(id: i64, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id,
            result: None,
            error: Some(JsonRpcErrorBody {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Build an error response with structured details.
    pub fn error_with_data(id: i64, code: i64, message: impl Into<String>, data: Value) -> Self {
        let mut response = Self::error(id, code, message);
        if let Some(body) = response.error.as_mut() {
            body.data = Some(data);
        }
        response
    }

    /// Whether this response reports a failure.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Check version and that exactly one of `result`/`error` is set.
    pub fn validate(&self) -> Result<()> {
        if self.jsonrpc != JSONRPC_VERSION {
            return Err(RpcError::invalid(format!(
                "unsupported jsonrpc version '{}'",
                self.jsonrpc
            )));
        }
        if self.result.is_some() == self.error.is_some() {
            return Err(RpcError::invalid(
                "response must carry exactly one of result or error",
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── envelope ────────────────────────────────────────────────────

    #[test]
    fn envelope_wire_names() {
        let env = Envelope::new(EnvelopeKind::Request, "{}");
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value, json!({"type": "request", "message": "{}"}));
    }

    #[test]
    fn envelope_missing_fields_parse_empty() {
        let env: Envelope = serde_json::from_str("{}").unwrap();
        assert!(env.kind.is_empty());
        assert!(env.payload.is_empty());
    }

    #[test]
    fn envelope_validation() {
        assert_eq!(
            Envelope::new(EnvelopeKind::Response, "{}").validate().unwrap(),
            EnvelopeKind::Response
        );
        let unknown = Envelope {
            kind: "event".into(),
            payload: "{}".into(),
        };
        assert!(unknown.validate().unwrap_err().to_string().contains("'event'"));
        let empty = Envelope::new(EnvelopeKind::Request, "  ");
        assert!(empty.validate().is_err());
        let missing = Envelope {
            kind: String::new(),
            payload: "{}".into(),
        };
        assert!(missing.validate().is_err());
    }

    #[test]
    fn kind_parse_round_trip() {
        for kind in [EnvelopeKind::Request, EnvelopeKind::Response] {
            assert_eq!(EnvelopeKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EnvelopeKind::parse("REQUEST"), None);
    }

    // ── request ─────────────────────────────────────────────────────

    #[test]
    fn request_wire_shape() {
        let req = JsonRpcRequest::new(7, "build-start", Some(json!({"target": "x"})));
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({"jsonrpc": "2.0", "id": 7, "method": "build-start", "params": {"target": "x"}})
        );
    }

    #[test]
    fn notification_omits_id() {
        let note = JsonRpcRequest::notification("log", None);
        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(value, json!({"jsonrpc": "2.0", "method": "log"}));
        assert!(note.is_notification());

        let parsed: JsonRpcRequest = serde_json::from_value(value).unwrap();
        assert!(parsed.id.is_none());
    }

    #[test]
    fn request_validation() {
        assert!(JsonRpcRequest::new(1, "m", None).validate().is_ok());
        assert!(JsonRpcRequest::new(1, "", None).validate().is_err());
        let mut old = JsonRpcRequest::new(1, "m", None);
        old.jsonrpc = "1.0".into();
        assert!(old.validate().is_err());
    }

    // ── response ────────────────────────────────────────────────────

    #[test]
    fn success_response_shape() {
        let resp = JsonRpcResponse::success(3, json!("ok"));
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value, json!({"jsonrpc": "2.0", "id": 3, "result": "ok"}));
        assert!(!resp.is_error());
    }

    #[test]
    fn null_result_is_still_serialized() {
        let resp = JsonRpcResponse::success(3, Value::Null);
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value, json!({"jsonrpc": "2.0", "id": 3, "result": null}));
        assert!(resp.validate().is_ok());
    }

    #[test]
    fn null_result_parses_as_success() {
        let resp: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert_eq!(resp.result, Some(Value::Null));
        assert!(resp.validate().is_ok());
    }

    #[test]
    fn missing_result_and_error_is_invalid() {
        let resp: JsonRpcResponse = serde_json::from_str(r#"{"jsonrpc":"2.0","id":1}"#).unwrap();
        assert_eq!(resp.result, None);
        assert!(resp.validate().is_err());
    }

    #[test]
    fn error_response_shape() {
        let resp = JsonRpcResponse::error_with_data(4, METHOD_NOT_FOUND, "no such method", json!("m"));
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            value,
            json!({
                "jsonrpc": "2.0",
                "id": 4,
                "error": {"code": -32601, "message": "no such method", "data": "m"}
            })
        );
        assert!(resp.is_error());
    }

    #[test]
    fn response_needs_exactly_one_outcome() {
        let mut both = JsonRpcResponse::success(1, json!(1));
        both.error = Some(JsonRpcErrorBody {
            code: INTERNAL_ERROR,
            message: "x".into(),
            data: None,
        });
        assert!(both.validate().is_err());

        let mut neither = JsonRpcResponse::success(1, json!(1));
        neither.result = None;
        assert!(neither.validate().is_err());
    }

    #[test]
    fn standard_codes() {
        assert_eq!(PARSE_ERROR, -32700);
        assert_eq!(INVALID_REQUEST, -32600);
        assert_eq!(INVALID_PARAMS, -32602);
    }
}
