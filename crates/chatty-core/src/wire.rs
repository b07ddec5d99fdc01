//! Chatty wire format — the `{type, data}` envelope used in both directions.
//!
//! Every message after the handshake is an [`Envelope`]. Only `type` is
//! inspected before dispatch; `data` is decoded into the payload shape the
//! type selects. The handshake itself is a flat credentials object, see
//! [`decode_credentials`].
//!
//! Nothing in this module performs I/O.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::conversant::Credentials;
use crate::message::{Request, RequestKind, Response};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Default deadline for the credentials message, in seconds.
pub const AUTH_TIMEOUT_SECS: u64 = 10;

/// Default deadline for writing one response, in seconds.
pub const WRITE_TIMEOUT_SECS: u64 = 5;

// ── Envelope ──────────────────────────────────────────────────────────────────

/// Wire wrapper for every post-handshake message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    pub fn to_json(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(WireError::Encode)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        serde_json::from_slice(bytes).map_err(|e| DecodeError::NotAnEnvelope(e.to_string()))
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Why an inbound message did not become a typed request.
///
/// These never tear down a connection; they ride inside
/// [`Request::Unrecognized`] and [`Request::Malformed`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("message is not an envelope: {0}")]
    NotAnEnvelope(String),

    #[error("unknown request type {0:?}")]
    UnknownType(String),

    #[error("invalid {kind} payload: {reason}")]
    InvalidPayload { kind: RequestKind, reason: String },
}

/// Errors from encoding outbound data or parsing the handshake.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("failed to encode envelope: {0}")]
    Encode(serde_json::Error),

    #[error("credentials are not a flat string map: {0}")]
    Credentials(serde_json::Error),
}

// ── Codec ─────────────────────────────────────────────────────────────────────

/// Decode one inbound message. Never fails: undecodable input becomes
/// [`Request::Unrecognized`] or [`Request::Malformed`].
pub fn decode_request(bytes: &[u8]) -> Request {
    let envelope = match Envelope::from_slice(bytes) {
        Ok(envelope) => envelope,
        Err(e) => return Request::Unrecognized(e),
    };

    let Some(kind) = RequestKind::from_wire(&envelope.kind) else {
        return Request::Unrecognized(DecodeError::UnknownType(envelope.kind));
    };

    let decoded = match kind {
        RequestKind::SendMessage => {
            serde_json::from_value(envelope.data).map(Request::SendMessage)
        }
        RequestKind::CreateConversation => {
            serde_json::from_value(envelope.data).map(Request::CreateConversation)
        }
        RequestKind::RetrieveConversation => {
            serde_json::from_value(envelope.data).map(Request::RetrieveConversation)
        }
    };

    decoded.unwrap_or_else(|e| {
        Request::Malformed(DecodeError::InvalidPayload {
            kind,
            reason: e.to_string(),
        })
    })
}

/// Wrap a response for the wire. The payload is passed through untouched.
pub fn encode_response(response: Response) -> Envelope {
    let kind = response.kind();
    Envelope::new(kind.as_str(), response.into_data())
}

/// Parse the handshake message: a flat JSON object of string fields.
pub fn decode_credentials(bytes: &[u8]) -> Result<Credentials, WireError> {
    serde_json::from_slice(bytes).map_err(WireError::Credentials)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
