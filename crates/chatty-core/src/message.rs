//! Domain requests and responses carried over a chat connection.
//!
//! Requests flow client → server and are produced by [`crate::wire::decode_request`].
//! Responses flow server → client and are consumed by [`crate::wire::encode_response`].
//! Both directions are closed enums so every wire `type` string is matched
//! exhaustively at compile time.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::conversant::ConversantId;
use crate::wire::DecodeError;

/// Conversation identifier, owned by the persistence layer.
pub type ConversationId = i64;

// ── Request payloads ──────────────────────────────────────────────────────────

/// Post `body` into an existing conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub conversation_id: ConversationId,
    pub body: String,
}

/// Open a conversation with the listed conversants.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    #[serde(default)]
    pub conversants: Vec<ConversantId>,
    /// Optional first message, posted on creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_message: Option<String>,
}

/// Fetch a conversation and its history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveConversationRequest {
    pub conversation_id: ConversationId,
}

// ── Request ───────────────────────────────────────────────────────────────────

/// Client → server request type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    SendMessage,
    CreateConversation,
    RetrieveConversation,
}

impl RequestKind {
    pub const ALL: [RequestKind; 3] = [
        RequestKind::SendMessage,
        RequestKind::CreateConversation,
        RequestKind::RetrieveConversation,
    ];

    /// Wire `type` string.
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::SendMessage => "sendMessage",
            RequestKind::CreateConversation => "createConversation",
            RequestKind::RetrieveConversation => "retrieveConversation",
        }
    }

    pub fn from_wire(tag: &str) -> Option<Self> {
        match tag {
            "sendMessage" => Some(RequestKind::SendMessage),
            "createConversation" => Some(RequestKind::CreateConversation),
            "retrieveConversation" => Some(RequestKind::RetrieveConversation),
            _ => None,
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded client request.
///
/// Decoding never fails outright: anything the codec cannot turn into a
/// typed request arrives as [`Request::Unrecognized`] or
/// [`Request::Malformed`], carrying the cause. The routing component decides
/// whether to answer those with an `error` response; neither is a reason to
/// drop the connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    SendMessage(SendMessageRequest),
    CreateConversation(CreateConversationRequest),
    RetrieveConversation(RetrieveConversationRequest),
    /// Known `type` whose `data` does not fit the payload shape.
    Malformed(DecodeError),
    /// Unknown `type`, or not an envelope at all.
    Unrecognized(DecodeError),
}

impl Request {
    /// The request kind, if the `type` was recognised.
    pub fn kind(&self) -> Option<RequestKind> {
        match self {
            Request::SendMessage(_) => Some(RequestKind::SendMessage),
            Request::CreateConversation(_) => Some(RequestKind::CreateConversation),
            Request::RetrieveConversation(_) => Some(RequestKind::RetrieveConversation),
            Request::Malformed(DecodeError::InvalidPayload { kind, .. }) => Some(*kind),
            Request::Malformed(_) | Request::Unrecognized(_) => None,
        }
    }

    pub fn decode_error(&self) -> Option<&DecodeError> {
        match self {
            Request::Malformed(e) | Request::Unrecognized(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.decode_error().is_some()
    }
}

// ── Response ──────────────────────────────────────────────────────────────────

/// Server → client response type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    NewMessage,
    NewConversation,
    ReturnConversation,
    Error,
}

impl ResponseKind {
    pub const ALL: [ResponseKind; 4] = [
        ResponseKind::NewMessage,
        ResponseKind::NewConversation,
        ResponseKind::ReturnConversation,
        ResponseKind::Error,
    ];

    /// Wire `type` string.
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseKind::NewMessage => "newMessage",
            ResponseKind::NewConversation => "newConversation",
            ResponseKind::ReturnConversation => "returnConversation",
            ResponseKind::Error => "error",
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response produced by the routing component. The payload is passed
/// through to the wire verbatim; the `type` tag comes from
/// [`ResponseKind::as_str`].
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    NewMessage(Value),
    NewConversation(Value),
    ReturnConversation(Value),
    Error(Value),
}

impl Response {
    pub fn kind(&self) -> ResponseKind {
        match self {
            Response::NewMessage(_) => ResponseKind::NewMessage,
            Response::NewConversation(_) => ResponseKind::NewConversation,
            Response::ReturnConversation(_) => ResponseKind::ReturnConversation,
            Response::Error(_) => ResponseKind::Error,
        }
    }

    pub fn data(&self) -> &Value {
        match self {
            Response::NewMessage(v)
            | Response::NewConversation(v)
            | Response::ReturnConversation(v)
            | Response::Error(v) => v,
        }
    }

    pub fn into_data(self) -> Value {
        match self {
            Response::NewMessage(v)
            | Response::NewConversation(v)
            | Response::ReturnConversation(v)
            | Response::Error(v) => v,
        }
    }

    /// An `error` response with a human-readable message.
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error(serde_json::json!({ "message": message.into() }))
    }
}
