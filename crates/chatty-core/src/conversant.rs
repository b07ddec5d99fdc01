//! Conversant identity — who is on the other end of an authorized connection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Conversant identifier. Assigned by the persistence layer or the auth gate.
pub type ConversantId = i64;

/// Raw handshake credentials: a flat map of field name to string value.
pub type Credentials = HashMap<String, String>;

/// Well-known credential field names.
pub mod fields {
    pub const ID: &str = "id";
    pub const DISPLAY_NAME: &str = "display_name";
}

/// Resolved identity of an authenticated chat participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Conversant {
    pub id: ConversantId,
    pub display_name: String,
}

impl Conversant {
    pub fn new(id: ConversantId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}
