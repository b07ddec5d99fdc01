//! chatty-core — shared types, wire format, and configuration.
//! The connection crate and every routing component depend on this one.

pub mod config;
pub mod conversant;
pub mod message;
pub mod wire;

pub use conversant::{Conversant, ConversantId, Credentials};
pub use message::{Request, RequestKind, Response, ResponseKind};
pub use wire::{decode_request, encode_response, DecodeError, Envelope};
