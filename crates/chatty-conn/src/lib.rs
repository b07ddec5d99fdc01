//! chatty-conn — the per-client connection layer.
//!
//! A [`Connection`] owns one [`Transport`], authorizes it through an
//! [`Authenticator`], then runs a read pump and a write pump that bridge the
//! transport to a request channel and a response channel. Both pumps share a
//! [`Shutdown`] handle that closes the transport exactly once.

pub mod auth;
pub mod connection;
pub mod shutdown;
pub mod store;
pub mod transport;
pub mod ws;


pub use auth::{AuthError, Authenticator, DisplayNameAuth};
pub use connection::{Connection, ConnectionError, ConnectionState};
pub use shutdown::Shutdown;
pub use store::{ConversantStore, MemoryConversantStore, StoreError};
pub use transport::{Deadline, Transport, TransportError};
pub use ws::WsTransport;
