//! Transport port — a message-oriented duplex stream.
//!
//! This is the only seam between the connection and a real network library.
//! Methods take `&self` so the read pump, the write pump, and the shutdown
//! path can share one transport behind an `Arc`; implementations keep each
//! direction behind its own lock.

use std::future::Future;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use chatty_core::Envelope;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport closed by peer")]
    Closed,

    #[error("{0} deadline exceeded")]
    Timeout(&'static str),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("failed to encode outbound message: {0}")]
    Encode(#[from] chatty_core::wire::WireError),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Deadline applied to subsequent reads. `None` clears it.
    fn set_read_deadline(&self, deadline: Option<Instant>);

    /// Deadline applied to subsequent writes.
    fn set_write_deadline(&self, deadline: Option<Instant>);

    /// Read one whole message.
    async fn read_message(&self) -> Result<Vec<u8>, TransportError>;

    /// Write one structured message.
    async fn write_envelope(&self, envelope: &Envelope) -> Result<(), TransportError>;

    /// Close the transport and release the underlying connection. Pending
    /// reads and writes should fail with [`TransportError::Closed`]. Closing an
    /// already-closed transport is not an error.
    async fn close(&self) -> Result<(), TransportError>;
}

/// An optional absolute deadline for one direction of I/O.
#[derive(Debug, Default)]
pub struct Deadline {
    at: Mutex<Option<Instant>>,
}

impl Deadline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, deadline: Option<Instant>) {
        *self.at.lock().unwrap_or_else(|p| p.into_inner()) = deadline;
    }

    pub fn get(&self) -> Option<Instant> {
        *self.at.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Drive `op` to completion, failing with [`TransportError::Timeout`]
    /// if the deadline passes first.
    pub async fn run<T, F>(&self, what: &'static str, op: F) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        match self.get() {
            Some(at) => tokio::time::timeout_at(at, op)
                .await
                .map_err(|_| TransportError::Timeout(what))?,
            None => op.await,
        }
    }
}
