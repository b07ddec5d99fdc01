//! Shutdown coordination for a connection's pump pair.
//!
//! The signal is a cancellation token: firing it never blocks, firing it
//! twice is a no-op, and any number of tasks can wait on it. Closing the
//! transport goes through a separate atomic guard so exactly one caller
//! reaches `Transport::close`, whichever pump gets there first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::transport::Transport;

/// Cloneable handle to a connection's shutdown signal.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
    closed: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask both pumps to stop.
    pub fn signal(&self) {
        self.token.cancel();
    }

    pub fn is_signalled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal has fired.
    pub async fn signalled(&self) {
        self.token.cancelled().await;
    }

    /// Whether the transport close has been claimed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Fire the signal and close the transport, unless another caller
    /// already claimed the close. Returns `true` for the caller that closed.
    pub async fn close<T: Transport + ?Sized>(&self, transport: &T) -> bool {
        self.signal();
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Err(e) = transport.close().await {
            tracing::debug!(error = %e, "transport close failed");
        }
        true
    }
}
