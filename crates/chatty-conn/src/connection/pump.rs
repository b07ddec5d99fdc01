//! Read and write pumps, one task per direction of I/O.
//!
//! Both pumps race the shared [`Shutdown`] signal at every suspension point
//! and close the transport through it on the way out, so whichever pump
//! stops first takes the other down with it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use chatty_core::wire::{decode_request, encode_response};
use chatty_core::{ConversantId, Request, Response};

use crate::shutdown::Shutdown;
use crate::transport::Transport;

/// Transport → request channel.
pub(super) async fn read_pump<T: Transport>(
    transport: Arc<T>,
    requests: mpsc::Sender<Request>,
    shutdown: Shutdown,
    conversant: ConversantId,
) {
    loop {
        let message = tokio::select! {
            biased;
            _ = shutdown.signalled() => break,
            message = transport.read_message() => message,
        };

        let bytes = match message {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(conversant, error = %e, "read failed, shutting down");
                shutdown.signal();
                break;
            }
        };

        let request = decode_request(&bytes);
        match request.decode_error() {
            Some(e) => tracing::debug!(conversant, error = %e, "undecodable request"),
            None => tracing::trace!(conversant, kind = ?request.kind(), "request received"),
        }

        // Blocks while the routing component is behind.
        tokio::select! {
            biased;
            _ = shutdown.signalled() => break,
            sent = requests.send(request) => {
                if sent.is_err() {
                    tracing::debug!(conversant, "request receiver dropped, shutting down");
                    shutdown.signal();
                    break;
                }
            }
        }
    }

    if shutdown.close(&*transport).await {
        tracing::info!(conversant, "connection closed (read side)");
    }
}

/// Response channel → transport.
pub(super) async fn write_pump<T: Transport>(
    transport: Arc<T>,
    mut responses: mpsc::Receiver<Response>,
    shutdown: Shutdown,
    write_timeout: Duration,
    conversant: ConversantId,
) {
    loop {
        let response = tokio::select! {
            biased;
            _ = shutdown.signalled() => break,
            next = responses.recv() => match next {
                Some(response) => response,
                None => {
                    tracing::debug!(conversant, "response senders dropped, shutting down");
                    break;
                }
            },
        };

        let kind = response.kind();
        let envelope = encode_response(response);
        transport.set_write_deadline(Some(Instant::now() + write_timeout));
        if let Err(e) = transport.write_envelope(&envelope).await {
            tracing::warn!(conversant, %kind, error = %e, "write failed, shutting down");
            break;
        }
        tracing::trace!(conversant, %kind, "response sent");
    }

    if shutdown.close(&*transport).await {
        tracing::info!(conversant, "connection closed (write side)");
    }
}
