//! WebSocket transport over `tokio-tungstenite`.
//!
//! The socket is split once; the read half and the write half sit behind
//! separate locks so a blocked read never holds up a write. Closing cancels
//! any read or write in flight, sends a close frame, and drops both halves,
//! which releases the underlying socket even while the transport itself is
//! still referenced.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;

use chatty_core::Envelope;

use crate::transport::{Deadline, Transport, TransportError};

/// Upper bound on sending the close frame. Independent of the write
/// deadline, which may already have passed when a write timed out.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

pub struct WsTransport<S> {
    sink: Mutex<Option<SplitSink<WebSocketStream<S>, Message>>>,
    stream: Mutex<Option<SplitStream<WebSocketStream<S>>>>,
    closing: CancellationToken,
    read_deadline: Deadline,
    write_deadline: Deadline,
}

impl<S> WsTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap an already-upgraded WebSocket.
    pub fn new(ws: WebSocketStream<S>) -> Self {
        let (sink, stream) = ws.split();
        Self {
            sink: Mutex::new(Some(sink)),
            stream: Mutex::new(Some(stream)),
            closing: CancellationToken::new(),
            read_deadline: Deadline::new(),
            write_deadline: Deadline::new(),
        }
    }

    /// Run the server side of the WebSocket upgrade on a raw stream.
    pub async fn accept(stream: S) -> Result<Self, TransportError> {
        let ws = tokio_tungstenite::accept_async(stream).await?;
        Ok(Self::new(ws))
    }

    /// Whether [`Transport::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closing.is_cancelled()
    }
}

#[async_trait]
impl<S> Transport for WsTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn set_read_deadline(&self, deadline: Option<Instant>) {
        self.read_deadline.set(deadline);
    }

    fn set_write_deadline(&self, deadline: Option<Instant>) {
        self.write_deadline.set(deadline);
    }

    async fn read_message(&self) -> Result<Vec<u8>, TransportError> {
        let mut guard = tokio::select! {
            biased;
            _ = self.closing.cancelled() => return Err(TransportError::Closed),
            guard = self.stream.lock() => guard,
        };
        let stream = guard.as_mut().ok_or(TransportError::Closed)?;

        let read = self.read_deadline.run("read", async {
            loop {
                match stream.next().await {
                    Some(Ok(Message::Text(text))) => return Ok(text.as_bytes().to_vec()),
                    Some(Ok(Message::Binary(data))) => return Ok(data.to_vec()),
                    Some(Ok(Message::Close(_))) | None => return Err(TransportError::Closed),
                    // Control frames; tungstenite answers pings itself.
                    Some(Ok(_)) => continue,
                    Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                        return Err(TransportError::Closed)
                    }
                    Some(Err(e)) => return Err(TransportError::from(e)),
                }
            }
        });
        tokio::select! {
            biased;
            _ = self.closing.cancelled() => Err(TransportError::Closed),
            result = read => result,
        }
    }

    async fn write_envelope(&self, envelope: &Envelope) -> Result<(), TransportError> {
        let text = envelope.to_json()?;
        let mut guard = tokio::select! {
            biased;
            _ = self.closing.cancelled() => return Err(TransportError::Closed),
            guard = self.sink.lock() => guard,
        };
        let sink = guard.as_mut().ok_or(TransportError::Closed)?;

        let write = self.write_deadline.run("write", async {
            sink.send(Message::Text(text.into())).await?;
            Ok::<_, TransportError>(())
        });
        tokio::select! {
            biased;
            _ = self.closing.cancelled() => Err(TransportError::Closed),
            result = write => result,
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        // Wakes readers and writers so both locks come free.
        self.closing.cancel();
        let deadline = Instant::now() + CLOSE_TIMEOUT;

        let Some(mut sink) = self.sink.lock().await.take() else {
            return Ok(());
        };
        let handshake = match tokio::time::timeout_at(deadline, sink.close()).await {
            Ok(Ok(())) | Ok(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => Ok(()),
            Ok(Err(e)) => Err(TransportError::from(e)),
            Err(_) => Err(TransportError::Timeout("close")),
        };

        // The socket goes away once both halves are dropped.
        let stream = self.stream.lock().await.take();
        drop(stream);
        drop(sink);
        handshake
    }
}
