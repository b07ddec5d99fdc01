//! Connection — one authorized chat session over one transport.
//!
//! Lifecycle: `Unauthenticated → Authorizing → Active → Closed`. There is
//! no way back. [`Connection::authorize`] performs the handshake and, on
//! success, spawns the read and write pumps (see [`pump`]). From then on the
//! routing component talks to the session only through
//! [`Connection::requests`], [`Connection::responses`], and
//! [`Connection::leave`].

mod pump;

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use chatty_core::config::ConnectionSettings;
use chatty_core::wire::decode_credentials;
use chatty_core::{Conversant, Request, Response};

use crate::auth::{AuthError, Authenticator};
use crate::shutdown::Shutdown;
use crate::transport::{Transport, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unauthenticated,
    /// Handshake in progress. Only visible from outside if the `authorize`
    /// future was dropped before it finished; such a connection cannot be
    /// authorized again and should be dropped.
    Authorizing,
    Active,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Unauthenticated => "unauthenticated",
            ConnectionState::Authorizing => "authorizing",
            ConnectionState::Active => "active",
            ConnectionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Read failure or deadline expiry during the handshake.
    #[error("transport failed during handshake: {0}")]
    Transport(#[from] TransportError),

    /// The auth gate refused the credentials.
    #[error("not authorized: {0}")]
    Unauthorized(#[source] AuthError),

    #[error("cannot authorize a connection that is {0}")]
    InvalidState(ConnectionState),
}

impl ConnectionError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ConnectionError::Unauthorized(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ConnectionError::Transport(e) if e.is_timeout())
    }
}

pub struct Connection<T: Transport> {
    transport: Arc<T>,
    auth: Arc<dyn Authenticator>,
    settings: ConnectionSettings,
    state: ConnectionState,
    conversant: Option<Conversant>,
    shutdown: Shutdown,
    requests: mpsc::Receiver<Request>,
    responses: mpsc::Sender<Response>,
    // Pump ends, moved into the tasks on authorize.
    requests_tx: Option<mpsc::Sender<Request>>,
    responses_rx: Option<mpsc::Receiver<Response>>,
    pumps: Vec<JoinHandle<()>>,
}

impl<T: Transport> Connection<T> {
    pub fn new(transport: T, auth: Arc<dyn Authenticator>, settings: ConnectionSettings) -> Self {
        let (requests_tx, requests) = mpsc::channel(settings.request_capacity());
        let (responses, responses_rx) = mpsc::channel(settings.response_capacity());
        Self {
            transport: Arc::new(transport),
            auth,
            settings,
            state: ConnectionState::Unauthenticated,
            conversant: None,
            shutdown: Shutdown::new(),
            requests,
            responses,
            requests_tx: Some(requests_tx),
            responses_rx: Some(responses_rx),
            pumps: Vec::with_capacity(2),
        }
    }

    /// Run the handshake: read one credentials message within the auth
    /// deadline and pass it to the gate. On success the pumps start; on any
    /// failure the transport is closed and the connection is finished.
    pub async fn authorize(&mut self) -> Result<(), ConnectionError> {
        if self.state != ConnectionState::Unauthenticated {
            return Err(ConnectionError::InvalidState(self.state()));
        }
        self.state = ConnectionState::Authorizing;

        let conversant = match self.handshake().await {
            Ok(conversant) => conversant,
            Err(e) => {
                if e.is_unauthorized() {
                    tracing::warn!(error = %e, "handshake rejected");
                } else {
                    tracing::debug!(error = %e, "handshake failed");
                }
                self.shutdown.close(&*self.transport).await;
                self.state = ConnectionState::Closed;
                // No pumps will run; let channel users observe the end.
                self.requests_tx = None;
                self.responses_rx = None;
                return Err(e);
            }
        };

        self.transport.set_read_deadline(None);
        tracing::info!(
            conversant = conversant.id,
            display_name = %conversant.display_name,
            "connection authorized"
        );
        self.conversant = Some(conversant);
        self.state = ConnectionState::Active;
        self.spawn_pumps();
        Ok(())
    }

    async fn handshake(&self) -> Result<Conversant, ConnectionError> {
        self.transport
            .set_read_deadline(Some(Instant::now() + self.settings.auth_timeout()));
        let body = self.transport.read_message().await?;

        let credentials = decode_credentials(&body).map_err(|e| {
            ConnectionError::Unauthorized(AuthError::MalformedCredentials(e.to_string()))
        })?;

        self.auth
            .authorize(&credentials)
            .await
            .map_err(ConnectionError::Unauthorized)
    }

    fn spawn_pumps(&mut self) {
        let (Some(requests_tx), Some(responses_rx)) =
            (self.requests_tx.take(), self.responses_rx.take())
        else {
            return;
        };
        let conversant = self.conversant.as_ref().map(|c| c.id).unwrap_or_default();

        self.pumps.push(tokio::spawn(pump::read_pump(
            self.transport.clone(),
            requests_tx,
            self.shutdown.clone(),
            conversant,
        )));
        self.pumps.push(tokio::spawn(pump::write_pump(
            self.transport.clone(),
            responses_rx,
            self.shutdown.clone(),
            self.settings.write_timeout(),
            conversant,
        )));
    }

    pub fn state(&self) -> ConnectionState {
        match self.state {
            ConnectionState::Active if self.shutdown.is_signalled() => ConnectionState::Closed,
            state => state,
        }
    }

    /// The authorized conversant. `None` until `authorize` succeeds.
    pub fn conversant(&self) -> Option<&Conversant> {
        self.conversant.as_ref()
    }

    /// Decoded client requests, in arrival order. Yields `None` once the
    /// read pump has stopped.
    pub fn requests(&mut self) -> &mut mpsc::Receiver<Request> {
        &mut self.requests
    }

    /// Sender for responses to this client. Responses are written in the
    /// order they are sent.
    pub fn responses(&self) -> mpsc::Sender<Response> {
        self.responses.clone()
    }

    /// Handle for ending the session from outside, e.g. on kick or server
    /// shutdown.
    pub fn leave(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Wait until both pumps have exited. Returns immediately if the
    /// connection never became active.
    pub async fn join(&mut self) {
        for pump in self.pumps.drain(..) {
            if let Err(e) = pump.await {
                tracing::warn!(error = %e, "pump task failed");
            }
        }
    }
}
