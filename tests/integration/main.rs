//! Chatty integration test harness.
//!
//! Every test runs a real WebSocket listener on 127.0.0.1 with an
//! OS-assigned port, accepts exactly one client, and drives it with a
//! tokio-tungstenite client. No external environment is required.
//!
//!   RUST_LOG=chatty_conn=trace cargo test --test integration

mod handshake;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use chatty_conn::{
    AuthError, Authenticator, Connection, ConnectionError, WsTransport,
};
use chatty_core::config::ConnectionSettings;
use chatty_core::{Conversant, Credentials, Envelope};

// ── Harness ───────────────────────────────────────────────────────────────────

/// Upper bound on any single wait in these tests.
pub const WAIT: Duration = Duration::from_secs(5);

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub type ServerConnection = Connection<WsTransport<TcpStream>>;

/// Install a test-writer subscriber once. Honors RUST_LOG.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A listener that accepts one client and runs the handshake on it.
pub struct Server {
    addr: SocketAddr,
    accepted: JoinHandle<Result<(ServerConnection, Result<(), ConnectionError>)>>,
}

impl Server {
    pub async fn spawn(auth: Arc<dyn Authenticator>, settings: ConnectionSettings) -> Result<Self> {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind listener")?;
        let addr = listener.local_addr()?;

        let accepted = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.context("accept failed")?;
            let transport = WsTransport::accept(stream)
                .await
                .context("websocket upgrade failed")?;
            let mut conn = Connection::new(transport, auth, settings);
            let result = conn.authorize().await;
            Ok((conn, result))
        });

        Ok(Self { addr, accepted })
    }

    pub async fn connect(&self) -> Result<Client> {
        let (client, _) = connect_async(format!("ws://{}", self.addr))
            .await
            .with_context(|| format!("failed to connect to {}", self.addr))?;
        Ok(client)
    }

    /// Wait for the handshake to finish on the server side.
    pub async fn handshake(self) -> Result<(ServerConnection, Result<(), ConnectionError>)> {
        tokio::time::timeout(WAIT, self.accepted)
            .await
            .context("handshake did not finish")??
    }
}

/// Gate that knows exactly one user.
pub fn alice_gate() -> Arc<dyn Authenticator> {
    Arc::new(|c: &Credentials| match c.get("display_name").map(String::as_str) {
        Some("alice") => Ok(Conversant::new(1, "alice")),
        _ => Err(AuthError::Rejected("unknown user".into())),
    })
}

/// Connect, send alice's credentials, and return both ends of an active session.
pub async fn active_session(settings: ConnectionSettings) -> Result<(ServerConnection, Client)> {
    let server = Server::spawn(alice_gate(), settings).await?;
    let mut client = server.connect().await?;
    send_json(&mut client, serde_json::json!({ "display_name": "alice" })).await?;
    let (conn, result) = server.handshake().await?;
    result.context("alice should be authorized")?;
    Ok((conn, client))
}

pub async fn send_json(client: &mut Client, value: serde_json::Value) -> Result<()> {
    client
        .send(Message::Text(value.to_string().into()))
        .await
        .context("client send failed")
}

/// Next envelope from the server, or `None` once the server has closed.
pub async fn recv_envelope(client: &mut Client) -> Result<Option<Envelope>> {
    loop {
        let next = tokio::time::timeout(WAIT, client.next())
            .await
            .context("timed out waiting for server")?;
        match next {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(text.as_str())
                    .map(Some)
                    .context("server sent a non-envelope");
            }
            Some(Ok(Message::Close(_))) | None => return Ok(None),
            Some(Ok(Message::Binary(_))) => bail!("server sent a binary frame"),
            Some(Ok(_)) => continue,
            // Reset after close counts as closed.
            Some(Err(_)) => return Ok(None),
        }
    }
}

/// Read the client's raw TCP stream, bypassing the WebSocket layer, until the
/// server releases the socket. A reset counts as released.
pub async fn wait_for_tcp_eof(client: &mut Client) -> Result<()> {
    let mut buf = [0u8; 1024];
    tokio::time::timeout(WAIT, async {
        loop {
            match client.get_mut().read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(_) => continue,
            }
        }
    })
    .await
    .context("server kept the socket open")
}
