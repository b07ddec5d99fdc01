use crate::*;

use chatty_conn::{ConnectionState, DisplayNameAuth, MemoryConversantStore};
use chatty_core::message::SendMessageRequest;
use chatty_core::Request;
use serde_json::json;

/// Credentials → conversant → first request, over a real socket.
#[tokio::test]
async fn test_display_name_login_then_send_message() -> Result<()> {
    let store = MemoryConversantStore::new();
    let server = Server::spawn(
        Arc::new(DisplayNameAuth::new(store.clone())),
        ConnectionSettings::default(),
    )
    .await?;

    let mut client = server.connect().await?;
    send_json(&mut client, json!({ "display_name": "alice" })).await?;

    let (mut conn, result) = server.handshake().await?;
    result?;
    assert_eq!(conn.state(), ConnectionState::Active);
    assert_eq!(conn.conversant(), Some(&Conversant::new(1, "alice")));
    assert_eq!(store.get(1), Some(Conversant::new(1, "alice")), "conversant persisted");

    send_json(
        &mut client,
        json!({ "type": "sendMessage", "data": { "conversationId": 1, "body": "hi" } }),
    )
    .await?;

    let request = tokio::time::timeout(WAIT, conn.requests().recv())
        .await
        .context("no request arrived")?;
    assert_eq!(
        request,
        Some(Request::SendMessage(SendMessageRequest {
            conversation_id: 1,
            body: "hi".into(),
        }))
    );
    Ok(())
}

/// A rejected client is disconnected without an error envelope.
#[tokio::test]
async fn test_rejected_credentials_disconnect() -> Result<()> {
    let server = Server::spawn(alice_gate(), ConnectionSettings::default()).await?;
    let mut client = server.connect().await?;
    send_json(&mut client, json!({ "display_name": "mallory" })).await?;

    let (conn, result) = server.handshake().await?;
    let err = result.expect_err("mallory must be rejected");
    assert!(err.is_unauthorized(), "expected unauthorized, got {err}");
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert!(conn.conversant().is_none());

    assert!(
        recv_envelope(&mut client).await?.is_none(),
        "rejected client should see the socket close, not an envelope"
    );
    Ok(())
}

/// Rejection releases the socket itself, not just the WebSocket session,
/// while routing still holds the connection.
#[tokio::test]
async fn test_rejected_client_socket_is_released() -> Result<()> {
    let server = Server::spawn(alice_gate(), ConnectionSettings::default()).await?;
    let mut client = server.connect().await?;
    send_json(&mut client, json!({ "display_name": "mallory" })).await?;

    let (conn, result) = server.handshake().await?;
    assert!(result.is_err());

    wait_for_tcp_eof(&mut client).await?;
    assert_eq!(conn.state(), ConnectionState::Closed);
    Ok(())
}

#[tokio::test]
async fn test_non_map_credentials_are_unauthorized() -> Result<()> {
    let server = Server::spawn(alice_gate(), ConnectionSettings::default()).await?;
    let mut client = server.connect().await?;
    send_json(&mut client, json!(["alice"])).await?;

    let (_conn, result) = server.handshake().await?;
    let err = result.expect_err("a list is not a credentials map");
    assert!(err.is_unauthorized());
    assert!(recv_envelope(&mut client).await?.is_none());
    Ok(())
}

/// A client that never sends credentials is cut off at the auth deadline.
#[tokio::test]
async fn test_silent_client_times_out() -> Result<()> {
    let settings = ConnectionSettings {
        auth_timeout_ms: 200,
        ..ConnectionSettings::default()
    };
    let server = Server::spawn(alice_gate(), settings).await?;
    let mut client = server.connect().await?;

    let (conn, result) = server.handshake().await?;
    let err = result.expect_err("silent client must time out");
    assert!(err.is_timeout(), "expected timeout, got {err}");
    assert!(!err.is_unauthorized());
    assert_eq!(conn.state(), ConnectionState::Closed);

    assert!(recv_envelope(&mut client).await?.is_none());
    Ok(())
}
