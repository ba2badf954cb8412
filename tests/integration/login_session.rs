// Test-specific lint overrides: integration tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::future_not_send,
    clippy::redundant_pub_crate,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Login and first connection against an in-process mock server.
//!
//! Covers:
//! - login stores the issued token and the session reaches `Open` exactly once
//! - the token travels as the `token` query parameter of `/ws`
//! - outbound frames use the flat `{type, text}` / `{type, isTyping}` shape
//! - rejected logins surface the server's reason

mod common;

use std::time::Duration;

use serde_json::json;
use wschat::auth::{AuthClient, AuthError};
use wschat::net::{self, NetCommand, NetEvent};
use wschat::session::ConnectionState;
use wschat_proto::event::InboundEvent;

use common::{MockServer, collect_for, wait_for_event};

fn auth_for(server: &MockServer) -> AuthClient {
    AuthClient::new(&server.base_url(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn login_opens_session_once_and_exchanges_chat() {
    let server = MockServer::start().await;
    *server.state.initial_online.lock() = vec!["bob".to_string()];

    let session = auth_for(&server).login("alice", "pw").await.unwrap();
    assert_eq!(session.username(), "alice");
    assert_eq!(session.token(), "t1");
    assert_eq!(session.state(), ConnectionState::Disconnected);

    let (cmd_tx, mut evt_rx) = net::spawn_session(server.net_config(100, 1_000), session);

    let first = wait_for_event(&mut evt_rx, |_| true).await;
    assert_eq!(first, NetEvent::StateChanged(ConnectionState::Connecting));
    wait_for_event(&mut evt_rx, |e| {
        *e == NetEvent::StateChanged(ConnectionState::Open)
    })
    .await;

    let online = wait_for_event(&mut evt_rx, |e| matches!(e, NetEvent::Inbound(_))).await;
    assert_eq!(
        online,
        NetEvent::Inbound(InboundEvent::OnlineList {
            users: vec!["bob".into(), "alice".into()]
        })
    );

    server.push_event("chat", json!({ "from": "bob", "text": "hi" }));
    let chat = wait_for_event(&mut evt_rx, |e| matches!(e, NetEvent::Inbound(_))).await;
    assert_eq!(
        chat,
        NetEvent::Inbound(InboundEvent::Chat {
            from: "bob".into(),
            text: "hi".into()
        })
    );

    cmd_tx
        .send(NetCommand::SendChat {
            text: "hello".into(),
        })
        .await
        .unwrap();
    let received = server.wait_for_received(1).await;
    assert_eq!(received[0], json!({ "type": "chat", "text": "hello" }));

    assert_eq!(*server.state.ws_tokens.lock(), ["t1"]);

    // Nothing else happens to the connection: no second open, no retry.
    let later = collect_for(&mut evt_rx, Duration::from_millis(300)).await;
    assert!(
        later.iter().all(|e| !matches!(e, NetEvent::StateChanged(_))),
        "unexpected state change: {later:?}"
    );
    assert_eq!(
        server
            .state
            .accepted
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );

    cmd_tx.send(NetCommand::Shutdown).await.unwrap();
}

#[tokio::test]
async fn typing_frames_use_flat_envelope() {
    let server = MockServer::start().await;
    let session = auth_for(&server).login("alice", "pw").await.unwrap();
    let (cmd_tx, mut evt_rx) = net::spawn_session(server.net_config(100, 1_000), session);
    wait_for_event(&mut evt_rx, |e| {
        *e == NetEvent::StateChanged(ConnectionState::Open)
    })
    .await;

    cmd_tx
        .send(NetCommand::SetTyping { is_typing: true })
        .await
        .unwrap();
    cmd_tx
        .send(NetCommand::SetTyping { is_typing: false })
        .await
        .unwrap();

    let received = server.wait_for_received(2).await;
    assert_eq!(
        received,
        [
            json!({ "type": "typing", "isTyping": true }),
            json!({ "type": "typing", "isTyping": false }),
        ]
    );
    cmd_tx.send(NetCommand::Shutdown).await.unwrap();
}

#[tokio::test]
async fn wrong_password_is_rejected_with_reason() {
    let server = MockServer::start().await;
    let err = auth_for(&server).login("alice", "nope").await.unwrap_err();
    match err {
        AuthError::Rejected { status, ref reason } => {
            assert_eq!(status, 401);
            assert_eq!(reason, "invalid_credentials");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
    assert_eq!(err.user_message(), "Invalid username or password");
    assert!(server.state.ws_tokens.lock().is_empty());
}

#[tokio::test]
async fn rate_limited_login_is_reported() {
    let server = MockServer::start().await;
    let err = auth_for(&server).login("flood", "x").await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::Rejected { status: 429, ref reason } if reason == "rate_limited"
    ));
}

#[tokio::test]
async fn credentials_are_trimmed_before_sending() {
    let server = MockServer::start().await;
    let session = auth_for(&server).login("  alice ", " pw ").await.unwrap();
    assert_eq!(session.username(), "alice");
}

#[tokio::test]
async fn unreachable_server_is_an_http_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base = url::Url::parse(&format!("http://{addr}/")).unwrap();
    let auth = AuthClient::new(&base, Duration::from_secs(2)).unwrap();
    let err = auth.login("alice", "pw").await.unwrap_err();
    assert!(matches!(err, AuthError::Http(_)), "got {err:?}");
}
