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

//! Inbound dispatch from the wire into the view model.
//!
//! Drives a real session against the mock server and folds every
//! `NetEvent` into an `App`, the way the main loop does.

mod common;

use std::time::{Duration, Instant};

use serde_json::json;
use tokio::sync::mpsc;
use wschat::app::{App, AppAction, LineKind, TOO_FAST_NOTICE};
use wschat::auth::AuthClient;
use wschat::net::{self, NetCommand, NetEvent};
use wschat::session::ConnectionState;

use common::MockServer;

/// Feed events into `app` until `done` holds.
async fn pump_until<F>(app: &mut App, rx: &mut mpsc::Receiver<NetEvent>, mut done: F)
where
    F: FnMut(&App) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done(app) {
            let event = rx.recv().await.expect("event channel closed");
            app.apply_net_event(event);
        }
    })
    .await
    .expect("timed out waiting for app state");
}

fn system_lines(app: &App) -> Vec<String> {
    app.log
        .iter()
        .filter(|l| l.kind == LineKind::System)
        .map(|l| l.text.clone())
        .collect()
}

async fn logged_in_app(server: &MockServer) -> (App, mpsc::Sender<NetCommand>, mpsc::Receiver<NetEvent>) {
    let auth = AuthClient::new(&server.base_url(), Duration::from_secs(5)).unwrap();
    let session = auth.login("alice", "pw").await.unwrap();

    let mut app = App::new().with_bell(true);
    app.begin_session(session.username());
    let (cmd_tx, mut evt_rx) = net::spawn_session(server.net_config(50, 400), session);
    pump_until(&mut app, &mut evt_rx, |a| {
        a.state == ConnectionState::Open && !a.presence.is_empty()
    })
    .await;
    (app, cmd_tx, evt_rx)
}

#[tokio::test]
async fn end_to_end_presence_chat_and_typing() {
    let server = MockServer::start().await;
    *server.state.initial_online.lock() = vec!["bob".to_string()];
    let (mut app, cmd_tx, mut evt_rx) = logged_in_app(&server).await;

    assert_eq!(app.presence.iter().collect::<Vec<_>>(), ["alice", "bob"]);

    server.push_event("user_joined", json!({ "user": "carol" }));
    server.push_event("typing", json!({ "user": "bob", "isTyping": true }));
    server.push("{ definitely not json");
    server.push_event("reaction", json!({ "emoji": "+1" }));
    server.push_event("chat", json!({ "from": "bob", "text": "hi alice" }));
    pump_until(&mut app, &mut evt_rx, |a| {
        a.log.iter().any(|l| l.text == "hi alice")
    })
    .await;

    assert!(app.presence.contains("carol"));
    assert!(system_lines(&app).contains(&"carol joined".to_string()));
    assert_eq!(app.typing_notice().as_deref(), Some("bob is typing..."));
    let chat = app.log.back().unwrap();
    assert_eq!(
        chat.kind,
        LineKind::Chat {
            sender: "bob".into(),
            is_self: false
        }
    );
    assert!(app.take_bell());

    server.push_event("typing", json!({ "user": "bob", "isTyping": false }));
    server.push_event("user_left", json!({ "user": "carol" }));
    pump_until(&mut app, &mut evt_rx, |a| !a.presence.contains("carol")).await;
    assert!(app.typing_user.is_none());
    assert!(system_lines(&app).contains(&"carol left".to_string()));

    cmd_tx.send(NetCommand::Shutdown).await.unwrap();
}

#[tokio::test]
async fn own_typing_echo_is_not_shown() {
    let server = MockServer::start().await;
    let (mut app, cmd_tx, mut evt_rx) = logged_in_app(&server).await;

    server.push_event("typing", json!({ "user": "alice", "isTyping": true }));
    server.push_event("user_joined", json!({ "user": "dave" }));
    pump_until(&mut app, &mut evt_rx, |a| a.presence.contains("dave")).await;
    assert!(app.typing_user.is_none());

    cmd_tx.send(NetCommand::Shutdown).await.unwrap();
}

#[tokio::test]
async fn server_error_event_becomes_notice() {
    let server = MockServer::start().await;
    let (mut app, cmd_tx, mut evt_rx) = logged_in_app(&server).await;

    server.push_event("error", json!({ "error": "rate_limited" }));
    pump_until(&mut app, &mut evt_rx, |a| {
        system_lines(a).iter().any(|l| l.contains("rate limit"))
    })
    .await;

    cmd_tx.send(NetCommand::Shutdown).await.unwrap();
}

#[tokio::test]
async fn key_driven_send_respects_cooldown_on_the_wire() {
    let server = MockServer::start().await;
    let (mut app, cmd_tx, _evt_rx) = logged_in_app(&server).await;

    let t0 = Instant::now();
    for (i, offset_ms) in [0u64, 300, 1_100].into_iter().enumerate() {
        let now = t0 + Duration::from_millis(offset_ms);
        app.input = format!("msg {i}");
        app.cursor_position = app.input.chars().count();
        let key = crossterm::event::KeyEvent::new(
            crossterm::event::KeyCode::Enter,
            crossterm::event::KeyModifiers::NONE,
        );
        if let Some(AppAction::Net(cmd)) = app.handle_key_event(key, now) {
            cmd_tx.send(cmd).await.unwrap();
        }
    }

    let received = server.wait_for_received(2).await;
    assert_eq!(
        received,
        [
            json!({ "type": "chat", "text": "msg 0" }),
            json!({ "type": "chat", "text": "msg 2" }),
        ]
    );
    assert!(system_lines(&app).contains(&TOO_FAST_NOTICE.to_string()));

    cmd_tx.send(NetCommand::Shutdown).await.unwrap();
}

#[tokio::test]
async fn disconnect_notice_then_recovery() {
    let server = MockServer::start().await;
    let (mut app, cmd_tx, mut evt_rx) = logged_in_app(&server).await;

    server.kick_all();
    pump_until(&mut app, &mut evt_rx, |a| {
        system_lines(a)
            .iter()
            .any(|l| l.starts_with("Disconnected. Reconnecting"))
    })
    .await;
    pump_until(&mut app, &mut evt_rx, |a| a.state == ConnectionState::Open).await;

    cmd_tx.send(NetCommand::Shutdown).await.unwrap();
}
