//! `wschat`: terminal chat client.
//!
//! Logs in over HTTP, then keeps one WebSocket session open (reconnecting
//! with backoff) until logout or quit. Configuration via CLI flags,
//! environment variables, or config file (`~/.config/wschat/config.toml`).
//!
//! ```bash
//! # Log in interactively
//! cargo run --bin wschat -- --server https://chat.example.com
//!
//! # Log in straight away
//! WSCHAT_PASSWORD=secret cargo run --bin wschat -- --server http://127.0.0.1:8000 -u alice
//! ```

use std::io;
use std::path::Path;
use std::time::Instant;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    style::Print,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::{mpsc, oneshot};
use tracing_appender::non_blocking::WorkerGuard;

use wschat::app::{App, AppAction};
use wschat::auth::{AuthClient, AuthError};
use wschat::config::{CliArgs, ClientConfig};
use wschat::net::{self, NetCommand, NetEvent};
use wschat::session::Session;
use wschat::ui;

type LoginResult = Result<Session, AuthError>;

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    // An unusable config is fatal; the terminal is still untouched here.
    let config = ClientConfig::load(&cli).map_err(io::Error::other)?;

    // Initialize logging before terminal setup (logs go to file, not stdout).
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    tracing::info!(server = %config.server_url, "wschat starting");

    let auth = AuthClient::new(&config.server_url, config.connect_timeout)
        .map_err(io::Error::other)?;

    // Set up terminal.
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &config, &auth).await;

    // Restore terminal.
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("wschat exiting");
    result
}

/// Initialize file-based logging.
///
/// Logs are written to a file (never stdout, since ratatui owns the terminal).
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("wschat.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Handles to a running session supervisor.
struct SessionHandles {
    cmd_tx: mpsc::Sender<NetCommand>,
    evt_rx: mpsc::Receiver<NetEvent>,
}

/// Main application loop.
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: &ClientConfig,
    auth: &AuthClient,
) -> io::Result<()> {
    let mut app = App::new()
        .with_send_cooldown(config.send_cooldown)
        .with_typing_idle(config.typing_idle)
        .with_timestamp_format(config.timestamp_format.clone())
        .with_bell(config.bell_on_message)
        .with_max_log_lines(config.max_log_lines);

    let mut pending_login: Option<oneshot::Receiver<LoginResult>> = None;
    let mut session: Option<SessionHandles> = None;

    if let Some(username) = &config.username {
        app.login.username.clone_from(username);
    }
    if let Some(password) = &config.password {
        app.login.password.clone_from(password);
        if config.username.is_some()
            && let Some(AppAction::Login { username, password }) = app.submit_login()
        {
            pending_login = Some(start_login(auth, username, password));
        }
    }

    loop {
        // Step 1: Draw the UI frame.
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Step 2: Finish a login that completed since the last tick.
        if let Some(rx) = pending_login.as_mut() {
            match rx.try_recv() {
                Ok(Ok(new_session)) => {
                    pending_login = None;
                    app.begin_session(new_session.username());
                    let (cmd_tx, evt_rx) = net::spawn_session(config.to_net_config(), new_session);
                    session = Some(SessionHandles { cmd_tx, evt_rx });
                }
                Ok(Err(e)) => {
                    pending_login = None;
                    tracing::warn!(err = %e, "login failed");
                    app.login_failed(e.user_message());
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
                Err(oneshot::error::TryRecvError::Closed) => {
                    pending_login = None;
                    app.login_failed("Login was interrupted");
                }
            }
        }

        // Step 3: Drain all pending NetEvents (non-blocking).
        if let Some(handles) = session.as_mut()
            && !drain_net_events(&mut app, &mut handles.evt_rx)
        {
            session = None;
        }

        // Step 4: Tick timers (typing idle).
        let now = Instant::now();
        if let Some(cmd) = app.tick(now) {
            send_command(&mut app, session.as_ref(), cmd);
        }

        if app.take_bell() {
            execute!(terminal.backend_mut(), Print('\x07'))?;
        }

        // Step 5: Poll for terminal input events.
        if event::poll(config.poll_timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            match app.handle_key_event(key, Instant::now()) {
                Some(AppAction::Login { username, password }) => {
                    pending_login = Some(start_login(auth, username, password));
                }
                Some(AppAction::Net(cmd)) => send_command(&mut app, session.as_ref(), cmd),
                None => {}
            }
        }

        if app.should_quit {
            // Send shutdown command to the session supervisor.
            if let Some(handles) = &session {
                let _ = handles.cmd_tx.try_send(NetCommand::Shutdown);
            }
            return Ok(());
        }
    }
}

/// Run the login request in the background; the result arrives on the
/// returned channel.
fn start_login(
    auth: &AuthClient,
    username: String,
    password: String,
) -> oneshot::Receiver<LoginResult> {
    let (tx, rx) = oneshot::channel();
    let auth = auth.clone();
    tokio::spawn(async move {
        let result = auth.login(&username, &password).await;
        let _ = tx.send(result);
    });
    rx
}

fn send_command(app: &mut App, session: Option<&SessionHandles>, cmd: NetCommand) {
    let Some(handles) = session else {
        if matches!(cmd, NetCommand::SendChat { .. }) {
            app.push_system(net::NOT_CONNECTED_NOTICE);
        }
        return;
    };
    match handles.cmd_tx.try_send(cmd) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            app.push_system("Network busy, command dropped");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            app.push_system("Session ended");
        }
    }
}

/// Drain all pending `NetEvent`s into the app.
///
/// Returns `false` once the supervisor has gone away.
fn drain_net_events(app: &mut App, rx: &mut mpsc::Receiver<NetEvent>) -> bool {
    loop {
        match rx.try_recv() {
            Ok(event) => app.apply_net_event(event),
            Err(mpsc::error::TryRecvError::Empty) => return true,
            Err(mpsc::error::TryRecvError::Disconnected) => return false,
        }
    }
}
