//! Application state and event handling.
//!
//! [`App`] is the view model: it turns key presses into [`AppAction`]s for
//! the main loop and folds [`NetEvent`]s into what the UI draws. It never
//! touches the network. Timers run off the `now` the caller passes in.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use wschat_proto::event::InboundEvent;

use crate::cooldown::SendCooldown;
use crate::net::{NOT_CONNECTED_NOTICE, NetCommand, NetEvent};
use crate::presence::PresenceSet;
use crate::session::ConnectionState;
use crate::typing::TypingDebouncer;

/// Notice shown when a chat send falls inside the cooldown window.
pub const TOO_FAST_NOTICE: &str = "You're sending messages too fast.";

/// Which screen is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Username/password form.
    Login,
    /// Message log, presence list and input box.
    Chat,
}

/// Focused field on the login form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    /// Username input.
    Username,
    /// Password input (rendered masked).
    Password,
}

/// State of the login form.
#[derive(Debug, Clone)]
pub struct LoginForm {
    /// Username as typed.
    pub username: String,
    /// Password as typed.
    pub password: String,
    /// Focused field.
    pub field: LoginField,
    /// Last failure, shown under the form.
    pub error: Option<String>,
    /// A login request is in flight.
    pub busy: bool,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            field: LoginField::Username,
            error: None,
            busy: false,
        }
    }
}

impl LoginForm {
    const fn focused_mut(&mut self) -> &mut String {
        match self.field {
            LoginField::Username => &mut self.username,
            LoginField::Password => &mut self.password,
        }
    }

    const fn toggle_field(&mut self) {
        self.field = match self.field {
            LoginField::Username => LoginField::Password,
            LoginField::Password => LoginField::Username,
        };
    }
}

/// What a log line represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// A chat message.
    Chat {
        /// Author.
        sender: String,
        /// Authored by the local user.
        is_self: bool,
    },
    /// A notice from the client itself (join/leave, disconnects, warnings).
    System,
}

/// One timestamped entry in the message log.
#[derive(Debug, Clone)]
pub struct LogLine {
    /// Chat or system.
    pub kind: LineKind,
    /// Message body or notice text.
    pub text: String,
    /// Formatted local time of arrival.
    pub timestamp: String,
    /// Own chat line that was echoed but never reached the server.
    pub undelivered: bool,
}

/// Something the main loop has to carry out on behalf of the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Submit credentials to the login endpoint.
    Login {
        /// Trimmed username.
        username: String,
        /// Trimmed password.
        password: String,
    },
    /// Forward a command to the session supervisor.
    Net(NetCommand),
}

/// Main application state.
pub struct App {
    /// Current screen.
    pub screen: Screen,
    /// Login form state.
    pub login: LoginForm,
    /// The logged-in user, if any.
    pub username: Option<String>,
    /// Last connection state reported by the supervisor.
    pub state: ConnectionState,
    /// Current text input.
    pub input: String,
    /// Cursor position in input (character index).
    pub cursor_position: usize,
    /// Message log, oldest first.
    pub log: VecDeque<LogLine>,
    /// How many lines the view is scrolled up from the newest.
    pub scroll: usize,
    /// Who is online.
    pub presence: PresenceSet,
    /// The single typing-indicator slot.
    pub typing_user: Option<String>,
    /// Whether the app should quit.
    pub should_quit: bool,
    cooldown: SendCooldown,
    typing: TypingDebouncer,
    timestamp_format: String,
    bell_on_message: bool,
    bell_pending: bool,
    max_log_lines: usize,
}

impl App {
    /// Create an app on the login screen with default timings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            screen: Screen::Login,
            login: LoginForm::default(),
            username: None,
            state: ConnectionState::Disconnected,
            input: String::new(),
            cursor_position: 0,
            log: VecDeque::new(),
            scroll: 0,
            presence: PresenceSet::new(),
            typing_user: None,
            should_quit: false,
            cooldown: SendCooldown::new(Duration::from_millis(1_000)),
            typing: TypingDebouncer::new(Duration::from_millis(800)),
            timestamp_format: "%H:%M".to_string(),
            bell_on_message: false,
            bell_pending: false,
            max_log_lines: 1_000,
        }
    }

    /// Set the minimum interval between chat sends.
    #[must_use]
    pub const fn with_send_cooldown(mut self, interval: Duration) -> Self {
        self.cooldown = SendCooldown::new(interval);
        self
    }

    /// Set how long input must be idle before typing stops.
    #[must_use]
    pub const fn with_typing_idle(mut self, idle: Duration) -> Self {
        self.typing = TypingDebouncer::new(idle);
        self
    }

    /// Set the chrono format used for log timestamps.
    #[must_use]
    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    /// Ring the bell when someone else's message arrives.
    #[must_use]
    pub const fn with_bell(mut self, enabled: bool) -> Self {
        self.bell_on_message = enabled;
        self
    }

    /// Cap the message log; older lines are dropped first.
    #[must_use]
    pub fn with_max_log_lines(mut self, max: usize) -> Self {
        self.max_log_lines = max.max(1);
        self
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Handle a key event at `now`.
    pub fn handle_key_event(&mut self, key: KeyEvent, now: Instant) -> Option<AppAction> {
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) | (KeyCode::Esc, _) => {
                self.should_quit = true;
                return None;
            }
            _ => {}
        }

        match self.screen {
            Screen::Login => self.handle_login_key(key),
            Screen::Chat => self.handle_chat_key(key, now),
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) -> Option<AppAction> {
        if self.login.busy {
            return None;
        }
        match key.code {
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.login.toggle_field();
            }
            KeyCode::Enter => {
                if self.login.field == LoginField::Username && self.login.password.is_empty() {
                    self.login.field = LoginField::Password;
                } else {
                    return self.submit_login();
                }
            }
            KeyCode::Char(c) => self.login.focused_mut().push(c),
            KeyCode::Backspace => {
                self.login.focused_mut().pop();
            }
            _ => {}
        }
        None
    }

    /// Validate the login form and produce a login action.
    ///
    /// Blank fields are reported on the form without a request.
    pub fn submit_login(&mut self) -> Option<AppAction> {
        let username = self.login.username.trim().to_string();
        let password = self.login.password.trim().to_string();
        if username.is_empty() || password.is_empty() {
            self.login.error = Some("Enter a username and password".to_string());
            return None;
        }
        self.login.busy = true;
        self.login.error = None;
        Some(AppAction::Login { username, password })
    }

    fn handle_chat_key(&mut self, key: KeyEvent, now: Instant) -> Option<AppAction> {
        match key.code {
            KeyCode::Enter => self.submit_input(now),
            KeyCode::Char(c) => {
                self.enter_char(c);
                self.input_changed(now)
            }
            KeyCode::Backspace => {
                if self.delete_char() {
                    self.input_changed(now)
                } else {
                    None
                }
            }
            KeyCode::Left => {
                self.cursor_position = self.cursor_position.saturating_sub(1);
                None
            }
            KeyCode::Right => {
                if self.cursor_position < self.input.chars().count() {
                    self.cursor_position += 1;
                }
                None
            }
            KeyCode::Home => {
                self.cursor_position = 0;
                None
            }
            KeyCode::End => {
                self.cursor_position = self.input.chars().count();
                None
            }
            KeyCode::PageUp => {
                self.scroll = (self.scroll + 5).min(self.log.len().saturating_sub(1));
                None
            }
            KeyCode::PageDown => {
                self.scroll = self.scroll.saturating_sub(5);
                None
            }
            _ => None,
        }
    }

    /// Typing is only announced over an open connection.
    fn input_changed(&mut self, now: Instant) -> Option<AppAction> {
        if self.state != ConnectionState::Open {
            return None;
        }
        self.typing
            .on_input(now)
            .then_some(AppAction::Net(NetCommand::SetTyping { is_typing: true }))
    }

    fn submit_input(&mut self, now: Instant) -> Option<AppAction> {
        let trimmed = self.input.trim();
        if trimmed.is_empty() {
            return None;
        }
        // `//text` sends `/text`.
        if let Some(command) = trimmed.strip_prefix('/')
            && !command.starts_with('/')
        {
            let command = command.to_string();
            return self.run_command(&command);
        }

        if self.state != ConnectionState::Open {
            self.push_system(NOT_CONNECTED_NOTICE);
            return None;
        }
        if self.cooldown.check(now).is_err() {
            self.push_system(TOO_FAST_NOTICE);
            return None;
        }
        self.cooldown.record(now);

        let mut text = std::mem::take(&mut self.input);
        self.cursor_position = 0;
        if text.trim_start().starts_with("//") {
            text = text.replacen("//", "/", 1);
        }
        let sender = self.username.clone().unwrap_or_default();
        self.push_line(
            LineKind::Chat {
                sender,
                is_self: true,
            },
            text.clone(),
        );
        Some(AppAction::Net(NetCommand::SendChat { text }))
    }

    fn run_command(&mut self, command: &str) -> Option<AppAction> {
        self.clear_input();
        match command {
            "reconnect" => {
                self.push_system("Reconnecting...");
                Some(AppAction::Net(NetCommand::Reconnect))
            }
            "logout" => Some(AppAction::Net(NetCommand::Logout)),
            "quit" => {
                self.should_quit = true;
                None
            }
            other => {
                self.push_system(format!(
                    "Unknown command: /{other} (try /reconnect, /logout, /quit)"
                ));
                None
            }
        }
    }

    /// Advance timers to `now`. Returns the trailing `typing:false` once a
    /// burst has gone idle.
    pub fn tick(&mut self, now: Instant) -> Option<NetCommand> {
        if !self.typing.poll(now) || self.state != ConnectionState::Open {
            return None;
        }
        Some(NetCommand::SetTyping { is_typing: false })
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor_position)
            .map_or(self.input.len(), |(i, _)| i)
    }

    fn enter_char(&mut self, c: char) {
        let index = self.byte_index();
        self.input.insert(index, c);
        self.cursor_position += 1;
    }

    /// Delete the character before the cursor. Returns `false` at the start.
    fn delete_char(&mut self) -> bool {
        if self.cursor_position == 0 {
            return false;
        }
        self.cursor_position -= 1;
        let index = self.byte_index();
        self.input.remove(index);
        true
    }

    fn clear_input(&mut self) {
        self.input.clear();
        self.cursor_position = 0;
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    /// Login succeeded: switch to the chat screen.
    pub fn begin_session(&mut self, username: &str) {
        self.username = Some(username.to_string());
        self.screen = Screen::Chat;
        self.login.busy = false;
        self.login.error = None;
        self.login.password.clear();
        self.push_system(format!("Logged in as {username}"));
    }

    /// Login failed: back to an editable form with `message` shown.
    pub fn login_failed(&mut self, message: impl Into<String>) {
        self.login.busy = false;
        self.login.error = Some(message.into());
    }

    /// The session ended by logout: reset everything but the log.
    pub fn logged_out(&mut self) {
        self.screen = Screen::Login;
        self.username = None;
        self.state = ConnectionState::Disconnected;
        self.presence.clear();
        self.typing_user = None;
        self.typing.reset();
        self.clear_input();
        self.login.busy = false;
        self.login.password.clear();
        self.login.field = LoginField::Password;
        self.login.error = Some("Logged out".to_string());
        self.push_system("Logged out");
    }

    /// Whether the bell should ring; clears the request.
    pub const fn take_bell(&mut self) -> bool {
        let ring = self.bell_pending;
        self.bell_pending = false;
        ring
    }

    // -----------------------------------------------------------------------
    // Network events
    // -----------------------------------------------------------------------

    /// Fold one supervisor event into the view.
    pub fn apply_net_event(&mut self, event: NetEvent) {
        match event {
            NetEvent::StateChanged(state) => self.set_state(state),
            NetEvent::ReconnectScheduled { delay, .. } => {
                self.push_system(format!(
                    "Disconnected. Reconnecting in {}...",
                    format_delay(delay)
                ));
            }
            NetEvent::Inbound(event) => self.apply_inbound(event),
            NetEvent::Error(message) => self.push_system(message),
            NetEvent::ChatNotSent { text } => self.chat_not_sent(&text),
            NetEvent::LoggedOut => self.logged_out(),
        }
    }

    /// The supervisor refused a send the view had already echoed. The newest
    /// matching own line is flagged and the cooldown it used is given back.
    fn chat_not_sent(&mut self, text: &str) {
        if let Some(line) = self.log.iter_mut().rev().find(|line| {
            matches!(line.kind, LineKind::Chat { is_self: true, .. })
                && !line.undelivered
                && line.text == text
        }) {
            line.undelivered = true;
        }
        self.cooldown.clear();
        self.push_system(NOT_CONNECTED_NOTICE);
    }

    fn set_state(&mut self, state: ConnectionState) {
        let previous = std::mem::replace(&mut self.state, state);
        match state {
            ConnectionState::Open if previous != ConnectionState::Open => {
                self.push_system("Connected");
            }
            ConnectionState::Reconnecting | ConnectionState::Disconnected => {
                self.typing_user = None;
                self.typing.reset();
            }
            _ => {}
        }
    }

    /// Dispatch one decoded server event.
    pub fn apply_inbound(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::OnlineList { users } => self.presence.replace_all(users),
            InboundEvent::Chat { from, text } => {
                let is_self = self.is_local_user(&from);
                if !is_self && self.bell_on_message {
                    self.bell_pending = true;
                }
                self.push_line(
                    LineKind::Chat {
                        sender: from,
                        is_self,
                    },
                    text,
                );
            }
            InboundEvent::UserJoined { user } => {
                self.push_system(format!("{user} joined"));
                self.presence.insert(&user);
            }
            InboundEvent::UserLeft { user } => {
                self.push_system(format!("{user} left"));
                self.presence.remove(&user);
                if self.typing_user.as_deref() == Some(user.as_str()) {
                    self.typing_user = None;
                }
            }
            InboundEvent::Typing { user, is_typing } => {
                if self.is_local_user(&user) {
                    return;
                }
                if is_typing {
                    self.typing_user = Some(user);
                } else if self.typing_user.as_deref() == Some(user.as_str()) {
                    self.typing_user = None;
                }
            }
            InboundEvent::Error { error } => {
                let notice = match error.as_str() {
                    "rate_limited" => "Server rate limit hit, message dropped".to_string(),
                    _ => format!("Server error: {error}"),
                };
                self.push_system(notice);
            }
        }
    }

    fn is_local_user(&self, name: &str) -> bool {
        self.username.as_deref() == Some(name)
    }

    // -----------------------------------------------------------------------
    // Log
    // -----------------------------------------------------------------------

    /// Append a system notice.
    pub fn push_system(&mut self, text: impl Into<String>) {
        self.push_line(LineKind::System, text.into());
    }

    fn push_line(&mut self, kind: LineKind, text: String) {
        let timestamp = chrono::Local::now()
            .format(&self.timestamp_format)
            .to_string();
        self.log.push_back(LogLine {
            kind,
            text,
            timestamp,
            undelivered: false,
        });
        while self.log.len() > self.max_log_lines {
            self.log.pop_front();
        }
        // Keep the view anchored when scrolled back.
        if self.scroll > 0 {
            self.scroll = (self.scroll + 1).min(self.log.len().saturating_sub(1));
        }
    }

    /// Text of the typing-indicator slot, if occupied.
    #[must_use]
    pub fn typing_notice(&self) -> Option<String> {
        self.typing_user
            .as_ref()
            .map(|user| format!("{user} is typing..."))
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// `250ms`, `2s`, `1.5s`.
fn format_delay(delay: Duration) -> String {
    let ms = delay.as_millis();
    if ms < 1_000 {
        format!("{ms}ms")
    } else if ms % 1_000 == 0 {
        format!("{}s", ms / 1_000)
    } else {
        format!("{:.1}s", delay.as_secs_f64())
    }
}
