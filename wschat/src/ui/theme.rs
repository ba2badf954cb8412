//! Theme and styling constants for the TUI.

use ratatui::style::{Color, Modifier, Style};

use crate::session::ConnectionState;

/// Primary foreground color.
pub const FG_PRIMARY: Color = Color::White;

/// Secondary foreground color (dimmed text).
pub const FG_SECONDARY: Color = Color::Gray;

/// Highlight color for focused elements.
pub const HIGHLIGHT: Color = Color::Cyan;

/// Open connection color.
pub const SUCCESS: Color = Color::Green;

/// Connecting/reconnecting color.
pub const WARNING: Color = Color::Yellow;

/// Error color (login failures).
pub const ERROR: Color = Color::Red;

/// Disconnected color.
pub const OFFLINE: Color = Color::DarkGray;

/// Color for sender names in chat.
pub const SENDER_COLORS: [Color; 10] = [
    Color::Cyan,
    Color::Green,
    Color::Yellow,
    Color::Magenta,
    Color::Blue,
    Color::LightCyan,
    Color::LightGreen,
    Color::LightYellow,
    Color::LightBlue,
    Color::Rgb(255, 165, 0),
];

/// Color for the local user's own messages.
pub const SELF_COLOR: Color = Color::LightMagenta;

/// Normal text style.
#[must_use]
pub fn normal() -> Style {
    Style::default().fg(FG_PRIMARY)
}

/// Dimmed text style (help text, placeholders).
#[must_use]
pub fn dimmed() -> Style {
    Style::default().fg(FG_SECONDARY)
}

/// Bold text style.
#[must_use]
pub fn bold() -> Style {
    Style::default().fg(FG_PRIMARY).add_modifier(Modifier::BOLD)
}

/// Highlighted text style (focused borders and fields).
#[must_use]
pub fn highlighted() -> Style {
    Style::default().fg(HIGHLIGHT).add_modifier(Modifier::BOLD)
}

/// Get a color for a sender based on their name.
#[must_use]
pub fn sender_color(name: &str) -> Color {
    let hash = name.bytes().fold(0u32, |acc, b| {
        acc.wrapping_mul(31).wrapping_add(u32::from(b))
    });
    SENDER_COLORS[(hash as usize) % SENDER_COLORS.len()]
}

/// Style for a chat line body; own messages stand out.
#[must_use]
pub fn chat_text(is_self: bool) -> Style {
    if is_self {
        Style::default().fg(SELF_COLOR)
    } else {
        normal()
    }
}

/// Style for system messages (italic, dim blue).
#[must_use]
pub fn system_message() -> Style {
    Style::default()
        .fg(Color::Rgb(100, 140, 180))
        .add_modifier(Modifier::ITALIC)
}

/// Style for timestamps (dark gray).
#[must_use]
pub fn timestamp() -> Style {
    Style::default().fg(Color::Rgb(120, 120, 120))
}

/// Style for the typing indicator line.
#[must_use]
pub fn typing_indicator() -> Style {
    dimmed().add_modifier(Modifier::ITALIC)
}

/// Style for the status bar background (dark background with white foreground).
#[must_use]
pub fn status_bar_bg() -> Style {
    Style::default().fg(Color::White).bg(Color::Rgb(30, 30, 50))
}

/// Indicator color for a connection state.
#[must_use]
pub const fn state_color(state: ConnectionState) -> Color {
    match state {
        ConnectionState::Open => SUCCESS,
        ConnectionState::Connecting | ConnectionState::Reconnecting => WARNING,
        ConnectionState::Disconnected => OFFLINE,
    }
}
