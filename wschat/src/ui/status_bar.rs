//! Status bar rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme;
use crate::app::{App, Screen};

/// Render the status bar at the bottom of the screen.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let help_text = match app.screen {
        Screen::Login => "Tab: switch field | Enter: log in | Esc: quit",
        Screen::Chat => "Enter: send | PgUp/PgDn: scroll | /reconnect /logout /quit | Esc: quit",
    };

    let mut spans = vec![
        Span::styled(concat!("wschat v", env!("CARGO_PKG_VERSION")), theme::bold()),
        Span::raw(" | "),
        Span::styled("●", theme::normal().fg(theme::state_color(app.state))),
        Span::raw(format!(" {}", app.state)),
    ];
    if let Some(user) = &app.username {
        spans.push(Span::raw(format!(" as {user}")));
    }
    spans.push(Span::raw(" | "));
    spans.push(Span::styled(help_text, theme::dimmed()));

    let paragraph = Paragraph::new(Line::from(spans)).style(theme::status_bar_bg());
    frame.render_widget(paragraph, area);
}
