//! Sidebar rendering for the online-users list.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};

use super::theme;
use crate::app::App;

/// Render the sidebar with everyone currently online.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = app
        .presence
        .iter()
        .map(|user| {
            let is_self = app.username.as_deref() == Some(user);
            let name_style = if is_self {
                theme::bold()
            } else {
                theme::normal().fg(theme::sender_color(user))
            };
            let mut spans = vec![
                Span::styled("● ", theme::normal().fg(theme::SUCCESS)),
                Span::styled(user.to_string(), name_style),
            ];
            if is_self {
                spans.push(Span::styled(" (you)", theme::dimmed()));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let block = Block::default()
        .title(format!("Online ({})", app.presence.len()))
        .borders(Borders::ALL)
        .border_style(theme::normal());

    frame.render_widget(List::new(items).block(block), area);
}
