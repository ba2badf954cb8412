//! Chat panel rendering (message log, typing indicator, input box).

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use super::theme;
use crate::app::{App, LineKind, LogLine};
use crate::session::ConnectionState;

/// Render the chat panel (messages + typing line + input box).
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(area);

    render_messages(frame, chunks[0], app);
    render_typing(frame, chunks[1], app);
    render_input(frame, chunks[2], app);
}

/// First log index to show so that the newest lines (minus `scroll`) fit.
fn first_visible(total: usize, height: usize, scroll: usize) -> usize {
    total.saturating_sub(height.saturating_add(scroll))
}

fn log_line(line: &LogLine) -> Line<'_> {
    match &line.kind {
        LineKind::Chat { sender, is_self } => {
            let sender_style = if *is_self {
                theme::bold().fg(theme::SELF_COLOR)
            } else {
                theme::bold().fg(theme::sender_color(sender))
            };
            let mut spans = vec![
                Span::styled(&line.timestamp, theme::timestamp()),
                Span::raw(" "),
                Span::styled(sender.as_str(), sender_style),
                Span::raw(": "),
                Span::styled(line.text.as_str(), theme::chat_text(*is_self)),
            ];
            if line.undelivered {
                spans.push(Span::styled(" (not sent)", theme::system_message()));
            }
            Line::from(spans)
        }
        LineKind::System => Line::from(Span::styled(
            format!("[{}] {}", line.timestamp, line.text),
            theme::system_message(),
        )),
    }
}

/// Render the message list, anchored to the newest line.
fn render_messages(frame: &mut Frame, area: Rect, app: &App) {
    let height = usize::from(area.height.saturating_sub(2));
    let start = first_visible(app.log.len(), height, app.scroll);

    let items: Vec<ListItem> = app
        .log
        .iter()
        .skip(start)
        .take(height)
        .map(|line| ListItem::new(log_line(line)))
        .collect();

    let title = if app.scroll > 0 {
        format!("Chat (scrolled {} up)", app.scroll)
    } else {
        "Chat".to_string()
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(theme::normal());

    frame.render_widget(List::new(items).block(block), area);
}

/// Render the single-slot typing indicator.
fn render_typing(frame: &mut Frame, area: Rect, app: &App) {
    let line = app
        .typing_notice()
        .map_or_else(Line::default, |notice| {
            Line::from(Span::styled(format!(" {notice}"), theme::typing_indicator()))
        });
    frame.render_widget(Paragraph::new(line), area);
}

/// Render the input box.
fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let mut display_text = app.input.clone();
    let byte_index = display_text
        .char_indices()
        .nth(app.cursor_position)
        .map_or(display_text.len(), |(i, _)| i);
    display_text.insert(byte_index, '█');

    let input_line = if app.input.is_empty() {
        let hint = if app.state == ConnectionState::Open {
            "Type a message..."
        } else {
            "Not connected"
        };
        Line::from(vec![
            Span::styled("█", theme::normal()),
            Span::styled(hint, theme::dimmed()),
        ])
    } else {
        Line::from(Span::styled(display_text, theme::normal()))
    };

    let block = Block::default()
        .title("Input")
        .borders(Borders::ALL)
        .border_style(theme::highlighted());

    frame.render_widget(Paragraph::new(input_line).block(block), area);
}
