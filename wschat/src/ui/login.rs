//! Login form rendering.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Flex, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use super::theme;
use crate::app::{App, LoginField};

const FORM_WIDTH: u16 = 44;
const FORM_HEIGHT: u16 = 9;

/// Render the username/password form centered in `area`.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let [row] = Layout::vertical([Constraint::Length(FORM_HEIGHT)])
        .flex(Flex::Center)
        .areas(area);
    let [form_area] = Layout::horizontal([Constraint::Length(FORM_WIDTH)])
        .flex(Flex::Center)
        .areas(row);

    let block = Block::default()
        .title("Log in")
        .borders(Borders::ALL)
        .border_style(theme::highlighted());
    let inner = block.inner(form_area);
    frame.render_widget(block, form_area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(inner);

    let form = &app.login;
    let masked = "*".repeat(form.password.chars().count());
    frame.render_widget(
        field_line("Username", &form.username, form.field == LoginField::Username),
        rows[0],
    );
    frame.render_widget(
        field_line("Password", &masked, form.field == LoginField::Password),
        rows[2],
    );

    let footer = if form.busy {
        Line::from(Span::styled("Logging in...", theme::dimmed()))
    } else if let Some(error) = &form.error {
        Line::from(Span::styled(error.as_str(), theme::normal().fg(theme::ERROR)))
    } else {
        Line::default()
    };
    frame.render_widget(Paragraph::new(footer), rows[4]);
}

fn field_line<'a>(label: &'a str, value: &'a str, focused: bool) -> Paragraph<'a> {
    let label_style = if focused {
        theme::highlighted()
    } else {
        theme::dimmed()
    };
    let mut spans = vec![
        Span::styled(format!("{label:<10}"), label_style),
        Span::styled(value, theme::normal()),
    ];
    if focused {
        spans.push(Span::styled("█", theme::normal()));
    }
    Paragraph::new(Line::from(spans))
}
