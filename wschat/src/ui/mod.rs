//! Terminal UI rendering.

pub mod chat_panel;
pub mod login;
pub mod sidebar;
pub mod status_bar;
pub mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
};

use crate::app::{App, Screen};

/// Width of the online-users sidebar.
const SIDEBAR_WIDTH: u16 = 24;

/// Main draw function for the entire UI.
pub fn draw(frame: &mut Frame, app: &App) {
    // Create main layout with status bar at bottom
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let content_area = main_chunks[0];
    let status_area = main_chunks[1];

    match app.screen {
        Screen::Login => login::render(frame, content_area, app),
        Screen::Chat => {
            let content_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Min(20), Constraint::Length(SIDEBAR_WIDTH)])
                .split(content_area);

            chat_panel::render(frame, content_chunks[0], app);
            sidebar::render(frame, content_chunks[1], app);
        }
    }

    status_bar::render(frame, status_area, app);
}
