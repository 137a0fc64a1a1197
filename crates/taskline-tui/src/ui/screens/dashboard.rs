//! Signed-in home

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::App;
use crate::ui::components::status_bar::format_countdown;
use crate::ui::layout::{centered_rect_fixed, render_message, section_block};

/// Draw the dashboard
pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let panel = centered_rect_fixed(56, 11, area);
    let block = section_block("Session", false, theme);
    let inner = block.inner(panel);
    frame.render_widget(block, panel);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(4), Constraint::Length(1)])
        .split(inner);

    let username = app
        .session
        .user
        .as_ref()
        .map(|u| u.username.as_str())
        .unwrap_or("-");
    let auto_lock = match app.auto_lock_minutes() {
        Some(minutes) => format!("After {} minute(s) idle", minutes),
        None => "Off".to_string(),
    };
    let countdown = app
        .time_until_lock()
        .map(format_countdown)
        .unwrap_or_else(|| "-".to_string());
    let idle = format_countdown(app.idle_for());

    let row = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(format!("{:>12}  ", label), theme.text_secondary()),
            Span::styled(value, theme.text()),
        ])
    };
    let lines = vec![
        row("Signed in as", username.to_string()),
        row("Auto-lock", auto_lock),
        row("Idle", idle),
        row("Locks in", countdown),
    ];
    frame.render_widget(Paragraph::new(lines), chunks[0]);

    render_message(frame, chunks[1], app.session.error.as_deref(), app.state.notice.as_deref(), theme);
}
