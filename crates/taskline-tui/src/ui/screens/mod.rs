//! Screen modules for different views

pub mod dashboard;
pub mod lock;
pub mod login;
pub mod settings;
pub mod setup;
pub mod splash;

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::state::Form;
use crate::app::{App, Screen};
use crate::ui::layout::{centered_rect_fixed, render_form, render_message};
use crate::ui::visible_error;

/// Footer hints for a screen
pub fn hints(screen: Screen) -> &'static [(&'static str, &'static str)] {
    match screen {
        Screen::Splash => &[("Esc", "Quit")],
        Screen::Login => &[("Tab", "Next"), ("Enter", "Sign in"), ("F2", "Create account"), ("Esc", "Quit")],
        Screen::Setup => &[("Tab", "Next"), ("Enter", "Create"), ("Esc", "Back")],
        Screen::Lock => &[("Enter", "Unlock"), ("Ctrl+C", "Quit")],
        Screen::Dashboard => &[
            ("l", "Lock"),
            ("s", "Settings"),
            ("r", "Refresh"),
            ("o", "Sign out"),
            ("q", "Quit"),
        ],
        Screen::Settings => &[("\u{2190}/\u{2192}", "Section"), ("Tab", "Next"), ("Enter", "Save"), ("Esc", "Back")],
    }
}

/// Centered dialog holding a form, with a subtitle and a message line
pub(crate) fn draw_form_dialog(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    title: &str,
    subtitle: &str,
    form: &Form,
) {
    let theme = &app.theme;
    let height = form.fields.len() as u16 + 8;
    let dialog = centered_rect_fixed(52, height, area);

    let block = Block::default()
        .title(format!(" {} ", title))
        .title_style(theme.title())
        .borders(Borders::ALL)
        .border_style(theme.border_focused());

    let inner = block.inner(dialog);
    frame.render_widget(block, dialog);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2),                        // Subtitle
            Constraint::Length(form.fields.len() as u16), // Fields
            Constraint::Length(1),                        // Spacer
            Constraint::Length(1),                        // Message
        ])
        .split(inner);

    let subtitle = Paragraph::new(subtitle)
        .style(theme.text_secondary())
        .alignment(Alignment::Center);
    frame.render_widget(subtitle, chunks[0]);

    render_form(frame, chunks[1], form, !app.state.is_pending(), theme);
    render_message(frame, chunks[3], visible_error(app), app.state.notice.as_deref(), theme);
}
