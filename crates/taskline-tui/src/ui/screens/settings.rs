//! Account settings: PIN, username, and auto-lock

use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, Tabs};

use crate::app::{App, SettingsSection};
use crate::ui::layout::{centered_rect_fixed, render_form, render_message, section_block};
use crate::ui::visible_error;

/// Draw the settings screen
pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let section = app.state.settings_section;
    let form = match section {
        SettingsSection::ChangePin => &app.state.change_pin_form,
        SettingsSection::ChangeUsername => &app.state.change_username_form,
        SettingsSection::AutoLock => &app.state.auto_lock_form,
    };

    let panel = centered_rect_fixed(60, form.fields.len() as u16 + 10, area);
    let block = section_block("Settings", true, theme);
    let inner = block.inner(panel);
    frame.render_widget(block, panel);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2),                        // Tabs
            Constraint::Length(2),                        // Description
            Constraint::Length(form.fields.len() as u16), // Fields
            Constraint::Length(1),                        // Spacer
            Constraint::Length(1),                        // Message
        ])
        .split(inner);

    let selected = SettingsSection::ALL
        .iter()
        .position(|s| *s == section)
        .unwrap_or(0);
    let tabs = Tabs::new(SettingsSection::ALL.iter().map(|s| s.title()))
        .select(selected)
        .style(theme.text_secondary())
        .highlight_style(theme.menu_item(true));
    frame.render_widget(tabs, chunks[0]);

    let description = match section {
        SettingsSection::ChangePin => "Current PIN, then the new 4-8 digit PIN twice".to_string(),
        SettingsSection::ChangeUsername => "Confirm the new username with your PIN".to_string(),
        SettingsSection::AutoLock => match app.auto_lock_minutes() {
            Some(minutes) => format!("Locks after {} minute(s) without input", minutes),
            None => "Auto-lock is off; enter idle minutes to enable it".to_string(),
        },
    };
    frame.render_widget(
        Paragraph::new(description).style(theme.text_muted()),
        chunks[1],
    );

    render_form(frame, chunks[2], form, !app.state.is_pending(), theme);
    render_message(frame, chunks[4], visible_error(app), app.state.notice.as_deref(), theme);
}
