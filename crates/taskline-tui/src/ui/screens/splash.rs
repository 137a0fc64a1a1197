//! Splash screen shown while the stored session is restored

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::App;

const SPINNER: [char; 4] = ['\u{25D0}', '\u{25D3}', '\u{25D1}', '\u{25D2}'];

/// Draw the splash screen
pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let middle = area.y + area.height / 2;

    let logo = Paragraph::new(format!("{} TASKLINE", '\u{25B8}'))
        .style(theme.title())
        .alignment(Alignment::Center);
    frame.render_widget(logo, Rect::new(area.x, middle.saturating_sub(1), area.width, 1));

    let spinner = SPINNER[(app.tick % SPINNER.len() as u64) as usize];
    let status = Paragraph::new(format!("{} Restoring session...", spinner))
        .style(theme.text_muted())
        .alignment(Alignment::Center);
    frame.render_widget(status, Rect::new(area.x, middle + 1, area.width, 1));

    // Version info
    let version = format!("v{}", env!("CARGO_PKG_VERSION"));
    let version_y = area.y + area.height.saturating_sub(1);
    let version_x = area.x + area.width.saturating_sub(version.len() as u16 + 1);
    let version_widget = Paragraph::new(version).style(theme.text_muted());
    frame.render_widget(version_widget, Rect::new(version_x, version_y, 10, 1));
}
