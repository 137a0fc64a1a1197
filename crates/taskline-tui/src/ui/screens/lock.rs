//! Lock screen: PIN re-entry for the signed-in user

use ratatui::prelude::*;

use super::draw_form_dialog;
use crate::app::App;

/// Draw the lock screen
pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let subtitle = match &app.session.user {
        Some(user) => format!("Locked. Enter the PIN for {}", user.username),
        None => "Locked".to_string(),
    };
    draw_form_dialog(frame, area, app, "Locked", &subtitle, &app.state.unlock_form);
}
