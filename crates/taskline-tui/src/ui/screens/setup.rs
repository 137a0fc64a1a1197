//! First-run account creation

use ratatui::prelude::*;

use super::draw_form_dialog;
use crate::app::App;

/// Draw the setup screen
pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    draw_form_dialog(
        frame,
        area,
        app,
        "Create Account",
        "Choose a 4-8 digit PIN; username defaults to admin",
        &app.state.setup_form,
    );
}
