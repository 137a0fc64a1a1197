//! Sign-in screen

use ratatui::prelude::*;

use super::draw_form_dialog;
use crate::app::App;

/// Draw the login screen
pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    draw_form_dialog(
        frame,
        area,
        app,
        "Sign In",
        "Enter your username and PIN",
        &app.state.login_form,
    );
}
