//! UI rendering

pub mod components;
pub mod layout;
pub mod screens;
pub mod theme;

pub use theme::Theme;

use ratatui::prelude::*;

use crate::app::{router, App, Screen};
use components::status_bar::{render_status_bar, SessionStatus};
use layout::{render_footer, render_header, ScreenLayout};

/// Main render function - delegates to appropriate screen
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    if app.state.current_screen == Screen::Splash {
        screens::splash::draw(frame, area, app);
        return;
    }

    let layout = ScreenLayout::new(area);
    let title = router::screen_title(app.state.current_screen);
    render_header(frame, layout.header, title, app.server_url(), &app.theme);

    match app.state.current_screen {
        Screen::Login => screens::login::draw(frame, layout.content, app),
        Screen::Setup => screens::setup::draw(frame, layout.content, app),
        Screen::Lock => screens::lock::draw(frame, layout.content, app),
        Screen::Dashboard => screens::dashboard::draw(frame, layout.content, app),
        Screen::Settings => screens::settings::draw(frame, layout.content, app),
        Screen::Splash => {}
    }

    render_status_bar(frame, layout.status, &SessionStatus::from_app(app), &app.theme);
    render_footer(frame, layout.footer, screens::hints(app.state.current_screen), &app.theme);
}

/// Error to show on a form screen: local validation first, then the session error
pub fn visible_error(app: &App) -> Option<&str> {
    app.state
        .form_error
        .as_deref()
        .or(app.session.error.as_deref())
}
