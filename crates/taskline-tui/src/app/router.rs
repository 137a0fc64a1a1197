//! Navigation guard: which screens each session phase may show

use taskline_session::{SessionPhase, SessionState};

use super::state::Screen;

/// Screen to show for `session`, keeping `current` when it is allowed
pub fn route(session: &SessionState, current: Screen) -> Screen {
    match session.phase() {
        SessionPhase::Booting => Screen::Splash,
        SessionPhase::Unauthenticated => match current {
            Screen::Login | Screen::Setup => current,
            _ => Screen::Login,
        },
        SessionPhase::Locked => Screen::Lock,
        SessionPhase::Unlocked => match current {
            Screen::Dashboard | Screen::Settings => current,
            _ => Screen::Dashboard,
        },
    }
}

/// Get title for a screen
pub fn screen_title(screen: Screen) -> &'static str {
    match screen {
        Screen::Splash => "Taskline",
        Screen::Login => "Sign In",
        Screen::Setup => "Create Account",
        Screen::Lock => "Locked",
        Screen::Dashboard => "Dashboard",
        Screen::Settings => "Settings",
    }
}
