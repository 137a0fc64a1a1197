//! Event handling for the TUI

use crossterm::event::{Event as CrosstermEvent, KeyEventKind, MouseEventKind};
use taskline_session::ActivitySignal;

use super::state::Operation;

/// Events delivered to the application loop from background tasks
#[derive(Debug, Clone)]
pub enum Event {
    /// A dispatched remote operation finished
    OperationComplete {
        operation: Operation,
        result: Result<String, String>,
    },
}

/// Activity kind for a terminal event, if it counts as user activity
pub fn activity_signal(event: &CrosstermEvent) -> Option<ActivitySignal> {
    match event {
        CrosstermEvent::Key(key) if key.kind != KeyEventKind::Release => {
            Some(ActivitySignal::KeyDown)
        }
        CrosstermEvent::Paste(_) => Some(ActivitySignal::KeyDown),
        CrosstermEvent::Mouse(mouse) => match mouse.kind {
            MouseEventKind::Down(_) => Some(ActivitySignal::PointerDown),
            MouseEventKind::Up(_) => Some(ActivitySignal::Click),
            MouseEventKind::Moved | MouseEventKind::Drag(_) => Some(ActivitySignal::PointerMove),
            MouseEventKind::ScrollUp
            | MouseEventKind::ScrollDown
            | MouseEventKind::ScrollLeft
            | MouseEventKind::ScrollRight => Some(ActivitySignal::Scroll),
        },
        _ => None,
    }
}
