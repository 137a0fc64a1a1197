//! Status bar component

use std::time::Duration;

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::App;
use crate::ui::Theme;

/// Session indicators shown on every screen
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// Signed-in username
    pub username: Option<String>,
    /// Whether the PIN lock is engaged
    pub locked: bool,
    /// Auto-lock threshold in minutes; `None` while disabled
    pub auto_lock_minutes: Option<u32>,
    /// Time left before the auto-lock engages
    pub time_until_lock: Option<Duration>,
    /// Progress label of the operation in flight
    pub pending: Option<&'static str>,
}

impl SessionStatus {
    pub fn from_app(app: &App) -> Self {
        Self {
            username: app.session.user.as_ref().map(|u| u.username.clone()),
            locked: app.session.is_locked,
            auto_lock_minutes: app.auto_lock_minutes(),
            time_until_lock: app.time_until_lock(),
            pending: app.state.pending.map(|op| op.progress_label()),
        }
    }

    /// Right-hand auto-lock indicator
    pub fn auto_lock_label(&self) -> String {
        match (self.auto_lock_minutes, self.time_until_lock) {
            (Some(_), Some(left)) => format!("Locks in {}", format_countdown(left)),
            (Some(minutes), None) => format!("Auto-lock {}m", minutes),
            (None, _) => "Auto-lock off".to_string(),
        }
    }
}

/// `m:ss`, rounded up so a countdown never shows 0:00 before it fires
pub fn format_countdown(left: Duration) -> String {
    let secs = left.as_secs() + u64::from(left.subsec_nanos() > 0);
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Render the status bar
pub fn render_status_bar(frame: &mut Frame, area: Rect, status: &SessionStatus, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(theme.border());

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Percentage(30),
            Constraint::Percentage(35),
        ])
        .split(inner);

    // Left: user and lock state
    let left = match &status.username {
        Some(name) => {
            let (indicator, style, label) = if status.locked {
                ("\u{25CF}", theme.warning(), "Locked")
            } else {
                ("\u{25CF}", theme.success(), "Unlocked")
            };
            Line::from(vec![
                Span::styled(format!(" {} {} ", indicator, label), style),
                Span::styled(name.clone(), theme.text()),
            ])
        }
        None => Line::from(Span::styled(" \u{25CB} Signed out", theme.text_muted())),
    };
    frame.render_widget(Paragraph::new(left), chunks[0]);

    // Center: operation in flight
    if let Some(label) = status.pending {
        let center = Paragraph::new(label)
            .style(theme.info())
            .alignment(Alignment::Center);
        frame.render_widget(center, chunks[1]);
    }

    // Right: auto-lock countdown
    if status.username.is_none() {
        return;
    }
    let right_style = match status.time_until_lock {
        Some(left) if left < Duration::from_secs(30) => theme.warning(),
        _ => theme.text_muted(),
    };
    let right = Paragraph::new(format!("{} ", status.auto_lock_label()))
        .style(right_style)
        .alignment(Alignment::Right);
    frame.render_widget(right, chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Duration::from_secs(0), "0:00")]
    #[case(Duration::from_millis(200), "0:01")]
    #[case(Duration::from_secs(59), "0:59")]
    #[case(Duration::from_secs(300), "5:00")]
    #[case(Duration::from_millis(61_500), "1:02")]
    fn test_format_countdown(#[case] left: Duration, #[case] expected: &str) {
        assert_eq!(format_countdown(left), expected);
    }

    #[test]
    fn test_auto_lock_label() {
        let mut status = SessionStatus::default();
        assert_eq!(status.auto_lock_label(), "Auto-lock off");

        status.auto_lock_minutes = Some(5);
        assert_eq!(status.auto_lock_label(), "Auto-lock 5m");

        status.time_until_lock = Some(Duration::from_secs(90));
        assert_eq!(status.auto_lock_label(), "Locks in 1:30");
    }
}
