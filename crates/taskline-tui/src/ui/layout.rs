//! Layout helpers for consistent screen structure

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use super::Theme;
use crate::app::state::Form;

/// Standard screen layout with header, content, and footer
pub struct ScreenLayout {
    /// Header area
    pub header: Rect,
    /// Main content area
    pub content: Rect,
    /// Status bar area
    pub status: Rect,
    /// Footer/help area
    pub footer: Rect,
}

impl ScreenLayout {
    /// Create a standard layout from the total area
    pub fn new(area: Rect) -> Self {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Header
                Constraint::Min(8),    // Content
                Constraint::Length(2), // Status
                Constraint::Length(1), // Footer
            ])
            .split(area);

        Self {
            header: chunks[0],
            content: chunks[1],
            status: chunks[2],
            footer: chunks[3],
        }
    }
}

/// Create a fixed-size centered box
pub fn centered_rect_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

/// Render a standard header bar
pub fn render_header(frame: &mut Frame, area: Rect, title: &str, server: &str, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(theme.border())
        .style(Style::default().bg(theme.background));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(14),
            Constraint::Min(20),
            Constraint::Length(8),
        ])
        .split(inner);

    let logo = Paragraph::new(format!(" {} TASKLINE", '\u{25B8}')).style(theme.title());
    frame.render_widget(logo, chunks[0]);

    let crumb = Paragraph::new(format!("{}  \u{00B7}  {}", title, server))
        .style(theme.text_secondary())
        .alignment(Alignment::Center);
    frame.render_widget(crumb, chunks[1]);

    let time = chrono::Local::now().format("%H:%M").to_string();
    let time_widget = Paragraph::new(time)
        .style(theme.text_muted())
        .alignment(Alignment::Right);
    frame.render_widget(time_widget, chunks[2]);
}

/// Render a footer with help hints
pub fn render_footer(frame: &mut Frame, area: Rect, hints: &[(&str, &str)], theme: &Theme) {
    let footer = Paragraph::new(hint_text(hints))
        .style(theme.text_muted())
        .alignment(Alignment::Center);
    frame.render_widget(footer, area);
}

/// `[key] action` pairs joined for display
pub fn hint_text(hints: &[(&str, &str)]) -> String {
    hints
        .iter()
        .map(|(key, action)| format!("[{}] {}", key, action))
        .collect::<Vec<_>>()
        .join("  ")
}

/// Create a section block with title
pub fn section_block<'a>(title: &'a str, focused: bool, theme: &Theme) -> Block<'a> {
    Block::default()
        .title(format!(" {} ", title))
        .title_style(theme.text_highlight())
        .borders(Borders::ALL)
        .border_style(if focused {
            theme.border_focused()
        } else {
            theme.border()
        })
}

/// Render a form as `label: value` rows, one per line, with a cursor on the focused field
pub fn render_form(frame: &mut Frame, area: Rect, form: &Form, editable: bool, theme: &Theme) {
    let label_width = form
        .fields
        .iter()
        .map(|f| f.label.chars().count())
        .max()
        .unwrap_or(0);

    let lines: Vec<Line> = form
        .fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let focused = editable && i == form.focus;
            let cursor = if focused { "\u{2581}" } else { "" };
            Line::from(vec![
                Span::styled(
                    format!("{:>width$}  ", field.label, width = label_width),
                    if focused { theme.text_highlight() } else { theme.text_secondary() },
                ),
                Span::styled(format!(" {}{} ", field.display(), cursor), theme.input(focused)),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), area);
}

/// Render a one-line message: the error if any, else the notice
pub fn render_message(
    frame: &mut Frame,
    area: Rect,
    error: Option<&str>,
    notice: Option<&str>,
    theme: &Theme,
) {
    let (text, style) = match (error, notice) {
        (Some(error), _) => (error, theme.danger()),
        (None, Some(notice)) => (notice, theme.success()),
        (None, None) => return,
    };
    frame.render_widget(
        Paragraph::new(text).style(style).alignment(Alignment::Center),
        area,
    );
}
