//! Terminal user interface for owned-window capture

pub mod theme;
mod widgets;

pub use theme::ThemeColors;
pub use widgets::{SessionPanel, StatusBar};

use crate::session::CaptureSession;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::Block,
    Frame,
};
use std::time::Duration;

/// Everything the capture window draws, borrowed from the live session
pub struct CaptureView<'a> {
    pub session: &'a CaptureSession,
    pub source: &'a str,
    pub stop_key: &'a str,
    pub elapsed: Duration,
    pub message: Option<&'a str>,
    pub colors: ThemeColors,
}

pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Draw one frame of the capture window
pub fn draw(frame: &mut Frame, view: &CaptureView) {
    let colors = view.colors;
    let size = frame.area();
    frame.render_widget(Block::default().style(Style::default().bg(colors.bg)), size);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Session panel
            Constraint::Length(1), // Status bar
        ])
        .split(size);

    let buffer = view.session.buffer();
    let panel = SessionPanel::new(view.stop_key, colors).events(buffer.len(), buffer.last());
    frame.render_widget(panel, chunks[0]);

    let elapsed = format_elapsed(view.elapsed);
    let status = StatusBar::new(view.session.state().as_str(), view.source, &elapsed, colors)
        .counts(buffer.len(), buffer.dropped())
        .message(view.message);
    frame.render_widget(status, chunks[1]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_minutes_and_seconds() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00");
        assert_eq!(format_elapsed(Duration::from_secs(75)), "01:15");
        assert_eq!(format_elapsed(Duration::from_millis(3_599_999)), "59:59");
    }
}
