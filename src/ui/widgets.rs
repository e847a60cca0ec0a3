//! Widgets for the capture window

use super::theme::ThemeColors;
use crate::keyboard::{KeyEventKind, KeyEventRecord};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Instructions, event count and the most recent key.
///
/// Only the last record is shown, without its timing; the CSV is the
/// place to look at timestamps.
pub struct SessionPanel<'a> {
    stop_key: &'a str,
    events: usize,
    last: Option<&'a KeyEventRecord>,
    colors: ThemeColors,
}

impl<'a> SessionPanel<'a> {
    pub fn new(stop_key: &'a str, colors: ThemeColors) -> Self {
        Self {
            stop_key,
            events: 0,
            last: None,
            colors,
        }
    }

    pub fn events(mut self, events: usize, last: Option<&'a KeyEventRecord>) -> Self {
        self.events = events;
        self.last = last;
        self
    }

    fn last_line(&self) -> Line<'static> {
        let Some(record) = self.last else {
            return Line::from(Span::styled("Last: -", Style::default().fg(self.colors.dim)));
        };
        let kind_color = match (record.kind, record.is_repeat) {
            (_, true) => self.colors.repeat,
            (KeyEventKind::KeyDown, false) => self.colors.key_down,
            (KeyEventKind::KeyUp, false) => self.colors.dim,
        };
        let mut spans = vec![
            Span::styled(format!("Last: [{}] ", record.seq), Style::default().fg(self.colors.fg)),
            Span::styled(format!("{} ", record.kind), Style::default().fg(kind_color)),
            Span::styled(
                record.character.to_string(),
                Style::default().fg(self.colors.fg).add_modifier(Modifier::BOLD),
            ),
        ];
        if !record.modifiers.is_empty() {
            spans.push(Span::styled(
                format!(" ({})", record.modifiers),
                Style::default().fg(self.colors.accent),
            ));
        }
        Line::from(spans)
    }
}

impl<'a> Widget for SessionPanel<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" Keyboard Timing ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.colors.dim));
        let inner = block.inner(area);
        block.render(area, buf);

        let text = Style::default().fg(self.colors.fg);
        let lines = [
            Line::from(Span::styled("Press keys to record timing.", text)),
            Line::from(Span::styled(
                format!("Press {} or Ctrl+C to stop and save.", self.stop_key),
                Style::default().fg(self.colors.accent),
            )),
            Line::default(),
            Line::from(Span::styled(format!("Events: {}", self.events), text)),
            self.last_line(),
        ];
        for (i, line) in lines.iter().enumerate().take(inner.height as usize) {
            buf.set_line(inner.x + 1, inner.y + i as u16, line, inner.width.saturating_sub(1));
        }
    }
}

/// Status bar widget
pub struct StatusBar<'a> {
    state: &'a str,
    source: &'a str,
    elapsed: &'a str,
    events: usize,
    dropped: u64,
    message: Option<&'a str>,
    colors: ThemeColors,
}

impl<'a> StatusBar<'a> {
    pub fn new(state: &'a str, source: &'a str, elapsed: &'a str, colors: ThemeColors) -> Self {
        Self {
            state,
            source,
            elapsed,
            events: 0,
            dropped: 0,
            message: None,
            colors,
        }
    }

    pub fn counts(mut self, events: usize, dropped: u64) -> Self {
        self.events = events;
        self.dropped = dropped;
        self
    }

    pub fn message(mut self, message: Option<&'a str>) -> Self {
        self.message = message;
        self
    }
}

impl<'a> Widget for StatusBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bg_style = Style::default().bg(self.colors.bar_bg).fg(self.colors.fg);
        for x in area.x..area.x + area.width {
            buf.set_string(x, area.y, " ", bg_style);
        }

        let left = format!(" {} | {} ", self.state, self.source);
        buf.set_string(area.x, area.y, &left, bg_style.add_modifier(Modifier::BOLD));

        if let Some(msg) = self.message {
            let msg_style = bg_style.fg(self.colors.repeat);
            let msg_x = area.x + (area.width / 2).saturating_sub(msg.len() as u16 / 2);
            buf.set_string(msg_x, area.y, msg, msg_style);
        }

        let right = format!(" {} | Events: {} ", self.elapsed, self.events);
        let dropped = if self.dropped > 0 {
            format!("| Dropped: {} ", self.dropped)
        } else {
            String::new()
        };
        let width = (right.len() + dropped.len()) as u16;
        let right_x = area.x + area.width.saturating_sub(width);
        buf.set_string(right_x, area.y, &right, bg_style);
        buf.set_string(
            right_x + right.len() as u16,
            area.y,
            &dropped,
            bg_style.fg(self.colors.alert).add_modifier(Modifier::BOLD),
        );
    }
}
