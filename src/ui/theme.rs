//! Capture window palettes, picked by the `[ui] theme` setting

use crate::config::Theme;
use ratatui::style::Color;

#[derive(Debug, Clone, Copy)]
pub struct ThemeColors {
    pub bg: Color,
    pub fg: Color,
    /// Column headers, borders and key_up rows
    pub dim: Color,
    pub accent: Color,
    pub key_down: Color,
    /// Auto-repeat rows and status messages
    pub repeat: Color,
    /// Dropped-event counter
    pub alert: Color,
    pub bar_bg: Color,
}

impl ThemeColors {
    pub fn from_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self::dark(),
            Theme::Light => Self::light(),
        }
    }

    pub fn dark() -> Self {
        Self {
            bg: Color::Rgb(18, 20, 26),
            fg: Color::Rgb(210, 212, 220),
            dim: Color::Rgb(96, 100, 118),
            accent: Color::Rgb(110, 170, 240),
            key_down: Color::Rgb(120, 210, 140),
            repeat: Color::Rgb(230, 190, 90),
            alert: Color::Rgb(235, 100, 100),
            bar_bg: Color::Rgb(36, 40, 50),
        }
    }

    pub fn light() -> Self {
        Self {
            bg: Color::Rgb(250, 250, 252),
            fg: Color::Rgb(28, 30, 38),
            dim: Color::Rgb(120, 124, 140),
            accent: Color::Rgb(20, 100, 190),
            key_down: Color::Rgb(20, 140, 60),
            repeat: Color::Rgb(170, 110, 0),
            alert: Color::Rgb(190, 40, 50),
            bar_bg: Color::Rgb(224, 226, 234),
        }
    }
}
