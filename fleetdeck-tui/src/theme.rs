//! Color palettes and status colors.

use fleetdeck_core::{AgentStatus, GenerationStatus};
use ratatui::style::Color;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub bg: Color,
    pub bg_highlight: Color,
    pub primary: Color,
    pub primary_dim: Color,
    pub secondary: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub text: Color,
    pub text_dim: Color,
    pub border: Color,
    pub border_focus: Color,
}

impl Theme {
    /// Theme by config name, case-insensitive.
    pub fn named(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "fleet" => Some(Self::fleet()),
            "mono" => Some(Self::mono()),
            _ => None,
        }
    }

    pub fn fleet() -> Self {
        Self {
            bg: Color::Rgb(13, 15, 23),
            bg_highlight: Color::Rgb(30, 34, 52),
            primary: Color::Rgb(129, 140, 248),
            primary_dim: Color::Rgb(79, 86, 160),
            secondary: Color::Rgb(56, 189, 248),
            success: Color::Rgb(74, 222, 128),
            warning: Color::Rgb(251, 191, 36),
            error: Color::Rgb(248, 113, 113),
            info: Color::Rgb(56, 189, 248),
            text: Color::Rgb(226, 232, 240),
            text_dim: Color::Rgb(100, 116, 139),
            border: Color::Rgb(51, 65, 85),
            border_focus: Color::Rgb(129, 140, 248),
        }
    }

    /// 16-color palette for terminals without true color.
    pub fn mono() -> Self {
        Self {
            bg: Color::Reset,
            bg_highlight: Color::DarkGray,
            primary: Color::White,
            primary_dim: Color::Gray,
            secondary: Color::Cyan,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,
            text: Color::White,
            text_dim: Color::Gray,
            border: Color::DarkGray,
            border_focus: Color::White,
        }
    }
}

pub fn agent_status_color(status: AgentStatus, theme: &Theme) -> Color {
    match status {
        AgentStatus::Active => theme.success,
        AgentStatus::Inactive => theme.text_dim,
        AgentStatus::Training => theme.info,
        AgentStatus::Deprecated => theme.warning,
    }
}

pub fn generation_status_color(status: GenerationStatus, theme: &Theme) -> Color {
    match status {
        GenerationStatus::Success => theme.success,
        GenerationStatus::Failed => theme.error,
    }
}

pub fn success_rate_color(rate: f64, theme: &Theme) -> Color {
    if rate >= 0.9 {
        theme.success
    } else if rate >= 0.75 {
        theme.warning
    } else {
        theme.error
    }
}
