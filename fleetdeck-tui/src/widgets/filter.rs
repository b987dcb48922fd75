//! Filter bar widget.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// One chip in the bar, e.g. `status: active`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChip {
    pub label: &'static str,
    pub value: String,
    pub active: bool,
}

impl FilterChip {
    pub fn new(label: &'static str, value: Option<&str>, placeholder: &str) -> Self {
        Self {
            label,
            value: value.unwrap_or(placeholder).to_string(),
            active: value.is_some(),
        }
    }
}

pub struct FilterBar<'a> {
    pub title: &'a str,
    pub chips: &'a [FilterChip],
    pub active_style: Style,
    pub inactive_style: Style,
    pub border_style: Style,
}

impl<'a> FilterBar<'a> {
    pub fn render(&self, f: &mut Frame<'_>, area: Rect) {
        let spans: Vec<Span> = self
            .chips
            .iter()
            .map(|chip| {
                let style = if chip.active {
                    self.active_style
                } else {
                    self.inactive_style
                };
                Span::styled(format!(" {}: {} ", chip.label, chip.value), style)
            })
            .collect();

        let paragraph = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .title(self.title)
                .borders(Borders::ALL)
                .border_style(self.border_style),
        );
        f.render_widget(paragraph, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chip_placeholder_is_inactive() {
        let chip = FilterChip::new("status", None, "any");
        assert_eq!(chip.value, "any");
        assert!(!chip.active);
        assert!(FilterChip::new("status", Some("active"), "any").active);
    }
}
