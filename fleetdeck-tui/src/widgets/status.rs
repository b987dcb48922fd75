//! Stat card widget.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Headline number with a caption, as shown on the dashboard.
pub struct StatCard<'a> {
    pub title: &'a str,
    pub value: String,
    pub caption: &'a str,
    pub value_style: Style,
    pub caption_style: Style,
    pub border_style: Style,
}

impl<'a> StatCard<'a> {
    pub fn render(&self, f: &mut Frame<'_>, area: Rect) {
        let lines = vec![
            Line::from(Span::styled(
                self.value.clone(),
                self.value_style.add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(self.caption, self.caption_style)),
        ];
        let paragraph = Paragraph::new(lines).alignment(Alignment::Center).block(
            Block::default()
                .title(self.title)
                .borders(Borders::ALL)
                .border_style(self.border_style),
        );
        f.render_widget(paragraph, area);
    }
}
