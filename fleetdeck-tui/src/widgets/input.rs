//! Labelled text field for forms.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub struct InputField<'a> {
    pub label: &'a str,
    pub value: &'a str,
    pub focused: bool,
    /// Rendered as `*` per character.
    pub masked: bool,
    pub error: Option<&'a str>,
    pub style: Style,
    pub focus_style: Style,
    pub error_style: Style,
}

impl<'a> InputField<'a> {
    /// Rows the field needs: bordered input plus one for an error.
    pub const HEIGHT: u16 = 4;

    pub fn render(&self, f: &mut Frame<'_>, area: Rect) {
        let shown = if self.masked {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.to_string()
        };
        let cursor = if self.focused { "_" } else { "" };
        let border = if self.error.is_some() {
            self.error_style
        } else if self.focused {
            self.focus_style
        } else {
            self.style
        };

        let mut lines = vec![Line::from(vec![Span::raw(shown), Span::styled(cursor, self.focus_style)])];
        if let Some(error) = self.error {
            lines.push(Line::from(Span::styled(error, self.error_style)));
        }
        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .title(self.label)
                .borders(Borders::ALL)
                .border_style(border),
        );
        f.render_widget(paragraph, area);
    }
}
