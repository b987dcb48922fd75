//! Sign-in screen.

use crate::state::App;
use crate::views::centered_rect;
use crate::widgets::InputField;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let theme = &app.theme;
    let form = &app.login;
    let card = centered_rect(50, 16, area);

    let block = Block::default()
        .title(Span::styled(
            " FLEETDECK ",
            Style::default().fg(theme.primary).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_focus));
    let inner = block.inner(card);
    f.render_widget(block, card);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(InputField::HEIGHT),
            Constraint::Length(InputField::HEIGHT),
            Constraint::Min(1),
        ])
        .split(inner);

    let fields = [("Email", &form.email, "email", false), ("Password", &form.password, "password", true)];
    for (index, (label, value, field, masked)) in fields.into_iter().enumerate() {
        InputField {
            label,
            value,
            focused: form.focus == index,
            masked,
            error: form.errors.for_field(field),
            style: Style::default().fg(theme.border),
            focus_style: Style::default().fg(theme.border_focus),
            error_style: Style::default().fg(theme.error),
        }
        .render(f, rows[index]);
    }

    let status = if form.pending {
        Line::from(Span::styled("Signing in…", Style::default().fg(theme.info)))
    } else if let Some(failure) = &form.failure {
        Line::from(Span::styled(failure.as_str(), Style::default().fg(theme.error)))
    } else {
        Line::from(Span::styled(
            "Enter sign in • Tab switch field • Ctrl-c quit",
            Style::default().fg(theme.text_dim),
        ))
    };
    f.render_widget(Paragraph::new(status).alignment(Alignment::Center), rows[2]);
}
