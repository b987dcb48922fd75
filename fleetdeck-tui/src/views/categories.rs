//! Category management.

use crate::state::{App, CATEGORY_FIELDS};
use crate::views::{centered_rect, freshness, placeholder};
use crate::widgets::{DetailPanel, InputField, VirtualList};
use fleetdeck_api::keys;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &mut App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let key = keys::category_list(None);
    match placeholder(app, &key, "categories") {
        Some(placeholder) => f.render_widget(placeholder, columns[0]),
        None => {
            let categories = app.category_list();
            let theme = &app.theme;
            let title = format!("Categories{}", freshness(app, &key));
            let list = VirtualList::new(categories.len(), 1, |index, _| {
                let category = &categories[index];
                vec![Line::from(vec![
                    Span::styled(
                        format!("{:<16}", category.name),
                        Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(category.slug.clone(), Style::default().fg(theme.text_dim)),
                ])]
            })
            .highlight_style(Style::default().bg(theme.bg_highlight))
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(theme.border)),
            );
            f.render_stateful_widget(list, columns[0], &mut app.categories.scroll);
        }
    }

    render_detail(f, app, columns[1]);
    if app.categories.editor.is_some() {
        render_editor(f, app, area);
    }
}

fn render_detail(f: &mut Frame<'_>, app: &App, area: Rect) {
    let theme = &app.theme;
    let selected = app.selected_category();
    let footer = match (&app.categories.confirm_delete, &selected) {
        (Some(_), Some(category)) => Line::from(Span::styled(
            format!("Delete {}? Enter to confirm, any other key to cancel", category.name),
            Style::default().fg(theme.warning).add_modifier(Modifier::BOLD),
        )),
        _ => Line::from(Span::styled(
            "n new • e edit • d delete",
            Style::default().fg(theme.text_dim),
        )),
    };
    let text = |value: String| Span::styled(value, Style::default().fg(theme.text));
    let fields = match &selected {
        Some(category) => vec![
            ("Id", text(category.id.clone())),
            ("Name", text(category.name.clone())),
            ("Slug", text(category.slug.clone())),
            ("Description", text(category.description.clone())),
            ("Created", text(category.created_at.format("%Y-%m-%d").to_string())),
        ],
        None => Vec::new(),
    };
    DetailPanel {
        title: "Details",
        fields,
        label_style: Style::default().fg(theme.secondary),
        border_style: Style::default().fg(theme.border),
        footer: Some(footer),
    }
    .render(f, area);
}

fn render_editor(f: &mut Frame<'_>, app: &App, area: Rect) {
    let Some(editor) = &app.categories.editor else {
        return;
    };
    let theme = &app.theme;
    let popup = centered_rect(60, InputField::HEIGHT * 2 + 3, area);
    f.render_widget(Clear, popup);
    let title = if editor.id.is_some() {
        "Edit Category"
    } else {
        "New Category"
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_focus));
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let slots = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(InputField::HEIGHT),
            Constraint::Length(InputField::HEIGHT),
            Constraint::Length(1),
        ])
        .split(inner);
    for (index, label) in CATEGORY_FIELDS.iter().enumerate() {
        let field = if index == 0 { "name" } else { "description" };
        InputField {
            label,
            value: editor.field(index),
            focused: editor.focus == index,
            masked: false,
            error: editor.errors.for_field(field),
            style: Style::default().fg(theme.border),
            focus_style: Style::default().fg(theme.border_focus),
            error_style: Style::default().fg(theme.error),
        }
        .render(f, slots[index]);
    }

    let status = match (&editor.failure, editor.saving) {
        (_, true) => Span::styled("Saving…", Style::default().fg(theme.info)),
        (Some(failure), false) => Span::styled(failure.clone(), Style::default().fg(theme.error)),
        (None, false) => Span::styled(
            "Enter save • Esc cancel",
            Style::default().fg(theme.text_dim),
        ),
    };
    f.render_widget(
        Paragraph::new(Line::from(status)).alignment(Alignment::Center),
        slots[2],
    );
}
