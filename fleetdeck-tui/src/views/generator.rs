//! Bulk generation form.

use std::time::Instant;

use crate::state::{App, GENERATOR_FIELDS};
use crate::widgets::{DetailPanel, InputField, ProgressBar};
use fleetdeck_api::keys;
use fleetdeck_cache::MutationStatus;
use fleetdeck_core::TemplateListResponse;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const FIELD_KEYS: &[&str] = &["quantity", "category", "template", "use_seed", "seed"];

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    render_form(f, app, columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(columns[1]);
    render_status(f, app, right[0], right[1]);
}

fn render_form(f: &mut Frame<'_>, app: &App, area: Rect) {
    let theme = &app.theme;
    let generator = &app.generator;
    let block = Block::default()
        .title(if generator.editing {
            "Generate Agents (editing)"
        } else {
            "Generate Agents (e edit • Enter run)"
        })
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if generator.editing {
            theme.border_focus
        } else {
            theme.border
        }));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut constraints = vec![Constraint::Length(InputField::HEIGHT); GENERATOR_FIELDS.len()];
    constraints.push(Constraint::Min(0));
    let slots = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);
    for (index, label) in GENERATOR_FIELDS.iter().enumerate() {
        let value = generator.field(index);
        InputField {
            label,
            value: &value,
            focused: generator.focus == index,
            masked: false,
            error: generator.errors.for_field(FIELD_KEYS[index]),
            style: Style::default().fg(if index == 4 && !generator.form.use_seed {
                theme.text_dim
            } else {
                theme.border
            }),
            focus_style: Style::default().fg(theme.border_focus),
            error_style: Style::default().fg(theme.error),
        }
        .render(f, slots[index]);
    }

    let categories: Vec<String> = app.category_list().into_iter().map(|c| c.slug).collect();
    let templates: Vec<String> = app
        .store
        .cached::<TemplateListResponse>(&keys::template_list())
        .map(|t| t.data.into_iter().map(|t| fleetdeck_core::slugify(&t.name)).collect())
        .unwrap_or_default();
    let hints = vec![
        Line::from(Span::styled(
            format!("categories: {}", categories.join(", ")),
            Style::default().fg(theme.text_dim),
        )),
        Line::from(Span::styled(
            format!("templates: {}", templates.join(", ")),
            Style::default().fg(theme.text_dim),
        )),
    ];
    f.render_widget(Paragraph::new(hints), slots[GENERATOR_FIELDS.len()]);
}

fn render_status(f: &mut Frame<'_>, app: &App, bar: Rect, detail: Rect) {
    let theme = &app.theme;
    let generator = &app.generator;

    match (&generator.status, generator.started_at) {
        (MutationStatus::Pending, Some(started)) => ProgressBar {
            title: "Generating…",
            elapsed: Instant::now().saturating_duration_since(started),
            expected: app.expected_generation_time(),
            style: Style::default().fg(theme.primary),
        }
        .render(f, bar),
        _ => f.render_widget(
            Paragraph::new("Idle").block(Block::default().title("Status").borders(Borders::ALL)),
            bar,
        ),
    }

    let text = |value: String| Span::styled(value, Style::default().fg(theme.text));
    let (title, fields, footer) = match &generator.status {
        MutationStatus::Succeeded(run) => (
            "Last Run",
            vec![
                ("Run", text(run.id.clone())),
                ("Status", text(run.status.to_string())),
                ("Generated", text(run.generated_count.to_string())),
                ("Category", text(run.params.category.clone())),
                ("Template", text(run.params.template.clone())),
                (
                    "Seed",
                    text(run.params.seed.map_or_else(|| "random".to_string(), |s| s.to_string())),
                ),
            ],
            Some(Line::from(Span::styled(
                "New agents are in the Agents view",
                Style::default().fg(theme.success),
            ))),
        ),
        MutationStatus::Failed(error) => (
            "Last Run",
            vec![("Error", Span::styled(error.message.clone(), Style::default().fg(theme.error)))],
            Some(Line::from(Span::styled(
                "Press R to retry with the same parameters",
                Style::default().fg(theme.text_dim),
            ))),
        ),
        MutationStatus::Pending | MutationStatus::Idle => ("Last Run", Vec::new(), None),
    };
    DetailPanel {
        title,
        fields,
        label_style: Style::default().fg(theme.secondary),
        border_style: Style::default().fg(theme.border),
        footer,
    }
    .render(f, detail);
}
