//! Agent list with filters, detail panel and edit form.

use crate::state::{App, AGENT_EDIT_FIELDS};
use crate::theme::{agent_status_color, success_rate_color};
use crate::views::{centered_rect, freshness, placeholder};
use crate::widgets::{DetailPanel, FilterBar, FilterChip, InputField, VirtualList};
use fleetdeck_api::keys;
use fleetdeck_cache::MutationStatus;
use fleetdeck_core::{Agent, AgentListResponse};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear},
    Frame,
};

const EDIT_FIELD_KEYS: &[&str] = &["name", "description", "status", "category", "tags"];

pub fn render(f: &mut Frame<'_>, app: &mut App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);
    render_filters(f, app, rows[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[1]);
    render_list(f, app, columns[0]);
    render_detail(f, app, columns[1]);

    if app.agents.editor.is_some() {
        render_editor(f, app, area);
    }
}

fn render_filters(f: &mut Frame<'_>, app: &App, area: Rect) {
    let controller = &app.agents.controller;
    let query = controller.current();
    let mut search = controller.search_text().to_string();
    if app.agents.searching {
        search.push('_');
    }
    if controller.is_pending() {
        search.push('…');
    }
    let sort = query
        .sort
        .as_ref()
        .map(|s| format!("{} {}", s.field, s.direction.as_str()));
    let pages = app
        .agent_page()
        .map_or_else(|| "?".to_string(), |p| p.total_pages.max(1).to_string());
    let chips = [
        FilterChip::new("search", Some(search.as_str()).filter(|s| !s.is_empty()), "/"),
        FilterChip::new("status", query.filter("status"), "any"),
        FilterChip::new("category", query.filter("category"), "any"),
        FilterChip::new("sort", sort.as_deref(), "newest"),
        FilterChip {
            label: "page",
            value: format!("{}/{}", query.page, pages),
            active: query.page > 1,
        },
    ];
    FilterBar {
        title: "Filters",
        chips: &chips,
        active_style: Style::default()
            .fg(app.theme.primary)
            .add_modifier(Modifier::BOLD),
        inactive_style: Style::default().fg(app.theme.text_dim),
        border_style: Style::default().fg(if app.agents.searching {
            app.theme.border_focus
        } else {
            app.theme.border
        }),
    }
    .render(f, area);
}

fn render_list(f: &mut Frame<'_>, app: &mut App, area: Rect) {
    let key = keys::agent_list(app.agents.controller.current());
    if let Some(placeholder) = placeholder(app, &key, "agents") {
        f.render_widget(placeholder, area);
        return;
    }
    let page = app
        .store
        .cached::<AgentListResponse>(&key)
        .unwrap_or_else(|| AgentListResponse {
            data: Vec::new(),
            total: 0,
            page: 1,
            limit: 0,
            total_pages: 0,
        });

    let title = format!("Agents: {} matching{}", page.total, freshness(app, &key));
    let theme = &app.theme;
    let store = &app.store;
    let data = &page.data;
    // Only windowed rows are built, so only they pay for the detail lookup
    // that shows optimistic edits in the list.
    let list = VirtualList::new(data.len(), app.config.list.row_height, |index, selected| {
        let agent = store
            .cached::<Agent>(&keys::agent_detail(&data[index].id))
            .unwrap_or_else(|| data[index].clone());
        let marker = if selected { "▶ " } else { "  " };
        let mut lines = vec![Line::from(vec![
            Span::raw(marker),
            Span::styled(
                format!("{:<14}", agent.name),
                Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{:<12}", agent.status),
                Style::default().fg(agent_status_color(agent.status, theme)),
            ),
            Span::styled(
                format!("{:<14}", agent.category),
                Style::default().fg(theme.secondary),
            ),
            Span::styled(
                format!("{:>5.0}%", agent.metrics.success_rate * 100.0),
                Style::default().fg(success_rate_color(agent.metrics.success_rate, theme)),
            ),
        ])];
        lines.push(Line::from(Span::styled(
            format!("  {}", agent.description),
            Style::default().fg(theme.text_dim),
        )));
        lines
    })
    .overscan(app.config.list.overscan)
    .highlight_style(Style::default().bg(theme.bg_highlight))
    .block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.border)),
    );
    f.render_stateful_widget(list, area, &mut app.agents.scroll);
}

fn render_detail(f: &mut Frame<'_>, app: &App, area: Rect) {
    let theme = &app.theme;
    let Some(agent) = app.selected_agent() else {
        DetailPanel {
            title: "Details",
            fields: Vec::new(),
            label_style: Style::default().fg(theme.secondary),
            border_style: Style::default().fg(theme.border),
            footer: Some(Line::from(Span::styled(
                "Select an agent with j/k",
                Style::default().fg(theme.text_dim),
            ))),
        }
        .render(f, area);
        return;
    };

    let detail_key = keys::agent_detail(&agent.id);
    let footer = match &app.agents.update {
        MutationStatus::Pending => Line::from(Span::styled(
            "Saving…",
            Style::default().fg(theme.info),
        )),
        MutationStatus::Failed(error) => Line::from(Span::styled(
            format!("Not saved: {} (rolled back)", error.message),
            Style::default().fg(theme.error),
        )),
        MutationStatus::Succeeded(_) => Line::from(Span::styled(
            "Saved",
            Style::default().fg(theme.success),
        )),
        MutationStatus::Idle => Line::from(Span::styled(
            "t cycle status • e edit",
            Style::default().fg(theme.text_dim),
        )),
    };

    let title = format!("{}{}", agent.id, freshness(app, &detail_key));
    let text = |value: String| Span::styled(value, Style::default().fg(theme.text));
    DetailPanel {
        title: &title,
        fields: vec![
            ("Name", text(agent.name.clone())),
            (
                "Status",
                Span::styled(
                    agent.status.to_string(),
                    Style::default().fg(agent_status_color(agent.status, theme)),
                ),
            ),
            ("Category", text(agent.category.clone())),
            ("Template", text(agent.template.clone())),
            ("Tags", text(agent.tags.join(", "))),
            ("Description", text(agent.description.clone())),
            ("Tasks", text(agent.metrics.tasks_completed.to_string())),
            (
                "Success",
                Span::styled(
                    format!("{:.0}%", agent.metrics.success_rate * 100.0),
                    Style::default().fg(success_rate_color(agent.metrics.success_rate, theme)),
                ),
            ),
            ("Run", text(agent.generation_run_id.clone())),
            ("Created", text(agent.created_at.format("%Y-%m-%d %H:%M").to_string())),
            ("Updated", text(agent.updated_at.format("%Y-%m-%d %H:%M").to_string())),
        ],
        label_style: Style::default().fg(theme.secondary),
        border_style: Style::default().fg(theme.border),
        footer: Some(footer),
    }
    .render(f, area);
}

fn render_editor(f: &mut Frame<'_>, app: &App, area: Rect) {
    let Some(editor) = &app.agents.editor else {
        return;
    };
    let theme = &app.theme;
    let height = InputField::HEIGHT * AGENT_EDIT_FIELDS.len() as u16 + 2;
    let popup = centered_rect(70, height, area);
    f.render_widget(Clear, popup);
    let block = Block::default()
        .title(format!("Edit {}", editor.agent_id))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_focus));
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let slots = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(InputField::HEIGHT); AGENT_EDIT_FIELDS.len()])
        .split(inner);
    for (index, label) in AGENT_EDIT_FIELDS.iter().enumerate() {
        InputField {
            label,
            value: editor.field(index),
            focused: editor.focus == index,
            masked: false,
            error: editor.errors.for_field(EDIT_FIELD_KEYS[index]),
            style: Style::default().fg(theme.border),
            focus_style: Style::default().fg(theme.border_focus),
            error_style: Style::default().fg(theme.error),
        }
        .render(f, slots[index]);
    }
}
