//! Generation run history.

use crate::state::App;
use crate::theme::generation_status_color;
use crate::views::{freshness, placeholder};
use crate::widgets::{DetailPanel, VirtualList};
use fleetdeck_api::keys;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &mut App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let key = keys::generation_list();
    if let Some(placeholder) = placeholder(app, &key, "generation runs") {
        f.render_widget(placeholder, area);
        return;
    }
    let runs = app.generation_list();
    let title = format!("Generation Runs: {}{}", runs.len(), freshness(app, &key));
    let theme = &app.theme;
    let list = VirtualList::new(runs.len(), 1, |index, _| {
        let run = &runs[index];
        vec![Line::from(vec![
            Span::styled(
                format!("{:<8}", run.status),
                Style::default().fg(generation_status_color(run.status, theme)),
            ),
            Span::styled(format!("{:<12}", run.id), Style::default().fg(theme.text)),
            Span::styled(
                format!(
                    "{} • {:>3} × {}",
                    run.created_at.format("%Y-%m-%d %H:%M"),
                    run.params.quantity,
                    run.params.category
                ),
                Style::default().fg(theme.text_dim),
            ),
        ])]
    })
    .highlight_style(Style::default().bg(theme.bg_highlight))
    .block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.border)),
    );
    f.render_stateful_widget(list, columns[0], &mut app.history.scroll);

    let theme = &app.theme;
    let selected = app.history.scroll.selected().and_then(|i| runs.get(i));
    let text = |value: String| Span::styled(value, Style::default().fg(theme.text));
    let fields = match selected {
        Some(run) => {
            let mut agent_ids = run.agent_ids.iter().take(5).cloned().collect::<Vec<_>>();
            if run.agent_ids.len() > 5 {
                agent_ids.push(format!("+{} more", run.agent_ids.len() - 5));
            }
            vec![
                ("Run", text(run.id.clone())),
                (
                    "Status",
                    Span::styled(
                        run.status.to_string(),
                        Style::default().fg(generation_status_color(run.status, theme)),
                    ),
                ),
                ("Created", text(run.created_at.format("%Y-%m-%d %H:%M:%S").to_string())),
                ("Quantity", text(run.params.quantity.to_string())),
                ("Category", text(run.params.category.clone())),
                ("Template", text(run.params.template.clone())),
                (
                    "Seed",
                    text(run.params.seed.map_or_else(|| "random".to_string(), |s| s.to_string())),
                ),
                ("Generated", text(run.generated_count.to_string())),
                ("Agents", text(agent_ids.join(", "))),
            ]
        }
        None => Vec::new(),
    };
    DetailPanel {
        title: "Run Details",
        fields,
        label_style: Style::default().fg(theme.secondary),
        border_style: Style::default().fg(theme.border),
        footer: None,
    }
    .render(f, columns[1]);
}
