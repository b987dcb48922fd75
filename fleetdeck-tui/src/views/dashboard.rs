//! Dashboard: headline numbers and the latest activity.

use crate::state::{recent_agents_query, App};
use crate::theme::{agent_status_color, generation_status_color};
use crate::views::{freshness, placeholder};
use crate::widgets::StatCard;
use fleetdeck_api::keys;
use fleetdeck_core::{AgentListResponse, CategoryListResponse, GenerationListResponse, GenerationStatus};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);
    render_stats(f, app, rows[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[1]);
    render_recent_agents(f, app, columns[0]);
    render_recent_runs(f, app, columns[1]);
}

fn render_stats(f: &mut Frame<'_>, app: &App, area: Rect) {
    let theme = &app.theme;
    let agents = app
        .store
        .cached::<AgentListResponse>(&keys::agent_list(&recent_agents_query()));
    let runs = app
        .store
        .cached::<GenerationListResponse>(&keys::generation_list());
    let categories = app
        .store
        .cached::<CategoryListResponse>(&keys::category_list(None));

    let count = |value: Option<u32>| value.map_or_else(|| "…".to_string(), |v| v.to_string());
    let successful = runs.as_ref().map(|r| {
        r.data
            .iter()
            .filter(|run| run.status == GenerationStatus::Success)
            .count() as u32
    });
    let cards = [
        ("Total Agents", count(agents.map(|a| a.total)), "in the fleet"),
        ("Generation Runs", count(runs.as_ref().map(|r| r.total)), "all time"),
        ("Categories", count(categories.map(|c| c.total)), "configured"),
        ("Successful Runs", count(successful), "completed"),
    ];

    let slots = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);
    for ((title, value, caption), slot) in cards.into_iter().zip(slots.iter()) {
        StatCard {
            title,
            value,
            caption,
            value_style: Style::default().fg(theme.primary),
            caption_style: Style::default().fg(theme.text_dim),
            border_style: Style::default().fg(theme.border),
        }
        .render(f, *slot);
    }
}

fn render_recent_agents(f: &mut Frame<'_>, app: &App, area: Rect) {
    let key = keys::agent_list(&recent_agents_query());
    if let Some(placeholder) = placeholder(app, &key, "recent agents") {
        f.render_widget(placeholder, area);
        return;
    }
    let agents = app
        .store
        .cached::<AgentListResponse>(&key)
        .map(|page| page.data)
        .unwrap_or_default();
    let items: Vec<ListItem> = agents
        .iter()
        .map(|agent| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<12}", agent.status),
                    Style::default().fg(agent_status_color(agent.status, &app.theme)),
                ),
                Span::styled(format!("{:<18}", agent.name), Style::default().fg(app.theme.text)),
                Span::styled(
                    format!("{} • {}", agent.category, agent.created_at.format("%Y-%m-%d")),
                    Style::default().fg(app.theme.text_dim),
                ),
            ]))
        })
        .collect();
    let title = format!("Recent Agents{}", freshness(app, &key));
    f.render_widget(
        List::new(items).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border)),
        ),
        area,
    );
}

fn render_recent_runs(f: &mut Frame<'_>, app: &App, area: Rect) {
    let key = keys::generation_list();
    if let Some(placeholder) = placeholder(app, &key, "generation runs") {
        f.render_widget(placeholder, area);
        return;
    }
    let items: Vec<ListItem> = app
        .generation_list()
        .iter()
        .take(8)
        .map(|run| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<8}", run.status),
                    Style::default().fg(generation_status_color(run.status, &app.theme)),
                ),
                Span::styled(format!("{:<12}", run.id), Style::default().fg(app.theme.text)),
                Span::styled(
                    format!("{} × {}", run.generated_count, run.params.category),
                    Style::default().fg(app.theme.text_dim),
                ),
            ]))
        })
        .collect();
    let title = format!("Recent Generations{}", freshness(app, &key));
    f.render_widget(
        List::new(items).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border)),
        ),
        area,
    );
}
