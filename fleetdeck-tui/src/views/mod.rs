//! View rendering dispatch.

pub mod agents;
pub mod categories;
pub mod dashboard;
pub mod generator;
pub mod history;
pub mod login;

use crate::boundary::{self, Fault};
use crate::keys::InputMode;
use crate::nav::View;
use crate::notifications::{NotificationAction, NotificationLevel};
use crate::state::{App, Screen};
use crate::theme::Theme;
use fleetdeck_cache::EntryStatus;
use fleetdeck_core::CacheKey;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &mut App) {
    let area = f.size();
    if app.screen == Screen::Login {
        login::render(f, app, area);
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    render_header(f, app, layout[0]);
    render_body(f, app, layout[1]);
    render_footer(f, app, layout[2]);

    if app.show_help {
        render_help(f, app, area);
    }
}

/// Render the active view inside the error boundary.
fn render_body(f: &mut Frame<'_>, app: &mut App, area: Rect) {
    if let Some(fault) = app.boundary.fault().cloned() {
        render_fallback(f, &app.theme, &fault, area);
        return;
    }
    let view = app.active_view;
    let rendered = boundary::catch(|| match view {
        View::Dashboard => dashboard::render(f, app, area),
        View::Agents => agents::render(f, app, area),
        View::Generator => generator::render(f, app, area),
        View::Categories => categories::render(f, app, area),
        View::History => history::render(f, app, area),
    });
    if let Err(message) = rendered {
        app.boundary.trip(Fault::new(view.title(), message));
    }
}

fn render_header(f: &mut Frame<'_>, app: &App, area: Rect) {
    let user = app
        .store
        .client()
        .session()
        .user()
        .map_or_else(|| "signed out".to_string(), |u| u.name);
    let backend = match &app.mock {
        Some(mock) if mock.is_offline() => "mock (offline)",
        Some(_) => "mock",
        None => "http",
    };
    let stats = app.store.cache().stats();
    let title = format!(
        " FLEETDECK | {} | backend: {} | cache: {} keys, {:.0}% hits ",
        user,
        backend,
        app.store.cache().keys().len(),
        stats.hit_rate() * 100.0
    );

    let titles: Vec<Line> = View::all()
        .iter()
        .enumerate()
        .map(|(i, view)| Line::from(format!("{} {}", i + 1, view.title())))
        .collect();
    let tabs = Tabs::new(titles)
        .select(app.active_view.index())
        .style(Style::default().fg(app.theme.text_dim))
        .highlight_style(
            Style::default()
                .fg(app.theme.primary)
                .add_modifier(Modifier::BOLD),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border))
                .title(Span::styled(title, Style::default().fg(app.theme.primary))),
        );
    f.render_widget(tabs, area);
}

fn render_footer(f: &mut Frame<'_>, app: &App, area: Rect) {
    let help = match app.input_mode() {
        InputMode::Editing => "type to edit • Tab next field • Enter submit • Esc cancel",
        InputMode::Normal => "1-5/Tab views • j/k move • ? help • R retry • O offline • q quit",
    };
    let (text, style) = match app.notifications.last() {
        Some(note) => {
            let color = level_color(note.level, &app.theme);
            let hint = match note.action {
                Some(NotificationAction::Retry) => "  [R] retry  [x] dismiss",
                Some(NotificationAction::Dismiss) => "  [x] dismiss",
                None => "",
            };
            (
                format!("{}: {}{}", note.level.label(), note.message, hint),
                Style::default().fg(color),
            )
        }
        None => (help.to_string(), Style::default().fg(app.theme.text_dim)),
    };
    let footer = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .style(style);
    f.render_widget(footer, area);
}

fn render_fallback(f: &mut Frame<'_>, theme: &Theme, fault: &Fault, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(
            "Something went wrong in this view.",
            Style::default().fg(theme.error).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(format!("{}: {}", fault.origin, fault.message)),
        Line::from(Span::styled(
            format!("at {}", fault.at.format("%H:%M:%S")),
            Style::default().fg(theme.text_dim),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Press R to try again.",
            Style::default().fg(theme.primary),
        )),
    ];
    let widget = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title("Error")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.error)),
        );
    f.render_widget(widget, area);
}

const HELP: &[(&str, &str)] = &[
    ("1-5 / Tab", "switch view"),
    ("j/k, arrows", "move selection"),
    ("PgUp/PgDn", "move a page"),
    ("[ / ]", "previous / next page"),
    ("/", "search agents"),
    ("f / c", "cycle status / category filter"),
    ("s / o", "next sort field / flip direction"),
    ("r", "reset filters"),
    ("t", "cycle status of the selected agent"),
    ("e / Enter", "edit selected item"),
    ("n / d", "new / delete category"),
    ("Ctrl-r", "refresh the view"),
    ("R", "retry last failure"),
    ("O", "toggle mock backend offline"),
    ("L", "log out"),
    ("x", "dismiss notification"),
    ("q", "quit"),
];

fn render_help(f: &mut Frame<'_>, app: &App, area: Rect) {
    let popup = centered_rect(60, HELP.len() as u16 + 2, area);
    let lines: Vec<Line> = HELP
        .iter()
        .map(|(keys, what)| {
            Line::from(vec![
                Span::styled(format!("{:<14}", keys), Style::default().fg(app.theme.primary)),
                Span::styled(*what, Style::default().fg(app.theme.text)),
            ])
        })
        .collect();
    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .title("Keys")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border_focus)),
        ),
        popup,
    );
}

pub(crate) fn level_color(level: NotificationLevel, theme: &Theme) -> ratatui::style::Color {
    match level {
        NotificationLevel::Info => theme.info,
        NotificationLevel::Warning => theme.warning,
        NotificationLevel::Error => theme.error,
        NotificationLevel::Success => theme.success,
    }
}

/// Rect of `percent_x` width and `height` rows, centered in `area`.
pub(crate) fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let width = area.width * percent_x.min(100) / 100;
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// What to show in place of a list that has no data yet, if anything.
///
/// Data that is already cached is always shown, even next to a failed
/// refetch, so this only covers the first load.
pub(crate) fn placeholder(app: &App, key: &CacheKey, what: &str) -> Option<Paragraph<'static>> {
    let theme = &app.theme;
    let entry = app.store.entry(key);
    let (text, color) = match entry {
        Some(entry) if entry.data.is_some() => return None,
        Some(entry) if entry.status == EntryStatus::Error => {
            let message = entry
                .error
                .map_or_else(|| "unknown error".to_string(), |e| e.message);
            (
                format!("Could not load {}: {}\nPress R to retry.", what, message),
                theme.error,
            )
        }
        _ => (format!("Loading {}…", what), theme.text_dim),
    };
    Some(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .style(Style::default().fg(color))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(theme.border)),
            ),
    )
}

/// Marker for an entry being refreshed or stale behind shown data.
pub(crate) fn freshness(app: &App, key: &CacheKey) -> &'static str {
    match app.store.entry(key) {
        Some(entry) if entry.is_pending() => " (refreshing)",
        Some(entry) if entry.is_error() => " (refresh failed)",
        Some(entry) if entry.is_stale => " (stale)",
        _ => "",
    }
}
