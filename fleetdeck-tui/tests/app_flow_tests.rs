//! Drives `App` against the in-process backend without a terminal.

use std::sync::Arc;
use std::time::{Duration, Instant};

use fleetdeck_api::mock::{DEMO_EMAIL, DEMO_PASSWORD};
use fleetdeck_api::{keys, ApiClient, FleetStore, MockConfig, MockServer, SessionContext};
use fleetdeck_cache::MutationStatus;
use fleetdeck_core::{Agent, GenerationListResponse};
use fleetdeck_tui::commands::{self, Command};
use fleetdeck_tui::config::{
    AuthConfig, BackendConfig, BackendKind, CacheSection, ListConfig, MockSection, ThemeConfig,
    TuiConfig,
};
use fleetdeck_tui::events::TuiEvent;
use fleetdeck_tui::keys::Action;
use fleetdeck_tui::nav::View;
use fleetdeck_tui::notifications::{NotificationAction, NotificationLevel};
use fleetdeck_tui::state::{App, Screen};
use fleetdeck_tui::views;
use ratatui::{backend::TestBackend, Terminal};
use tokio::sync::mpsc;

fn config() -> TuiConfig {
    TuiConfig {
        backend: BackendConfig {
            kind: BackendKind::Mock,
            base_url: None,
            request_timeout_ms: 5_000,
        },
        cache: CacheSection {
            stale_time_ms: 30_000,
            gc_time_ms: 300_000,
        },
        list: ListConfig {
            page_size: 20,
            row_height: 2,
            overscan: 3,
            search_debounce_ms: 300,
        },
        mock: MockSection {
            read_latency_ms: 0,
            update_latency_ms: 0,
            generation_latency_ms: 0,
            failure_rate: 0.0,
            seed: 42,
        },
        auth: AuthConfig {
            email: None,
            password: None,
        },
        refresh_interval_ms: 250,
        persistence_path: "tmp/state.json".into(),
        log_path: "tmp/fleetdeck.log".into(),
        theme: ThemeConfig {
            name: "fleet".to_string(),
        },
    }
}

struct Harness {
    app: App,
    mock: Arc<MockServer>,
    _events: mpsc::Receiver<TuiEvent>,
}

fn harness() -> Harness {
    let mock = Arc::new(MockServer::new(MockConfig::instant()));
    let client = ApiClient::new(mock.clone(), SessionContext::new());
    let config = config();
    let store = FleetStore::new(client, config.cache_config());
    let (tx, rx) = mpsc::channel(1024);
    let app = App::new(config, store, Some(mock.clone()), tx, None);
    Harness {
        app,
        mock,
        _events: rx,
    }
}

/// Run commands to completion, feeding every outcome back into the app.
async fn drive(app: &mut App, mut pending: Vec<Command>) {
    while let Some(command) = pending.pop() {
        let outcome = commands::run(&app.store, command).await;
        pending.extend(app.apply_outcome(outcome));
    }
}

async fn act(app: &mut App, action: Action) {
    let commands = app.handle_action(action, Instant::now());
    drive(app, commands).await;
}

async fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        act(app, Action::Input(c)).await;
    }
}

async fn signed_in() -> Harness {
    let mut h = harness();
    type_text(&mut h.app, DEMO_EMAIL).await;
    act(&mut h.app, Action::NextField).await;
    type_text(&mut h.app, DEMO_PASSWORD).await;
    act(&mut h.app, Action::Confirm).await;
    assert_eq!(h.app.screen, Screen::Console);
    h
}

#[tokio::test]
async fn invalid_login_form_is_not_submitted() {
    let mut h = harness();
    let commands = h.app.handle_action(Action::Confirm, Instant::now());
    assert!(commands.is_empty());
    assert!(h.app.login.errors.for_field("email").is_some());
    assert!(h.app.login.errors.for_field("password").is_some());
    assert_eq!(h.app.screen, Screen::Login);
}

#[tokio::test]
async fn wrong_password_keeps_login_screen() {
    let mut h = harness();
    type_text(&mut h.app, DEMO_EMAIL).await;
    act(&mut h.app, Action::NextField).await;
    type_text(&mut h.app, "not-the-password").await;
    act(&mut h.app, Action::Confirm).await;

    assert_eq!(h.app.screen, Screen::Login);
    assert!(h.app.login.failure.is_some());
    assert!(!h.app.login.pending);
}

#[tokio::test]
async fn login_loads_the_dashboard() {
    let h = signed_in().await;
    assert_eq!(h.app.active_view, View::Dashboard);
    assert!(h.app.login.password.is_empty());
    assert_eq!(h.app.watched_keys().len(), 3);
    assert!(h
        .app
        .store
        .cached::<GenerationListResponse>(&keys::generation_list())
        .is_some());
    assert!(!h.app.category_list().is_empty());
}

#[tokio::test]
async fn switching_views_reloads_and_rewatches() {
    let mut h = signed_in().await;
    act(&mut h.app, Action::SwitchView(1)).await;
    assert_eq!(h.app.active_view, View::Agents);
    let page = h.app.agent_page().unwrap();
    assert_eq!(page.data.len(), 20);

    act(&mut h.app, Action::SwitchView(4)).await;
    assert_eq!(h.app.active_view, View::History);
    assert_eq!(h.app.watched_keys(), vec![keys::generation_list()]);
}

#[tokio::test]
async fn failed_status_change_rolls_back_and_retries() {
    let mut h = signed_in().await;
    act(&mut h.app, Action::SwitchView(1)).await;
    act(&mut h.app, Action::MoveDown).await;
    let agent = h.app.selected_agent().unwrap();
    let detail = keys::agent_detail(&agent.id);
    assert!(h.app.store.cached::<Agent>(&detail).is_some());

    h.mock.set_offline(true);
    act(&mut h.app, Action::CycleAgentStatus).await;

    let rolled_back = h.app.store.cached::<Agent>(&detail).unwrap();
    assert_eq!(rolled_back.status, agent.status);
    assert!(h.app.agents.update.error().is_some());
    let note = h.app.notifications.last().unwrap();
    assert_eq!(note.level, NotificationLevel::Error);
    assert_eq!(note.action, Some(NotificationAction::Retry));

    h.mock.set_offline(false);
    act(&mut h.app, Action::Retry).await;
    let saved = h.app.store.cached::<Agent>(&detail).unwrap();
    assert_eq!(saved.status, agent.status.cycle());
    assert!(matches!(h.app.agents.update, MutationStatus::Succeeded(_)));
}

#[tokio::test]
async fn search_is_committed_after_the_debounce() {
    let mut h = signed_in().await;
    act(&mut h.app, Action::SwitchView(1)).await;
    act(&mut h.app, Action::OpenSearch).await;

    let start = Instant::now();
    for c in "nov".chars() {
        assert!(h.app.handle_action(Action::Input(c), start).is_empty());
    }
    assert!(h.app.debounce_deadline().is_some());
    assert!(h.app.poll_debounce(start).is_empty());

    let commands = h.app.poll_debounce(start + Duration::from_millis(301));
    match commands.as_slice() {
        [Command::LoadAgents(query)] => assert_eq!(query.filter("search"), Some("nov")),
        other => panic!("unexpected commands: {:?}", other),
    }
    assert!(h.app.debounce_deadline().is_none());
}

#[tokio::test]
async fn second_generation_is_blocked_while_pending() {
    let mut h = signed_in().await;
    act(&mut h.app, Action::SwitchView(2)).await;
    assert!(!h.app.generator.form.category.is_empty());
    assert!(!h.app.generator.form.template.is_empty());

    let now = Instant::now();
    let first = h.app.handle_action(Action::Confirm, now);
    assert!(matches!(first.as_slice(), [Command::RunGeneration(_)]));
    assert!(h.app.generator.status.is_pending());
    assert!(h.app.handle_action(Action::Confirm, now).is_empty());

    drive(&mut h.app, first).await;
    match &h.app.generator.status {
        MutationStatus::Succeeded(run) => assert_eq!(run.generated_count, 10),
        other => panic!("unexpected status: {:?}", other),
    }
    assert!(h.app.generator.started_at.is_none());
}

#[tokio::test]
async fn task_panic_trips_boundary_until_retry() {
    let mut h = signed_in().await;
    let commands = h.app.handle_event(
        TuiEvent::TaskPanicked {
            command: "load agents",
            message: "boom".to_string(),
        },
        Instant::now(),
    );
    assert!(commands.is_empty());
    assert!(h.app.boundary.is_tripped());

    let reloads = h.app.handle_action(Action::Retry, Instant::now());
    assert!(!h.app.boundary.is_tripped());
    assert_eq!(reloads.len(), 3);
}

#[tokio::test]
async fn refresh_invalidates_view_resources() {
    let mut h = signed_in().await;
    let commands = h.app.handle_action(Action::Refresh, Instant::now());
    assert_eq!(
        commands,
        vec![
            Command::Refresh(keys::AGENTS),
            Command::Refresh(keys::GENERATIONS),
            Command::Refresh(keys::CATEGORIES),
        ]
    );
}

#[tokio::test]
async fn logout_returns_to_login() {
    let mut h = signed_in().await;
    act(&mut h.app, Action::Logout).await;
    assert_eq!(h.app.screen, Screen::Login);
    assert!(h.app.watched_keys().is_empty());
    assert!(h.app.store.client().session().user().is_none());
}

#[tokio::test]
async fn logout_while_offline_still_signs_out() {
    let mut h = signed_in().await;
    assert!(!h.app.store.cache().keys().is_empty());
    h.mock.set_offline(true);

    let outcome = commands::run(&h.app.store, Command::Logout).await;
    assert!(outcome.error().is_none());
    h.app.apply_outcome(outcome);

    assert_eq!(h.app.screen, Screen::Login);
    assert!(h.app.store.client().session().user().is_none());
    assert!(h.app.store.cache().keys().is_empty());
}

#[tokio::test]
async fn every_view_renders_without_tripping_the_boundary() {
    let mut h = signed_in().await;
    let mut terminal = Terminal::new(TestBackend::new(140, 45)).unwrap();
    for index in 0..View::all().len() {
        act(&mut h.app, Action::SwitchView(index)).await;
        act(&mut h.app, Action::MoveDown).await;
        terminal.draw(|f| views::render(f, &mut h.app)).unwrap();
        assert!(!h.app.boundary.is_tripped(), "view {} tripped", index);
    }
    let screen: String = terminal
        .backend()
        .buffer()
        .content
        .iter()
        .map(|cell| cell.symbol())
        .collect();
    assert!(screen.contains("FLEETDECK"));
}
