//! Application state and transitions.
//!
//! `App` owns no backend data of its own: lists, details and stats are read
//! from the shared cache when a view renders. What lives here is the UI side
//! of things (selection, open forms, mutation status, notifications) and the
//! logic that turns key actions and command outcomes into new commands.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use fleetdeck_api::keys::{self, AGENTS, CATEGORIES, GENERATIONS, TEMPLATES};
use fleetdeck_api::{FleetStore, MockServer};
use fleetdeck_cache::{MutationStatus, Subscription};
use fleetdeck_core::{
    validate_agent_edit, validate_category, validate_generation, validate_login, slugify,
    Agent, AgentEditForm, AgentListResponse, AgentStatus, CacheKey, Category,
    CategoryListResponse, GenerationListResponse, GenerationRun, GeneratorForm, LoginRequest,
    Query, QueryController, QueryInput, SortDirection, SortSpec, TemplateListResponse,
    UpdateCategoryInput, ValidationErrors,
};
use crossterm::event::KeyEvent;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::boundary::{ErrorBoundary, Fault};
use crate::commands::{Command, Outcome};
use crate::config::{BackendKind, TuiConfig};
use crate::events::TuiEvent;
use crate::keys::{map_key, Action, InputMode};
use crate::nav::View;
use crate::notifications::{Notification, NotificationAction, NotificationLevel};
use crate::persistence::PersistedState;
use crate::theme::Theme;
use crate::widgets::ScrollState;

/// How long non-error notifications stay in the footer.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(4);
const MAX_NOTIFICATIONS: usize = 20;

/// Sortable agent columns, in the order `s` cycles through them.
pub const AGENT_SORT_FIELDS: &[&str] = &[
    "createdAt",
    "updatedAt",
    "name",
    "status",
    "category",
    "tasksCompleted",
    "successRate",
];

pub const AGENT_EDIT_FIELDS: &[&str] = &["Name", "Description", "Status", "Category", "Tags"];
pub const CATEGORY_FIELDS: &[&str] = &["Name", "Description"];
pub const GENERATOR_FIELDS: &[&str] = &["Quantity", "Category", "Template", "Use seed", "Seed"];

/// Agents shown on the dashboard: the five most recently created.
pub fn recent_agents_query() -> Query {
    Query::new(AGENTS, 5).with_sort(SortSpec::new("createdAt", SortDirection::Desc))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Console,
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// 0 = email, 1 = password.
    pub focus: usize,
    pub errors: ValidationErrors,
    /// Message of a rejected login.
    pub failure: Option<String>,
    pub pending: bool,
}

#[derive(Debug, Clone)]
pub struct AgentEditor {
    pub agent_id: String,
    pub form: AgentEditForm,
    pub focus: usize,
    pub errors: ValidationErrors,
}

impl AgentEditor {
    fn from_agent(agent: &Agent) -> Self {
        Self {
            agent_id: agent.id.clone(),
            form: AgentEditForm {
                name: agent.name.clone(),
                description: agent.description.clone(),
                status: agent.status.to_string(),
                category: agent.category.clone(),
                tags: agent.tags.join(", "),
            },
            focus: 0,
            errors: ValidationErrors::new(),
        }
    }

    pub fn field(&self, index: usize) -> &str {
        match index {
            0 => &self.form.name,
            1 => &self.form.description,
            2 => &self.form.status,
            3 => &self.form.category,
            _ => &self.form.tags,
        }
    }

    fn field_mut(&mut self, index: usize) -> &mut String {
        match index {
            0 => &mut self.form.name,
            1 => &mut self.form.description,
            2 => &mut self.form.status,
            3 => &mut self.form.category,
            _ => &mut self.form.tags,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentsViewState {
    pub controller: QueryController,
    pub scroll: ScrollState,
    pub searching: bool,
    pub editor: Option<AgentEditor>,
    pub update: MutationStatus<Agent>,
}

/// Form for creating (`id == None`) or editing a category.
#[derive(Debug, Clone, Default)]
pub struct CategoryEditor {
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub focus: usize,
    pub errors: ValidationErrors,
    pub saving: bool,
    pub failure: Option<String>,
}

impl CategoryEditor {
    fn for_category(category: &Category) -> Self {
        Self {
            id: Some(category.id.clone()),
            name: category.name.clone(),
            description: category.description.clone(),
            ..Self::default()
        }
    }

    pub fn field(&self, index: usize) -> &str {
        if index == 0 {
            &self.name
        } else {
            &self.description
        }
    }

    fn field_mut(&mut self, index: usize) -> &mut String {
        if index == 0 {
            &mut self.name
        } else {
            &mut self.description
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CategoriesViewState {
    pub scroll: ScrollState,
    pub editor: Option<CategoryEditor>,
    /// Id awaiting delete confirmation.
    pub confirm_delete: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GeneratorViewState {
    pub form: GeneratorForm,
    pub focus: usize,
    pub editing: bool,
    pub errors: ValidationErrors,
    pub status: MutationStatus<GenerationRun>,
    pub started_at: Option<Instant>,
}

impl GeneratorViewState {
    pub fn field(&self, index: usize) -> String {
        match index {
            0 => self.form.quantity.clone(),
            1 => self.form.category.clone(),
            2 => self.form.template.clone(),
            3 => if self.form.use_seed { "yes" } else { "no" }.to_string(),
            _ => self.form.seed.clone(),
        }
    }

    fn field_mut(&mut self, index: usize) -> Option<&mut String> {
        match index {
            0 => Some(&mut self.form.quantity),
            1 => Some(&mut self.form.category),
            2 => Some(&mut self.form.template),
            4 => Some(&mut self.form.seed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HistoryViewState {
    pub scroll: ScrollState,
}

pub struct App {
    pub config: TuiConfig,
    pub theme: Theme,
    pub store: FleetStore,
    /// Present when running against the in-process backend.
    pub mock: Option<Arc<MockServer>>,
    pub screen: Screen,
    pub active_view: View,
    pub login: LoginForm,
    pub agents: AgentsViewState,
    pub categories: CategoriesViewState,
    pub generator: GeneratorViewState,
    pub history: HistoryViewState,
    pub notifications: Vec<Notification>,
    pub boundary: ErrorBoundary,
    pub show_help: bool,
    pub should_quit: bool,
    events: mpsc::Sender<TuiEvent>,
    last_failed: Option<Command>,
    watches: HashMap<&'static str, (CacheKey, Subscription)>,
}

impl App {
    pub fn new(
        config: TuiConfig,
        store: FleetStore,
        mock: Option<Arc<MockServer>>,
        events: mpsc::Sender<TuiEvent>,
        persisted: Option<PersistedState>,
    ) -> Self {
        let theme = Theme::named(&config.theme.name).unwrap_or_else(Theme::fleet);
        let initial = Query::new(AGENTS, config.list.page_size);
        let mut controller = QueryController::with_delay(initial, config.search_debounce());
        let mut active_view = View::Dashboard;
        if let Some(state) = persisted {
            active_view = state.active_view;
            if let Some(query) = state.agent_query.filter(|q| q.resource == AGENTS) {
                controller = controller.resumed_at(query);
            }
        }
        let login = LoginForm {
            email: config.auth.email.clone().unwrap_or_default(),
            password: config.auth.password.clone().unwrap_or_default(),
            ..LoginForm::default()
        };

        Self {
            theme,
            store,
            mock,
            screen: Screen::Login,
            active_view,
            login,
            agents: AgentsViewState {
                controller,
                scroll: Default::default(),
                searching: false,
                editor: None,
                update: MutationStatus::Idle,
            },
            categories: CategoriesViewState::default(),
            generator: GeneratorViewState::default(),
            history: HistoryViewState::default(),
            notifications: Vec::new(),
            boundary: ErrorBoundary::new(),
            show_help: false,
            should_quit: false,
            events,
            last_failed: None,
            watches: HashMap::new(),
            config,
        }
    }

    /// Commands to run right after start: sign in when credentials are
    /// configured.
    pub fn startup(&mut self) -> Vec<Command> {
        if self.login.email.is_empty() || self.login.password.is_empty() {
            return Vec::new();
        }
        self.submit_login()
    }

    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            active_view: self.active_view,
            agent_query: Some(self.agents.controller.current().clone()),
        }
    }

    pub fn input_mode(&self) -> InputMode {
        if self.screen == Screen::Login {
            return InputMode::Editing;
        }
        if self.show_help {
            return InputMode::Normal;
        }
        let editing = match self.active_view {
            View::Agents => self.agents.searching || self.agents.editor.is_some(),
            View::Categories => self.categories.editor.is_some(),
            View::Generator => self.generator.editing,
            View::Dashboard | View::History => false,
        };
        if editing {
            InputMode::Editing
        } else {
            InputMode::Normal
        }
    }

    pub fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) {
        self.push_notification(Notification::new(level, message));
    }

    fn push_notification(&mut self, notification: Notification) {
        self.notifications.push(notification);
        if self.notifications.len() > MAX_NOTIFICATIONS {
            self.notifications.remove(0);
        }
    }

    /// Record a failure. Retry re-runs `retry`, or reloads the active view
    /// when there is nothing to re-run.
    fn notify_failure(&mut self, message: String, retry: Option<Command>) {
        self.last_failed = retry;
        self.push_notification(
            Notification::new(NotificationLevel::Error, message)
                .with_action(NotificationAction::Retry),
        );
    }

    /// Periodic housekeeping.
    pub fn on_tick(&mut self) {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(NOTIFICATION_TTL).unwrap_or_default();
        self.notifications.retain(|n| !n.is_expired(now, ttl));
        let evicted = self.store.cache().collect_garbage();
        if evicted > 0 {
            debug!(evicted, "collected idle cache entries");
        }
    }

    /// When the pending search has to be committed, if one is waiting.
    pub fn debounce_deadline(&self) -> Option<Instant> {
        self.agents.controller.deadline()
    }

    pub fn poll_debounce(&mut self, now: Instant) -> Vec<Command> {
        match self.agents.controller.poll(now) {
            Some(query) => self.agent_query_changed(query),
            None => Vec::new(),
        }
    }

    // === Cache watches ===

    /// Redraw whenever the entry under `key` changes. One key per slot; a
    /// new key replaces the slot's previous subscription.
    fn watch(&mut self, slot: &'static str, key: CacheKey) {
        if matches!(self.watches.get(slot), Some((current, _)) if *current == key) {
            return;
        }
        let events = self.events.clone();
        let subscription = self.store.cache().subscribe(&key, move |changed, _| {
            // A full queue already has a redraw pending.
            let _ = events.try_send(TuiEvent::CacheChanged(changed.clone()));
        });
        self.watches.insert(slot, (key, subscription));
    }

    pub fn watched_keys(&self) -> Vec<CacheKey> {
        self.watches.values().map(|(key, _)| key.clone()).collect()
    }

    /// Watch and load what the active view shows.
    pub fn view_loads(&mut self) -> Vec<Command> {
        self.watches.clear();
        match self.active_view {
            View::Dashboard => {
                let recent = recent_agents_query();
                self.watch("dashboard.recent", keys::agent_list(&recent));
                self.watch("generations", keys::generation_list());
                self.watch("categories", keys::category_list(None));
                vec![
                    Command::LoadAgents(recent),
                    Command::LoadGenerations,
                    Command::LoadCategories(None),
                ]
            }
            View::Agents => {
                let query = self.agents.controller.current().clone();
                self.watch("agents.list", keys::agent_list(&query));
                self.watch("categories", keys::category_list(None));
                let mut commands = vec![Command::LoadAgents(query), Command::LoadCategories(None)];
                if let Some(agent) = self.selected_agent() {
                    self.watch("agents.detail", keys::agent_detail(&agent.id));
                    commands.push(Command::LoadAgent(agent.id));
                }
                commands
            }
            View::Generator => {
                self.watch("categories", keys::category_list(None));
                self.watch("templates", keys::template_list());
                vec![Command::LoadCategories(None), Command::LoadTemplates]
            }
            View::Categories => {
                self.watch("categories", keys::category_list(None));
                vec![Command::LoadCategories(None)]
            }
            View::History => {
                self.watch("generations", keys::generation_list());
                vec![Command::LoadGenerations]
            }
        }
    }

    fn view_resources(&self) -> &'static [&'static str] {
        match self.active_view {
            View::Dashboard => &[AGENTS, GENERATIONS, CATEGORIES],
            View::Agents => &[AGENTS, CATEGORIES],
            View::Generator => &[CATEGORIES, TEMPLATES],
            View::Categories => &[CATEGORIES],
            View::History => &[GENERATIONS],
        }
    }

    // === Cache reads ===

    pub fn agent_page(&self) -> Option<AgentListResponse> {
        self.store
            .cached(&keys::agent_list(self.agents.controller.current()))
    }

    /// Latest copy of an agent: the detail entry if cached, else `fallback`.
    pub fn freshest_agent(&self, fallback: &Agent) -> Agent {
        self.store
            .cached::<Agent>(&keys::agent_detail(&fallback.id))
            .unwrap_or_else(|| fallback.clone())
    }

    pub fn selected_agent(&self) -> Option<Agent> {
        let page = self.agent_page()?;
        let row = page.data.get(self.agents.scroll.selected()?)?;
        Some(self.freshest_agent(row))
    }

    pub fn category_list(&self) -> Vec<Category> {
        self.store
            .cached::<CategoryListResponse>(&keys::category_list(None))
            .map(|list| list.data)
            .unwrap_or_default()
    }

    pub fn selected_category(&self) -> Option<Category> {
        let index = self.categories.scroll.selected()?;
        self.category_list().into_iter().nth(index)
    }

    pub fn generation_list(&self) -> Vec<GenerationRun> {
        self.store
            .cached::<GenerationListResponse>(&keys::generation_list())
            .map(|list| list.data)
            .unwrap_or_default()
    }

    /// How long a generation run is expected to take, for the progress bar.
    pub fn expected_generation_time(&self) -> Duration {
        match self.config.backend.kind {
            BackendKind::Mock => Duration::from_millis(self.config.mock.generation_latency_ms),
            BackendKind::Http => self.config.request_timeout(),
        }
    }

    // === Input ===

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Vec<Command> {
        match map_key(key, self.input_mode()) {
            Some(action) => self.handle_action(action, now),
            None => Vec::new(),
        }
    }

    pub fn handle_action(&mut self, action: Action, now: Instant) -> Vec<Command> {
        if action == Action::Quit {
            self.should_quit = true;
            return Vec::new();
        }
        if self.screen == Screen::Login {
            return self.login_action(action);
        }
        if self.show_help {
            if matches!(
                action,
                Action::Cancel | Action::Dismiss | Action::OpenHelp | Action::Confirm
            ) {
                self.show_help = false;
            }
            return Vec::new();
        }
        if self.input_mode() == InputMode::Editing {
            return match self.active_view {
                View::Agents if self.agents.editor.is_some() => self.agent_editor_action(action),
                View::Agents => self.search_action(action, now),
                View::Categories => self.category_editor_action(action),
                View::Generator => self.generator_editor_action(action, now),
                View::Dashboard | View::History => Vec::new(),
            };
        }

        match action {
            Action::OpenHelp => {
                self.show_help = true;
                Vec::new()
            }
            Action::NextView => self.switch_view(self.active_view.next()),
            Action::PrevView => self.switch_view(self.active_view.previous()),
            Action::SwitchView(index) => match View::from_index(index) {
                Some(view) => self.switch_view(view),
                None => Vec::new(),
            },
            Action::Retry => self.retry(),
            Action::ToggleOffline => {
                self.toggle_offline();
                Vec::new()
            }
            Action::Refresh => self
                .view_resources()
                .iter()
                .copied()
                .map(Command::Refresh)
                .collect(),
            Action::Logout => vec![Command::Logout],
            Action::Dismiss => {
                self.notifications.pop();
                Vec::new()
            }
            other => match self.active_view {
                View::Agents => self.agents_action(other, now),
                View::Categories => self.categories_action(other),
                View::Generator => self.generator_action(other, now),
                View::History => {
                    let total = self.generation_list().len();
                    move_selection(&mut self.history.scroll, other, total, 1);
                    Vec::new()
                }
                View::Dashboard => Vec::new(),
            },
        }
    }

    pub fn switch_view(&mut self, view: View) -> Vec<Command> {
        if view == self.active_view {
            return Vec::new();
        }
        debug!(from = ?self.active_view, to = ?view, "switching view");
        self.active_view = view;
        self.view_loads()
    }

    fn retry(&mut self) -> Vec<Command> {
        if self.boundary.reset() {
            return self.view_loads();
        }
        match self.last_failed.take() {
            Some(command) => {
                info!(command = command.label(), "retrying");
                if let Command::RunGeneration(_) = command {
                    self.generator.status = MutationStatus::Pending;
                    self.generator.started_at = Some(Instant::now());
                }
                vec![command]
            }
            None => self.view_loads(),
        }
    }

    fn toggle_offline(&mut self) {
        let Some(mock) = self.mock.clone() else {
            self.notify(
                NotificationLevel::Warning,
                "Offline mode is only available with the mock backend",
            );
            return;
        };
        let offline = !mock.is_offline();
        mock.set_offline(offline);
        if offline {
            warn!("mock backend switched offline");
            self.notify(NotificationLevel::Warning, "Backend offline: requests will fail");
        } else {
            info!("mock backend back online");
            self.notify(NotificationLevel::Info, "Backend online");
        }
    }

    // === Login ===

    fn login_action(&mut self, action: Action) -> Vec<Command> {
        if self.login.pending {
            return Vec::new();
        }
        match action {
            Action::Input(c) => self.login_field_mut().push(c),
            Action::Backspace => {
                self.login_field_mut().pop();
            }
            Action::NextField | Action::PrevField => self.login.focus = 1 - self.login.focus.min(1),
            Action::Confirm => return self.submit_login(),
            Action::Cancel => {
                self.login.errors = ValidationErrors::new();
                self.login.failure = None;
            }
            _ => {}
        }
        Vec::new()
    }

    fn login_field_mut(&mut self) -> &mut String {
        if self.login.focus == 0 {
            &mut self.login.email
        } else {
            &mut self.login.password
        }
    }

    fn submit_login(&mut self) -> Vec<Command> {
        self.login.failure = None;
        match validate_login(&self.login.email, &self.login.password) {
            Ok(()) => {
                self.login.errors = ValidationErrors::new();
                self.login.pending = true;
                vec![Command::Login(LoginRequest {
                    email: self.login.email.trim().to_string(),
                    password: self.login.password.clone(),
                })]
            }
            Err(errors) => {
                self.login.errors = errors;
                Vec::new()
            }
        }
    }

    // === Agents ===

    fn agents_action(&mut self, action: Action, now: Instant) -> Vec<Command> {
        let page = self.agent_page();
        let total = page.as_ref().map_or(0, |p| p.data.len());
        match action {
            Action::MoveUp | Action::MoveDown | Action::PageUp | Action::PageDown => {
                let before = self.agents.scroll.selected();
                move_selection(
                    &mut self.agents.scroll,
                    action,
                    total,
                    self.config.list.row_height,
                );
                if self.agents.scroll.selected() == before {
                    return Vec::new();
                }
                self.agents.update = MutationStatus::Idle;
                match self.selected_agent() {
                    Some(agent) => {
                        self.watch("agents.detail", keys::agent_detail(&agent.id));
                        vec![Command::LoadAgent(agent.id)]
                    }
                    None => Vec::new(),
                }
            }
            Action::NextPage | Action::PrevPage => {
                let current = self.agents.controller.current().page;
                let last = page.map_or(current, |p| p.total_pages.max(1));
                let next = if action == Action::NextPage {
                    (current + 1).min(last)
                } else {
                    current.saturating_sub(1).max(1)
                };
                self.agent_input(QueryInput::PageChanged(next), now)
            }
            Action::OpenSearch => {
                self.agents.searching = true;
                Vec::new()
            }
            Action::CycleStatusFilter => {
                let current = self.agents.controller.current().filter("status");
                let next = next_in_cycle(
                    AgentStatus::all().iter().map(|s| s.as_str().to_string()),
                    current,
                );
                self.agent_input(QueryInput::FilterSelected("status".into(), next), now)
            }
            Action::CycleCategoryFilter => {
                let current = self.agents.controller.current().filter("category");
                let slugs: Vec<String> = self.category_list().into_iter().map(|c| c.slug).collect();
                let next = next_in_cycle(slugs.into_iter(), current);
                self.agent_input(QueryInput::FilterSelected("category".into(), next), now)
            }
            Action::NextSortField => {
                let current = self
                    .agents
                    .controller
                    .current()
                    .sort
                    .as_ref()
                    .map(|s| s.field.as_str());
                let next = current
                    .and_then(|field| AGENT_SORT_FIELDS.iter().position(|f| *f == field))
                    .map_or(0, |i| (i + 1) % AGENT_SORT_FIELDS.len());
                self.agent_input(QueryInput::SortToggled(AGENT_SORT_FIELDS[next].into()), now)
            }
            Action::FlipSort => {
                let field = self
                    .agents
                    .controller
                    .current()
                    .sort
                    .as_ref()
                    .map_or(AGENT_SORT_FIELDS[0].to_string(), |s| s.field.clone());
                self.agent_input(QueryInput::SortToggled(field), now)
            }
            Action::ResetQuery => self.agent_input(QueryInput::Reset, now),
            Action::CycleAgentStatus => match self.selected_agent() {
                Some(agent) => {
                    let patch = fleetdeck_core::AgentPatch::status(agent.status.cycle());
                    self.agents.update = MutationStatus::Pending;
                    vec![Command::UpdateAgent {
                        id: agent.id,
                        patch,
                    }]
                }
                None => Vec::new(),
            },
            Action::EditItem | Action::Confirm => {
                if let Some(agent) = self.selected_agent() {
                    self.agents.editor = Some(AgentEditor::from_agent(&agent));
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn agent_input(&mut self, input: QueryInput, now: Instant) -> Vec<Command> {
        match self.agents.controller.handle(input, now) {
            Some(query) => self.agent_query_changed(query),
            None => Vec::new(),
        }
    }

    fn agent_query_changed(&mut self, query: Query) -> Vec<Command> {
        debug!(key = %query.cache_key(), "agent query changed");
        self.agents.scroll.reset();
        self.agents.update = MutationStatus::Idle;
        self.watches.remove("agents.detail");
        if self.active_view == View::Agents {
            self.watch("agents.list", keys::agent_list(&query));
        }
        vec![Command::LoadAgents(query)]
    }

    fn search_action(&mut self, action: Action, now: Instant) -> Vec<Command> {
        let mut text = self.agents.controller.search_text().to_string();
        match action {
            Action::Input(c) => text.push(c),
            Action::Backspace => {
                text.pop();
            }
            Action::Confirm => {
                self.agents.searching = false;
                return Vec::new();
            }
            Action::Cancel => {
                self.agents.searching = false;
                text.clear();
            }
            _ => return Vec::new(),
        }
        self.agent_input(QueryInput::SearchChanged(text), now)
    }

    fn agent_editor_action(&mut self, action: Action) -> Vec<Command> {
        let Some(editor) = self.agents.editor.as_mut() else {
            return Vec::new();
        };
        match action {
            Action::Input(c) => {
                let focus = editor.focus;
                editor.field_mut(focus).push(c);
            }
            Action::Backspace => {
                let focus = editor.focus;
                editor.field_mut(focus).pop();
            }
            Action::NextField => editor.focus = cycle(editor.focus, AGENT_EDIT_FIELDS.len(), true),
            Action::PrevField => editor.focus = cycle(editor.focus, AGENT_EDIT_FIELDS.len(), false),
            Action::Cancel => self.agents.editor = None,
            Action::Confirm => match validate_agent_edit(&editor.form) {
                Ok(patch) => {
                    let id = editor.agent_id.clone();
                    self.agents.editor = None;
                    self.agents.update = MutationStatus::Pending;
                    return vec![Command::UpdateAgent { id, patch }];
                }
                Err(errors) => editor.errors = errors,
            },
            _ => {}
        }
        Vec::new()
    }

    // === Categories ===

    fn categories_action(&mut self, action: Action) -> Vec<Command> {
        if let Some(id) = self.categories.confirm_delete.clone() {
            self.categories.confirm_delete = None;
            return match action {
                Action::Confirm => vec![Command::DeleteCategory(id)],
                _ => Vec::new(),
            };
        }
        let total = self.category_list().len();
        match action {
            Action::MoveUp | Action::MoveDown | Action::PageUp | Action::PageDown => {
                move_selection(&mut self.categories.scroll, action, total, 1);
            }
            Action::NewItem => self.categories.editor = Some(CategoryEditor::default()),
            Action::EditItem | Action::Confirm => {
                if let Some(category) = self.selected_category() {
                    self.categories.editor = Some(CategoryEditor::for_category(&category));
                }
            }
            Action::DeleteItem => {
                self.categories.confirm_delete = self.selected_category().map(|c| c.id);
            }
            _ => {}
        }
        Vec::new()
    }

    fn category_editor_action(&mut self, action: Action) -> Vec<Command> {
        let Some(editor) = self.categories.editor.as_mut() else {
            return Vec::new();
        };
        if editor.saving {
            return Vec::new();
        }
        match action {
            Action::Input(c) => {
                let focus = editor.focus;
                editor.field_mut(focus).push(c);
            }
            Action::Backspace => {
                let focus = editor.focus;
                editor.field_mut(focus).pop();
            }
            Action::NextField | Action::PrevField => editor.focus = 1 - editor.focus.min(1),
            Action::Cancel => self.categories.editor = None,
            Action::Confirm => match validate_category(&editor.name, &editor.description) {
                Ok(input) => {
                    editor.errors = ValidationErrors::new();
                    editor.failure = None;
                    editor.saving = true;
                    let command = match editor.id.clone() {
                        Some(id) => Command::UpdateCategory {
                            id,
                            input: UpdateCategoryInput {
                                name: Some(input.name),
                                description: Some(input.description),
                            },
                        },
                        None => Command::CreateCategory(input),
                    };
                    return vec![command];
                }
                Err(errors) => editor.errors = errors,
            },
            _ => {}
        }
        Vec::new()
    }

    // === Generator ===

    fn generator_action(&mut self, action: Action, now: Instant) -> Vec<Command> {
        match action {
            Action::EditItem | Action::NewItem => {
                self.prefill_generator();
                self.generator.editing = true;
                Vec::new()
            }
            Action::MoveDown => {
                self.generator.focus = cycle(self.generator.focus, GENERATOR_FIELDS.len(), true);
                Vec::new()
            }
            Action::MoveUp => {
                self.generator.focus = cycle(self.generator.focus, GENERATOR_FIELDS.len(), false);
                Vec::new()
            }
            Action::Confirm => self.submit_generation(now),
            _ => Vec::new(),
        }
    }

    fn generator_editor_action(&mut self, action: Action, now: Instant) -> Vec<Command> {
        let generator = &mut self.generator;
        match action {
            Action::Input(c) if generator.focus == 3 => match c {
                ' ' => generator.form.use_seed = !generator.form.use_seed,
                'y' | 'Y' => generator.form.use_seed = true,
                'n' | 'N' => generator.form.use_seed = false,
                _ => {}
            },
            Action::Input(c) => {
                let focus = generator.focus;
                if let Some(field) = generator.field_mut(focus) {
                    field.push(c);
                }
            }
            Action::Backspace => {
                let focus = generator.focus;
                if let Some(field) = generator.field_mut(focus) {
                    field.pop();
                }
            }
            Action::NextField => {
                generator.focus = cycle(generator.focus, GENERATOR_FIELDS.len(), true)
            }
            Action::PrevField => {
                generator.focus = cycle(generator.focus, GENERATOR_FIELDS.len(), false)
            }
            Action::Cancel => generator.editing = false,
            Action::Confirm => return self.submit_generation(now),
            _ => {}
        }
        Vec::new()
    }

    /// Fill empty category and template fields with the first known values.
    fn prefill_generator(&mut self) {
        if self.generator.form.category.is_empty() {
            if let Some(category) = self.category_list().first() {
                self.generator.form.category = category.slug.clone();
            }
        }
        if self.generator.form.template.is_empty() {
            let templates = self
                .store
                .cached::<TemplateListResponse>(&keys::template_list());
            if let Some(template) = templates.and_then(|t| t.data.into_iter().next()) {
                self.generator.form.template = slugify(&template.name);
            }
        }
    }

    fn submit_generation(&mut self, now: Instant) -> Vec<Command> {
        if self.generator.status.is_pending() {
            self.notify(NotificationLevel::Info, "A generation run is already in progress");
            return Vec::new();
        }
        match validate_generation(&self.generator.form) {
            Ok(params) => {
                self.generator.errors = ValidationErrors::new();
                self.generator.editing = false;
                self.generator.status = MutationStatus::Pending;
                self.generator.started_at = Some(now);
                vec![Command::RunGeneration(params)]
            }
            Err(errors) => {
                self.generator.errors = errors;
                Vec::new()
            }
        }
    }

    // === Outcomes ===

    pub fn handle_event(&mut self, event: TuiEvent, now: Instant) -> Vec<Command> {
        match event {
            TuiEvent::Input(key) => self.handle_key(key, now),
            TuiEvent::Settled(outcome) => self.apply_outcome(*outcome),
            TuiEvent::TaskPanicked { command, message } => {
                self.boundary.trip(Fault::new(command, message));
                if command == "run generation" {
                    self.generator.status = MutationStatus::Idle;
                    self.generator.started_at = None;
                }
                Vec::new()
            }
            TuiEvent::Tick => {
                self.on_tick();
                Vec::new()
            }
            TuiEvent::CacheChanged(_) | TuiEvent::Resize { .. } => Vec::new(),
        }
    }

    pub fn apply_outcome(&mut self, outcome: Outcome) -> Vec<Command> {
        match outcome {
            Outcome::Loaded { what, result } => {
                if let Err(error) = result {
                    warn!(what, status = error.status_code, "load failed");
                    let message = format!("Failed to load {}: {}", what, error.message);
                    self.notify_failure(message, None);
                } else if matches!(what, "categories" | "templates")
                    && self.active_view == View::Generator
                {
                    self.prefill_generator();
                }
                Vec::new()
            }
            Outcome::AgentUpdated { id, patch, result } => {
                match &result {
                    Ok(agent) => self.notify(
                        NotificationLevel::Success,
                        format!("Saved {} ({})", agent.name, agent.status),
                    ),
                    Err(error) => self.notify_failure(
                        format!("Could not update {}: {}", id, error.message),
                        Some(Command::UpdateAgent { id: id.clone(), patch }),
                    ),
                }
                self.agents.update = MutationStatus::from_result(result);
                Vec::new()
            }
            Outcome::CategorySaved(result) => {
                match result {
                    Ok(category) => {
                        self.categories.editor = None;
                        self.notify(
                            NotificationLevel::Success,
                            format!("Category {} saved", category.name),
                        );
                    }
                    Err(error) => {
                        if let Some(editor) = self.categories.editor.as_mut() {
                            editor.saving = false;
                            editor.failure = Some(error.message.clone());
                        }
                        let message = format!("Could not save category: {}", error.message);
                        self.notify_failure(message, None);
                    }
                }
                Vec::new()
            }
            Outcome::CategoryDeleted { id, result } => {
                match result {
                    Ok(_) => self.notify(NotificationLevel::Success, "Category deleted"),
                    Err(error) => self.notify_failure(
                        format!("Could not delete category: {}", error.message),
                        Some(Command::DeleteCategory(id)),
                    ),
                }
                Vec::new()
            }
            Outcome::GenerationFinished { params, result } => {
                self.generator.started_at = None;
                match &result {
                    Ok(run) => self.notify(
                        NotificationLevel::Success,
                        format!("Generated {} agents in {}", run.generated_count, run.id),
                    ),
                    Err(error) => self.notify_failure(
                        format!("Generation failed: {}", error.message),
                        Some(Command::RunGeneration(params)),
                    ),
                }
                self.generator.status = MutationStatus::from_result(result);
                Vec::new()
            }
            Outcome::LoggedIn(result) => {
                self.login.pending = false;
                match result {
                    Ok(response) => {
                        self.screen = Screen::Console;
                        self.login.password.clear();
                        self.notify(
                            NotificationLevel::Info,
                            format!("Signed in as {}", response.user.name),
                        );
                        self.view_loads()
                    }
                    Err(error) => {
                        self.login.failure = Some(error.message);
                        Vec::new()
                    }
                }
            }
            Outcome::LoggedOut => {
                self.watches.clear();
                self.screen = Screen::Login;
                self.last_failed = None;
                self.agents.editor = None;
                self.agents.scroll.reset();
                self.categories = CategoriesViewState::default();
                self.generator = GeneratorViewState::default();
                self.history = HistoryViewState::default();
                self.notify(NotificationLevel::Info, "Signed out");
                Vec::new()
            }
            Outcome::Refreshed {
                resource,
                invalidated,
            } => {
                debug!(resource, invalidated, "refreshed");
                Vec::new()
            }
        }
    }
}

fn cycle(focus: usize, len: usize, forward: bool) -> usize {
    if forward {
        (focus + 1) % len
    } else {
        (focus + len - 1) % len
    }
}

/// Next value after `current`; past the last value the filter is cleared.
fn next_in_cycle(values: impl Iterator<Item = String>, current: Option<&str>) -> Option<String> {
    let values: Vec<String> = values.collect();
    match current {
        None => values.into_iter().next(),
        Some(current) => {
            let index = values.iter().position(|v| v == current)?;
            values.into_iter().nth(index + 1)
        }
    }
}

fn move_selection(
    scroll: &mut ScrollState,
    action: Action,
    total: usize,
    item_height: u16,
) {
    let page = scroll.rows_per_page(item_height) as isize;
    let delta = match action {
        Action::MoveUp => -1,
        Action::MoveDown => 1,
        Action::PageUp => -page,
        Action::PageDown => page,
        _ => return,
    };
    scroll.move_by(delta, total);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_in_cycle_clears_after_last() {
        let values = || ["a", "b"].iter().map(|s| s.to_string());
        assert_eq!(next_in_cycle(values(), None), Some("a".into()));
        assert_eq!(next_in_cycle(values(), Some("a")), Some("b".into()));
        assert_eq!(next_in_cycle(values(), Some("b")), None);
        assert_eq!(next_in_cycle(values(), Some("zzz")), None);
    }

    #[test]
    fn test_focus_cycle_wraps() {
        assert_eq!(cycle(4, 5, true), 0);
        assert_eq!(cycle(0, 5, false), 4);
    }
}
