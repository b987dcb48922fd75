//! FLEETDECK TUI entry point.

use fleetdeck_api::{ApiClient, FleetStore, HttpTransport, MockServer, SessionContext, Transport};
use fleetdeck_tui::commands;
use fleetdeck_tui::config::{BackendKind, TuiConfig};
use fleetdeck_tui::error::TuiError;
use fleetdeck_tui::events::TuiEvent;
use fleetdeck_tui::persistence;
use fleetdeck_tui::state::App;
use fleetdeck_tui::views;
use crossterm::{
    event::{self, Event as CrosstermEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let config = TuiConfig::load()?;
    init_logging(&config.log_path)?;
    info!(backend = ?config.backend.kind, "fleetdeck starting");

    let mut mock = None;
    let transport: Arc<dyn Transport> = match config.backend.kind {
        BackendKind::Mock => {
            let server = Arc::new(MockServer::new(config.mock_config()));
            mock = Some(server.clone());
            server
        }
        BackendKind::Http => {
            let base_url = config.backend.base_url.as_deref().unwrap_or_default();
            Arc::new(HttpTransport::new(base_url, config.request_timeout()).map_err(TuiError::from)?)
        }
    };
    let client = ApiClient::new(transport, SessionContext::new());
    let store = FleetStore::new(client, config.cache_config());

    let persisted = match persistence::load(&config.persistence_path) {
        Ok(state) => state,
        Err(err) => {
            warn!(error = %err, "ignoring unreadable UI state");
            None
        }
    };

    let (event_tx, mut event_rx) = mpsc::channel::<TuiEvent>(256);
    let mut app = App::new(config, store, mock, event_tx.clone(), persisted);

    let mut terminal = setup_terminal()?;
    let _guard = TerminalGuard;
    spawn_input_reader(event_tx.clone());
    for command in app.startup() {
        commands::spawn(app.store.clone(), command, event_tx.clone());
    }

    let tick_rate = Duration::from_millis(app.config.refresh_interval_ms);
    let mut ticker = tokio::time::interval(tick_rate);

    while !app.should_quit {
        terminal.draw(|f| views::render(f, &mut app))?;

        let far = Instant::now() + Duration::from_secs(3600);
        let deadline = app.debounce_deadline();
        let pending = tokio::select! {
            _ = ticker.tick() => app.handle_event(TuiEvent::Tick, Instant::now()),
            Some(event) = event_rx.recv() => app.handle_event(event, Instant::now()),
            _ = tokio::time::sleep_until(deadline.unwrap_or(far).into()), if deadline.is_some() => {
                app.poll_debounce(Instant::now())
            }
        };
        for command in pending {
            commands::spawn(app.store.clone(), command, event_tx.clone());
        }
    }

    if let Err(err) = persistence::save(&app.config.persistence_path, &app.persisted_state()) {
        error!(error = %err, "failed to save UI state");
    }
    info!("fleetdeck stopped");
    Ok(())
}

/// Log to a file; the terminal belongs to the UI.
fn init_logging(path: &Path) -> Result<(), TuiError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fleetdeck=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .try_init()
        .map_err(|e| TuiError::Logging(e.to_string()))?;

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        error!(%panic, "panic");
        default_hook(panic);
    }));
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, LeaveAlternateScreen);
    }
}

fn spawn_input_reader(sender: mpsc::Sender<TuiEvent>) {
    std::thread::spawn(move || loop {
        if let Ok(true) = event::poll(Duration::from_millis(200)) {
            if let Ok(evt) = event::read() {
                let sent = match evt {
                    CrosstermEvent::Key(key) => sender.blocking_send(TuiEvent::Input(key)),
                    CrosstermEvent::Resize(width, height) => {
                        sender.blocking_send(TuiEvent::Resize { width, height })
                    }
                    _ => Ok(()),
                };
                if sent.is_err() {
                    break;
                }
            }
        }
    });
}
