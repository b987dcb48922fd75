//! Event types for the TUI event loop.

use crossterm::event::KeyEvent;
use fleetdeck_core::CacheKey;

use crate::commands::Outcome;

#[derive(Debug, Clone)]
pub enum TuiEvent {
    Input(KeyEvent),
    Tick,
    Resize { width: u16, height: u16 },
    /// A watched cache entry changed.
    CacheChanged(CacheKey),
    /// A background command finished.
    Settled(Box<Outcome>),
    /// A background command panicked.
    TaskPanicked {
        command: &'static str,
        message: String,
    },
}
