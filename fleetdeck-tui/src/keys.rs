//! Keybinding definitions for the TUI.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Whether keystrokes navigate or type into a focused text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    NextView,
    PrevView,
    SwitchView(usize),
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    NextPage,
    PrevPage,
    OpenSearch,
    CycleStatusFilter,
    CycleCategoryFilter,
    NextSortField,
    FlipSort,
    ResetQuery,
    CycleAgentStatus,
    NewItem,
    EditItem,
    DeleteItem,
    Retry,
    ToggleOffline,
    Refresh,
    Logout,
    OpenHelp,
    Dismiss,
    Confirm,
    Cancel,
    NextField,
    PrevField,
    Input(char),
    Backspace,
}

pub fn map_key(event: KeyEvent, mode: InputMode) -> Option<Action> {
    let KeyEvent {
        code, modifiers, ..
    } = event;

    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Some(Action::Quit),
            KeyCode::Char('r') => Some(Action::Refresh),
            _ => None,
        };
    }

    if mode == InputMode::Editing {
        return match code {
            KeyCode::Enter => Some(Action::Confirm),
            KeyCode::Esc => Some(Action::Cancel),
            KeyCode::Tab | KeyCode::Down => Some(Action::NextField),
            KeyCode::BackTab | KeyCode::Up => Some(Action::PrevField),
            KeyCode::Backspace => Some(Action::Backspace),
            KeyCode::Char(c) => Some(Action::Input(c)),
            _ => None,
        };
    }

    match code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('?') => Some(Action::OpenHelp),
        KeyCode::Char('/') => Some(Action::OpenSearch),
        KeyCode::Char('f') => Some(Action::CycleStatusFilter),
        KeyCode::Char('c') => Some(Action::CycleCategoryFilter),
        KeyCode::Char('s') => Some(Action::NextSortField),
        KeyCode::Char('o') => Some(Action::FlipSort),
        KeyCode::Char('r') => Some(Action::ResetQuery),
        KeyCode::Char('t') => Some(Action::CycleAgentStatus),
        KeyCode::Char('n') => Some(Action::NewItem),
        KeyCode::Char('e') => Some(Action::EditItem),
        KeyCode::Char('d') => Some(Action::DeleteItem),
        KeyCode::Char('R') => Some(Action::Retry),
        KeyCode::Char('O') => Some(Action::ToggleOffline),
        KeyCode::Char('L') => Some(Action::Logout),
        KeyCode::Char('x') => Some(Action::Dismiss),
        KeyCode::Char(']') => Some(Action::NextPage),
        KeyCode::Char('[') => Some(Action::PrevPage),
        KeyCode::Enter => Some(Action::Confirm),
        KeyCode::Esc => Some(Action::Cancel),
        KeyCode::Tab => Some(Action::NextView),
        KeyCode::BackTab => Some(Action::PrevView),
        KeyCode::Up | KeyCode::Char('k') => Some(Action::MoveUp),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::MoveDown),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::Char(c @ '1'..='5') => Some(Action::SwitchView(c as usize - '1' as usize)),
        _ => None,
    }
}
