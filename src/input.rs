//! Key bindings: normal and vim-style.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press. All placement gestures reduce to Place/Undo on
/// the round; cursor and candidate selection live in the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CursorLeft,
    CursorRight,
    PrevCandidate,
    NextCandidate,
    Place,
    Undo,
    Speak,
    NewRound,
    Quit,
    None,
}

/// Map key event to game action. Supports both normal (arrows, enter) and vim (hjkl).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Left | KeyCode::Char('h') => Action::CursorLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::CursorRight,
        KeyCode::Up | KeyCode::Char('k') => Action::PrevCandidate,
        KeyCode::Down | KeyCode::Char('j') => Action::NextCandidate,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Place,
        KeyCode::Char('u') => Action::Undo,
        KeyCode::Char('s') => Action::Speak,
        KeyCode::Char('r') => Action::NewRound,
        _ => Action::None,
    }
}
