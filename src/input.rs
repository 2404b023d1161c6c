//! Key bindings: normal and vim-style.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    /// Pick up the selected piece, or drop it when already dragging.
    Confirm,
    /// Return a dragged piece to the tray / back out of an overlay.
    Cancel,
    /// Cycle tray selection.
    NextPiece,
    PrevPiece,
    Pause,
    Quit,
    None,
}

/// Map key event to game action. Supports both normal (arrows, space) and vim (hjkl).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod && modifiers != KeyModifiers::CONTROL {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') if no_mod => Action::Quit,
        KeyCode::Esc if no_mod => Action::Cancel,
        KeyCode::Char('p') | KeyCode::Char(' ') if modifiers == KeyModifiers::CONTROL => {
            Action::Pause
        }
        KeyCode::Char('p') if no_mod => Action::Pause,
        KeyCode::Left | KeyCode::Char('h') if no_mod => Action::MoveLeft,
        KeyCode::Right | KeyCode::Char('l') if no_mod => Action::MoveRight,
        KeyCode::Up | KeyCode::Char('k') if no_mod => Action::MoveUp,
        KeyCode::Down | KeyCode::Char('j') if no_mod => Action::MoveDown,
        KeyCode::Tab if no_mod => Action::NextPiece,
        KeyCode::BackTab => Action::PrevPiece,
        KeyCode::Enter | KeyCode::Char(' ') if no_mod => Action::Confirm,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_arrows_and_vim_agree() {
        assert_eq!(key_to_action(press(KeyCode::Left)), Action::MoveLeft);
        assert_eq!(key_to_action(press(KeyCode::Char('h'))), Action::MoveLeft);
        assert_eq!(key_to_action(press(KeyCode::Down)), Action::MoveDown);
        assert_eq!(key_to_action(press(KeyCode::Char('j'))), Action::MoveDown);
    }

    #[test]
    fn test_confirm_and_cancel() {
        assert_eq!(key_to_action(press(KeyCode::Enter)), Action::Confirm);
        assert_eq!(key_to_action(press(KeyCode::Char(' '))), Action::Confirm);
        assert_eq!(key_to_action(press(KeyCode::Esc)), Action::Cancel);
    }

    #[test]
    fn test_modified_keys_ignored() {
        let ev = KeyEvent::new(KeyCode::Char('h'), KeyModifiers::ALT);
        assert_eq!(key_to_action(ev), Action::None);
    }
}
