use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Keys the navigation state machine reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Up,
    Down,
    Left,
    Right,
    Tab,
    BackTab,
    Enter,
    Space,
    Escape,
    Home,
    End,
    Other,
}

/// Check if key is an escape key (Esc or Ctrl+[)
pub fn is_escape(key: &KeyEvent) -> bool {
    key.code == KeyCode::Esc
        || (key.code == KeyCode::Char('[') && key.modifiers.contains(KeyModifiers::CONTROL))
}

impl From<KeyEvent> for NavKey {
    fn from(key: KeyEvent) -> Self {
        if is_escape(&key) {
            return NavKey::Escape;
        }
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        match key.code {
            KeyCode::Up => NavKey::Up,
            KeyCode::Down => NavKey::Down,
            KeyCode::Left => NavKey::Left,
            KeyCode::Right => NavKey::Right,
            KeyCode::Tab if shift => NavKey::BackTab,
            KeyCode::Tab => NavKey::Tab,
            KeyCode::BackTab => NavKey::BackTab,
            KeyCode::Enter => NavKey::Enter,
            KeyCode::Char(' ') => NavKey::Space,
            KeyCode::Home => NavKey::Home,
            KeyCode::End => NavKey::End,
            _ => NavKey::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> NavKey {
        NavKey::from(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn test_shift_tab_is_back_tab() {
        assert_eq!(key(KeyCode::Tab, KeyModifiers::SHIFT), NavKey::BackTab);
        assert_eq!(key(KeyCode::BackTab, KeyModifiers::SHIFT), NavKey::BackTab);
        assert_eq!(key(KeyCode::Tab, KeyModifiers::NONE), NavKey::Tab);
    }

    #[test]
    fn test_escape_variants() {
        assert_eq!(key(KeyCode::Esc, KeyModifiers::NONE), NavKey::Escape);
        assert_eq!(key(KeyCode::Char('['), KeyModifiers::CONTROL), NavKey::Escape);
        assert_eq!(key(KeyCode::Char('['), KeyModifiers::NONE), NavKey::Other);
    }

    #[test]
    fn test_space_and_arrows() {
        assert_eq!(key(KeyCode::Char(' '), KeyModifiers::NONE), NavKey::Space);
        assert_eq!(key(KeyCode::Left, KeyModifiers::NONE), NavKey::Left);
        assert_eq!(key(KeyCode::Char('x'), KeyModifiers::NONE), NavKey::Other);
    }
}
