/// Editor keyboard shortcuts
///
/// Only listened for while an editor session is open; the app drops the
/// keyboard subscription together with the session.
use iced::keyboard::{self, key, Key, Modifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    /// Ctrl+S or Cmd+S
    Save,
    /// Escape: back to the photo list
    Cancel,
}

/// Map a key press to an editor shortcut
pub fn shortcut_for(key: &Key, modifiers: Modifiers) -> Option<Shortcut> {
    match key.as_ref() {
        keyboard::Key::Character(c)
            if c.eq_ignore_ascii_case("s") && (modifiers.control() || modifiers.logo()) =>
        {
            Some(Shortcut::Save)
        }
        keyboard::Key::Named(key::Named::Escape) => Some(Shortcut::Cancel),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character(c: &str) -> Key {
        Key::Character(c.into())
    }

    #[test]
    fn test_save_needs_ctrl_or_cmd() {
        assert_eq!(shortcut_for(&character("s"), Modifiers::CTRL), Some(Shortcut::Save));
        assert_eq!(shortcut_for(&character("S"), Modifiers::LOGO), Some(Shortcut::Save));
        assert_eq!(shortcut_for(&character("s"), Modifiers::empty()), None);
        assert_eq!(shortcut_for(&character("s"), Modifiers::ALT), None);
    }

    #[test]
    fn test_escape_cancels() {
        assert_eq!(
            shortcut_for(&Key::Named(key::Named::Escape), Modifiers::empty()),
            Some(Shortcut::Cancel)
        );
        assert_eq!(shortcut_for(&character("x"), Modifiers::CTRL), None);
    }
}
