//! Key and toolbar vocabulary.
//!
//! Hosts translate their native keyboard events into [`KeyCombo`]s and
//! toolbar clicks into [`EditCommand`]s; the editor only ever sees these.

use smol_str::SmolStr;

/// A keyboard key, named after the DOM `KeyboardEvent.key` values the
/// editor cares about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A character key.
    Character(SmolStr),
    Enter,
    Backspace,
    Delete,
    Tab,
    Escape,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Home,
    End,
    Shift,
    Control,
    Alt,
    Meta,
    /// Anything else.
    Unidentified,
}

impl Key {
    pub fn character(s: impl Into<SmolStr>) -> Self {
        Self::Character(s.into())
    }

    /// Map a DOM `key` string.
    pub fn from_dom(name: &str) -> Self {
        match name {
            "Enter" => Self::Enter,
            "Backspace" => Self::Backspace,
            "Delete" => Self::Delete,
            "Tab" => Self::Tab,
            "Escape" => Self::Escape,
            "ArrowLeft" => Self::ArrowLeft,
            "ArrowRight" => Self::ArrowRight,
            "ArrowUp" => Self::ArrowUp,
            "ArrowDown" => Self::ArrowDown,
            "Home" => Self::Home,
            "End" => Self::End,
            "Shift" => Self::Shift,
            "Control" => Self::Control,
            "Alt" => Self::Alt,
            "Meta" => Self::Meta,
            s if s.chars().count() == 1 => Self::character(s),
            _ => Self::Unidentified,
        }
    }
}

/// Modifier key state for a key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        ctrl: false,
        alt: false,
        shift: true,
        meta: false,
    };

    pub const META: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: true,
    };

    /// Cmd on Mac, Ctrl elsewhere.
    pub fn primary(is_mac: bool) -> Self {
        if is_mac { Self::META } else { Self::CTRL }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyCombo {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn shift(key: Key) -> Self {
        Self::with_modifiers(key, Modifiers::SHIFT)
    }

    pub fn ctrl(key: Key) -> Self {
        Self::with_modifiers(key, Modifiers::CTRL)
    }

    pub fn meta(key: Key) -> Self {
        Self::with_modifiers(key, Modifiers::META)
    }
}

/// Result of handling a keydown event.
#[derive(Debug, Clone, PartialEq)]
pub enum KeydownResult {
    /// Event was handled, prevent default.
    Handled,
    /// Event was not a keybinding, let the host handle it.
    NotHandled,
    /// The editor recognized the key but wants the host's default behavior.
    PassThrough,
}

/// Inline formatting toggled around the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InlineStyle {
    Bold,
    Italic,
    Underline,
    Strikethrough,
}

impl InlineStyle {
    /// Tag written when the style is applied.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Bold => "strong",
            Self::Italic => "em",
            Self::Underline => "u",
            Self::Strikethrough => "s",
        }
    }

    /// Tags recognized as already carrying the style.
    pub fn matches_tag(self, tag: &str) -> bool {
        match self {
            Self::Bold => matches!(tag, "strong" | "b"),
            Self::Italic => matches!(tag, "em" | "i"),
            Self::Underline => tag == "u",
            Self::Strikethrough => matches!(tag, "s" | "strike" | "del"),
        }
    }
}

/// Block format picked from the toolbar's paragraph/heading menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockFormat {
    Paragraph,
    Heading(u8),
}

impl BlockFormat {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Paragraph => "p",
            Self::Heading(1) => "h1",
            Self::Heading(2) => "h2",
            Self::Heading(3) => "h3",
            Self::Heading(4) => "h4",
            Self::Heading(5) => "h5",
            Self::Heading(_) => "h6",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Bullet,
    Numbered,
}

impl ListKind {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Bullet => "ul",
            Self::Numbered => "ol",
        }
    }
}

/// Toolbar formatting commands, applied to the live selection in visual
/// mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditCommand {
    ToggleInline(InlineStyle),
    /// Text color, any CSS color value.
    ForeColor(String),
    /// Highlight (background) color.
    HiliteColor(String),
    /// Font size step, 1 (smallest) to 5.
    FontSize(u8),
    FormatBlock(BlockFormat),
    ToggleList(ListKind),
}

impl EditCommand {
    /// Default shortcut for a key combination, if any.
    pub fn for_combo(combo: &KeyCombo) -> Option<Self> {
        let m = combo.modifiers;
        if !(m.ctrl || m.meta) || m.alt || m.shift {
            return None;
        }
        let Key::Character(c) = &combo.key else {
            return None;
        };
        let style = match c.to_ascii_lowercase().as_str() {
            "b" => InlineStyle::Bold,
            "i" => InlineStyle::Italic,
            "u" => InlineStyle::Underline,
            _ => return None,
        };
        Some(Self::ToggleInline(style))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_from_dom() {
        assert_eq!(Key::from_dom("Enter"), Key::Enter);
        assert_eq!(Key::from_dom("a"), Key::character("a"));
        assert_eq!(Key::from_dom("あ"), Key::character("あ"));
        assert_eq!(Key::from_dom("F13"), Key::Unidentified);
    }

    #[test]
    fn test_shortcuts() {
        assert_eq!(
            EditCommand::for_combo(&KeyCombo::meta(Key::character("b"))),
            Some(EditCommand::ToggleInline(InlineStyle::Bold))
        );
        assert_eq!(
            EditCommand::for_combo(&KeyCombo::with_modifiers(
                Key::character("I"),
                Modifiers::primary(false)
            )),
            Some(EditCommand::ToggleInline(InlineStyle::Italic))
        );
        assert_eq!(EditCommand::for_combo(&KeyCombo::new(Key::character("b"))), None);
        assert_eq!(EditCommand::for_combo(&KeyCombo::ctrl(Key::Enter)), None);
    }
}
