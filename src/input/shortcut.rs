#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutKey {
    Character(char),
    Enter,
    KeypadEnter,
    IsoEnter,
    Escape,
    Backspace,
    Space,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKey {
    /// Extend-selection key.
    Shift,
    /// Constrain-behaviour key.
    Control,
    Alt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShortcutModifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl ShortcutModifiers {
    pub const fn new(ctrl: bool, shift: bool) -> Self {
        Self {
            ctrl,
            shift,
            alt: false,
        }
    }

    pub const fn with(mut self, key: ModifierKey, pressed: bool) -> Self {
        match key {
            ModifierKey::Shift => self.shift = pressed,
            ModifierKey::Control => self.ctrl = pressed,
            ModifierKey::Alt => self.alt = pressed,
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    Commit,
    Undo,
    Redo,
    Cancel,
}

/// Option group a modifier key flips while the transform tool is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierToggle {
    /// Corner snap and every constrain flag.
    Constrain,
    /// Every from-pivot flag.
    FromPivot,
}

pub fn resolve_shortcut(key: ShortcutKey) -> Option<ShortcutAction> {
    match key {
        ShortcutKey::Enter | ShortcutKey::KeypadEnter | ShortcutKey::IsoEnter => {
            Some(ShortcutAction::Commit)
        }
        ShortcutKey::Backspace => Some(ShortcutAction::Undo),
        ShortcutKey::Space => Some(ShortcutAction::Redo),
        ShortcutKey::Escape => Some(ShortcutAction::Cancel),
        ShortcutKey::Character(_) => None,
    }
}

pub const fn resolve_modifier_toggle(key: ModifierKey) -> Option<ModifierToggle> {
    match key {
        ModifierKey::Shift => Some(ModifierToggle::Constrain),
        ModifierKey::Control => Some(ModifierToggle::FromPivot),
        ModifierKey::Alt => None,
    }
}
