mod shortcut;

pub use shortcut::{
    resolve_modifier_toggle, resolve_shortcut, ModifierKey, ModifierToggle, ShortcutAction,
    ShortcutKey, ShortcutModifiers,
};

use crate::geometry::Point;

/// Identifies the canvas view an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DisplayId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEventKind {
    PointerDown,
    PointerMove,
    PointerUp { cancelled: bool },
    KeyDown(ShortcutKey),
    ModifierChange { key: ModifierKey, pressed: bool },
}

/// Pointer and keyboard input routed to a transform session. Positions are
/// in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputEvent {
    pub kind: InputEventKind,
    pub display: DisplayId,
    pub position: Point,
    pub time: u32,
    pub modifiers: ShortcutModifiers,
}

impl InputEvent {
    pub fn new(kind: InputEventKind, display: DisplayId, position: Point) -> Self {
        Self {
            kind,
            display,
            position,
            time: 0,
            modifiers: ShortcutModifiers::default(),
        }
    }

    pub fn pointer_down(display: DisplayId, x: f64, y: f64) -> Self {
        Self::new(InputEventKind::PointerDown, display, Point::new(x, y))
    }

    pub fn pointer_move(display: DisplayId, x: f64, y: f64) -> Self {
        Self::new(InputEventKind::PointerMove, display, Point::new(x, y))
    }

    pub fn pointer_up(display: DisplayId, x: f64, y: f64) -> Self {
        Self::new(InputEventKind::PointerUp { cancelled: false }, display, Point::new(x, y))
    }

    pub fn pointer_cancel(display: DisplayId, x: f64, y: f64) -> Self {
        Self::new(InputEventKind::PointerUp { cancelled: true }, display, Point::new(x, y))
    }

    pub fn key(display: DisplayId, key: ShortcutKey) -> Self {
        Self::new(InputEventKind::KeyDown(key), display, Point::default())
    }

    pub fn modifier(display: DisplayId, key: ModifierKey, pressed: bool) -> Self {
        Self::new(InputEventKind::ModifierChange { key, pressed }, display, Point::default())
    }

    pub fn at_time(mut self, time: u32) -> Self {
        self.time = time;
        self
    }

    pub fn with_modifiers(mut self, modifiers: ShortcutModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}
