#![forbid(unsafe_code)]

//! Canonical input event types.
//!
//! The host (browser shim, terminal adapter, test harness) converts its
//! native input into these types before handing them to the runtime.
//!
//! # Design Notes
//!
//! - Pointer coordinates are page-space CSS pixels.
//! - `movement` mirrors the browser's `movementX/Y`. Hosts that cannot
//!   provide it leave it `None`; the gesture recognizer then falls back to
//!   differencing absolute positions.
//! - Button codes follow the DOM numbering (`0` = primary, `-1` = none).

use crate::geometry::Vec2;

/// Canonical input event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A pointer (mouse, pen, touch) event.
    Pointer(PointerEvent),

    /// A keyboard event.
    Key(KeyEvent),
}

/// Identifier of an interactive element owned by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u32);

/// Pointer lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventKind {
    Down,
    Move,
    Up,
    Cancel,
}

/// Which button changed state for a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// No button change (typical for moves).
    None,
    /// Left mouse / primary touch contact.
    Primary,
    /// Wheel / middle button.
    Auxiliary,
    /// Right mouse button.
    Secondary,
    /// Any other DOM button code.
    Other(i16),
}

impl PointerButton {
    /// Map a DOM `PointerEvent.button` code.
    #[must_use]
    pub const fn from_code(code: i16) -> Self {
        match code {
            -1 => Self::None,
            0 => Self::Primary,
            1 => Self::Auxiliary,
            2 => Self::Secondary,
            other => Self::Other(other),
        }
    }

    /// The DOM button code.
    #[must_use]
    pub const fn code(self) -> i16 {
        match self {
            Self::None => -1,
            Self::Primary => 0,
            Self::Auxiliary => 1,
            Self::Secondary => 2,
            Self::Other(code) => code,
        }
    }
}

/// A pointer event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub pointer_id: u32,
    pub button: PointerButton,
    /// Absolute page position.
    pub position: Vec2,
    /// Native per-event movement, when the host provides it.
    pub movement: Option<Vec2>,
    /// Element the event was dispatched on, if any.
    pub target: Option<ElementId>,
}

impl PointerEvent {
    /// Create an event of `kind` for `pointer_id` at `position`.
    ///
    /// Down events default to the primary button; all others to `None`.
    #[must_use]
    pub fn new(kind: PointerEventKind, pointer_id: u32, position: Vec2) -> Self {
        let button = match kind {
            PointerEventKind::Down | PointerEventKind::Up => PointerButton::Primary,
            PointerEventKind::Move | PointerEventKind::Cancel => PointerButton::None,
        };
        Self {
            kind,
            pointer_id,
            button,
            position,
            movement: None,
            target: None,
        }
    }

    #[must_use]
    pub fn down(pointer_id: u32, position: Vec2) -> Self {
        Self::new(PointerEventKind::Down, pointer_id, position)
    }

    #[must_use]
    pub fn moved(pointer_id: u32, position: Vec2) -> Self {
        Self::new(PointerEventKind::Move, pointer_id, position)
    }

    #[must_use]
    pub fn up(pointer_id: u32, position: Vec2) -> Self {
        Self::new(PointerEventKind::Up, pointer_id, position)
    }

    #[must_use]
    pub fn cancel(pointer_id: u32, position: Vec2) -> Self {
        Self::new(PointerEventKind::Cancel, pointer_id, position)
    }

    /// Attach native movement deltas.
    #[must_use]
    pub const fn with_movement(mut self, movement: Vec2) -> Self {
        self.movement = Some(movement);
        self
    }

    /// Attach the dispatch target.
    #[must_use]
    pub const fn with_target(mut self, target: ElementId) -> Self {
        self.target = Some(target);
        self
    }

    /// Override the button.
    #[must_use]
    pub const fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }
}

/// Logical key identifier (DOM `KeyboardEvent.code` subset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KeyCode {
    Space,
    Enter,
    Escape,
    Tab,
    Char(char),
}

/// Press, auto-repeat, or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyEventKind {
    #[default]
    Press,
    Repeat,
    Release,
}

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub kind: KeyEventKind,
}

impl KeyEvent {
    #[must_use]
    pub const fn press(code: KeyCode) -> Self {
        Self {
            code,
            kind: KeyEventKind::Press,
        }
    }

    #[must_use]
    pub const fn release(code: KeyCode) -> Self {
        Self {
            code,
            kind: KeyEventKind::Release,
        }
    }

    #[must_use]
    pub const fn repeat(code: KeyCode) -> Self {
        Self {
            code,
            kind: KeyEventKind::Repeat,
        }
    }

    /// Press and auto-repeat both count as "key down".
    #[must_use]
    pub const fn is_down(&self) -> bool {
        matches!(self.kind, KeyEventKind::Press | KeyEventKind::Repeat)
    }
}

impl From<PointerEvent> for Event {
    fn from(event: PointerEvent) -> Self {
        Self::Pointer(event)
    }
}

impl From<KeyEvent> for Event {
    fn from(event: KeyEvent) -> Self {
        Self::Key(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_codes_round_trip() {
        for code in -1..6 {
            assert_eq!(PointerButton::from_code(code).code(), code);
        }
        assert_eq!(PointerButton::from_code(0), PointerButton::Primary);
        assert_eq!(PointerButton::from_code(2), PointerButton::Secondary);
    }

    #[test]
    fn constructors_pick_default_buttons() {
        let down = PointerEvent::down(1, Vec2::ZERO);
        assert_eq!(down.button, PointerButton::Primary);
        let moved = PointerEvent::moved(1, Vec2::ZERO);
        assert_eq!(moved.button, PointerButton::None);
        assert!(moved.movement.is_none());
    }

    #[test]
    fn builder_attaches_fields() {
        let ev = PointerEvent::moved(3, Vec2::new(1.0, 2.0))
            .with_movement(Vec2::new(4.0, 0.0))
            .with_target(ElementId(9));
        assert_eq!(ev.movement, Some(Vec2::new(4.0, 0.0)));
        assert_eq!(ev.target, Some(ElementId(9)));
    }

    #[test]
    fn key_down_includes_repeat() {
        assert!(KeyEvent::press(KeyCode::Space).is_down());
        assert!(KeyEvent::repeat(KeyCode::Space).is_down());
        assert!(!KeyEvent::release(KeyCode::Space).is_down());
    }
}
