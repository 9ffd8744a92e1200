//! Input events understood by the viewer.

use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Map a DOM `MouseEvent.button` code.
    pub fn from_dom(code: i16) -> Option<Self> {
        match code {
            0 => Some(MouseButton::Left),
            1 => Some(MouseButton::Middle),
            2 => Some(MouseButton::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Host-agnostic input. Positions are in physical (surface) pixels relative
/// to the canvas, y pointing down, matching `Viewport`. Hosts convert from
/// CSS pixels before dispatching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerEvent {
    PointerDown {
        position: Vec2,
        button: MouseButton,
        modifiers: Modifiers,
    },
    PointerMove {
        position: Vec2,
        modifiers: Modifiers,
    },
    PointerUp {
        position: Vec2,
        button: MouseButton,
    },
    /// Positive `delta_y` scrolls down, which zooms out.
    Wheel { delta_y: f32, modifiers: Modifiers },
    Resize { width: u32, height: u32 },
}
