//! Editor events.
//!
//! Everything the host feeds the editor arrives as one `EditorEvent`.
//! Pointer coordinates are screen pixels relative to the canvas.

use crate::mutation::MapMutation;

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// Primary button pressed.
    PointerDown { x: f64, y: f64 },

    PointerMove { x: f64, y: f64 },

    PointerUp { x: f64, y: f64 },

    /// Wheel over the canvas; `delta_y > 0` scrolls down (zoom out).
    Wheel { x: f64, y: f64, delta_y: f64 },

    Key {
        key: String,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
    },

    /// Start or finish drawing a river.
    ToggleRiver,

    /// Animation frame with the host's monotonic clock.
    Frame { now_ms: f64 },

    /// Canvas resized (CSS pixels).
    Resize { width: f64, height: f64 },

    /// A structural edit coming from outside the canvas (inspector, menus).
    MutationCommitted(MapMutation),
}

impl EditorEvent {
    pub fn key(key: &str) -> Self {
        Self::Key {
            key: key.to_owned(),
            ctrl: false,
            shift: false,
            alt: false,
            meta: false,
        }
    }

    pub fn ctrl_key(key: &str) -> Self {
        Self::Key {
            key: key.to_owned(),
            ctrl: true,
            shift: false,
            alt: false,
            meta: false,
        }
    }

    /// Extract position if this is a pointer event.
    pub fn position(&self) -> Option<(f64, f64)> {
        match self {
            Self::PointerDown { x, y }
            | Self::PointerMove { x, y }
            | Self::PointerUp { x, y }
            | Self::Wheel { x, y, .. } => Some((*x, *y)),
            _ => None,
        }
    }
}
