//! Input abstraction layer.
//!
//! Normalizes mouse and pointer events from the host into a single
//! `InputEvent` enum. Coordinates are buffer pixels relative to the
//! surface's top-left corner (`offsetX`/`offsetY` in DOM terms).

use easel_core::Point;

/// A normalized pointer event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Button pressed over the surface.
    PointerDown { x: f32, y: f32 },

    /// Pointer moved over the surface, pressed or not.
    PointerMove { x: f32, y: f32 },

    /// Button released.
    PointerUp { x: f32, y: f32 },

    /// Pointer left the surface. Finalizes like a release.
    PointerLeave { x: f32, y: f32 },
}

impl InputEvent {
    pub fn from_pointer_down(x: f32, y: f32) -> Self {
        Self::PointerDown { x, y }
    }

    pub fn from_pointer_move(x: f32, y: f32) -> Self {
        Self::PointerMove { x, y }
    }

    pub fn from_pointer_up(x: f32, y: f32) -> Self {
        Self::PointerUp { x, y }
    }

    pub fn from_pointer_leave(x: f32, y: f32) -> Self {
        Self::PointerLeave { x, y }
    }

    pub fn position(&self) -> Point {
        match *self {
            Self::PointerDown { x, y }
            | Self::PointerMove { x, y }
            | Self::PointerUp { x, y }
            | Self::PointerLeave { x, y } => Point::new(x, y),
        }
    }

    /// Whether this event ends a gesture.
    pub fn is_release(&self) -> bool {
        matches!(self, Self::PointerUp { .. } | Self::PointerLeave { .. })
    }
}
