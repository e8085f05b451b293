//! Input abstraction layer.
//!
//! Normalizes mouse, touch and stylus events into a unified `InputEvent`
//! consumed by tools. Coordinates are canvas space.

use kurbo::Point;

/// A normalized input event from any pointing device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed (mouse down, touch start, pen contact).
    PointerDown {
        x: f64,
        y: f64,
        /// Pressure from 0.0 (none) to 1.0 (max). Mouse is always 1.0.
        pressure: f32,
    },

    PointerMove { x: f64, y: f64, pressure: f32 },

    PointerUp { x: f64, y: f64 },
}

impl InputEvent {
    pub fn down(x: f64, y: f64) -> Self {
        Self::PointerDown { x, y, pressure: 1.0 }
    }

    pub fn moved(x: f64, y: f64) -> Self {
        Self::PointerMove { x, y, pressure: 1.0 }
    }

    pub fn up(x: f64, y: f64) -> Self {
        Self::PointerUp { x, y }
    }

    pub fn position(&self) -> Point {
        match *self {
            Self::PointerDown { x, y, .. } | Self::PointerMove { x, y, .. } | Self::PointerUp { x, y } => {
                Point::new(x, y)
            }
        }
    }
}
