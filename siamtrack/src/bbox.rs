//! Bounding box representations and the conversions between them

use serde::{Deserialize, Serialize};
use std::fmt;

/// Box in corner form `(left, top, right, bottom)`
///
/// Callers keep `left <= right` and `top <= bottom`; nothing here checks it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CornerBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl CornerBox {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Convert to center form
    pub fn to_center(&self) -> CenterBox {
        CenterBox {
            cx: (self.left + self.right) / 2.0,
            cy: (self.top + self.bottom) / 2.0,
            width: self.width(),
            height: self.height(),
        }
    }

    /// Convert to `(left, top, width, height)`, the form trackers are initialised with
    pub fn to_ltwh(&self) -> Ltwh {
        Ltwh {
            left: self.left,
            top: self.top,
            width: self.width(),
            height: self.height(),
        }
    }

    /// Bounds array `[left, top, right, bottom]`
    pub fn to_bounds(&self) -> [f32; 4] {
        [self.left, self.top, self.right, self.bottom]
    }
}

impl From<[f32; 4]> for CornerBox {
    fn from(b: [f32; 4]) -> Self {
        Self::new(b[0], b[1], b[2], b[3])
    }
}

/// Box as `(left, top, width, height)`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Ltwh {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Ltwh {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn to_center(&self) -> CenterBox {
        CenterBox {
            cx: self.left + self.width / 2.0,
            cy: self.top + self.height / 2.0,
            width: self.width,
            height: self.height,
        }
    }
}

/// Box in center form `(cx, cy, width, height)`, as reported by tracker updates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CenterBox {
    pub cx: f32,
    pub cy: f32,
    pub width: f32,
    pub height: f32,
}

impl CenterBox {
    pub fn new(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self {
            cx,
            cy,
            width,
            height,
        }
    }

    /// Convert to corner form without rounding
    pub fn to_corner(&self) -> CornerBox {
        CornerBox {
            left: self.cx - self.width / 2.0,
            top: self.cy - self.height / 2.0,
            right: self.cx + self.width / 2.0,
            bottom: self.cy + self.height / 2.0,
        }
    }

    /// Convert to integer pixel corners for drawing
    ///
    /// Every coordinate is truncated toward zero, never rounded to nearest.
    pub fn to_pixel_box(&self) -> PixelBox {
        let corner = self.to_corner();
        PixelBox {
            left: corner.left as i32,
            top: corner.top as i32,
            right: corner.right as i32,
            bottom: corner.bottom as i32,
        }
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

/// Integer corner box in pixel coordinates (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl PixelBox {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }
}

impl fmt::Display for CornerBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}

impl fmt::Display for CenterBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CenterBox(cx={:.1}, cy={:.1}, w={:.1}, h={:.1})",
            self.cx, self.cy, self.width, self.height
        )
    }
}

impl fmt::Display for PixelBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) - ({}, {})",
            self.left, self.top, self.right, self.bottom
        )
    }
}
