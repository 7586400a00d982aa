use std::str::FromStr;
use std::time::Duration;

use crate::foundation::error::{FlipbookError, FlipbookResult};
use crate::foundation::math::{premul_channel, unpremul_channel};

pub use kurbo::{Affine, Point, Rect, Vec2};

/// Canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CanvasSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl CanvasSize {
    /// Create a validated, non-empty canvas size.
    pub fn new(width: u32, height: u32) -> FlipbookResult<Self> {
        if width == 0 || height == 0 {
            return Err(FlipbookError::validation(
                "canvas width/height must be non-zero",
            ));
        }
        Ok(Self { width, height })
    }

    /// Number of pixels covered by the canvas.
    pub fn pixel_count(self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Canvas bounds as a rectangle anchored at the origin.
    pub fn bounds(self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }
}

/// Straight-alpha RGBA8 color, the form used by tool settings and backgrounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8 {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    /// Opaque white.
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    /// Create a color from straight-alpha channels.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color.
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Convert to a premultiplied pixel as stored in a [`crate::Bitmap`].
    pub fn to_premul(self) -> [u8; 4] {
        [
            premul_channel(self.r, self.a),
            premul_channel(self.g, self.a),
            premul_channel(self.b, self.a),
            self.a,
        ]
    }

    /// Convert a premultiplied pixel back to straight alpha.
    pub fn from_premul(px: [u8; 4]) -> Self {
        let a = px[3];
        Self::new(
            unpremul_channel(px[0], a),
            unpremul_channel(px[1], a),
            unpremul_channel(px[2], a),
            a,
        )
    }

    /// Format as `#rrggbbaa`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

impl FromStr for Rgba8 {
    type Err = FlipbookError;

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (leading `#` optional).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let bad = || FlipbookError::validation(format!("invalid hex color '{s}'"));
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2).ok_or_else(bad)?, 16).map_err(|_| bad());
        match hex.len() {
            3 => {
                let nib = |i: usize| {
                    u8::from_str_radix(hex.get(i..i + 1).ok_or_else(bad)?, 16)
                        .map(|v| v * 17)
                        .map_err(|_| bad())
                };
                Ok(Self::opaque(nib(0)?, nib(1)?, nib(2)?))
            }
            6 => Ok(Self::opaque(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Self::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => Err(bad()),
        }
    }
}

/// Presentation interval of one frame: `1000 / fps` milliseconds.
pub fn frame_interval(fps: u32) -> Duration {
    Duration::from_micros((1_000_000.0 / f64::from(fps.max(1))).round() as u64)
}

/// Rotate `v` by `degrees` (screen convention: positive is clockwise with y pointing down).
///
/// Whole quarter turns are exact.
pub fn rotate_vec(v: Vec2, degrees: f64) -> Vec2 {
    let quarters = degrees / 90.0;
    let (sin, cos) = if quarters.fract() == 0.0 {
        match quarters.rem_euclid(4.0) as u8 {
            0 => (0.0, 1.0),
            1 => (1.0, 0.0),
            2 => (0.0, -1.0),
            _ => (-1.0, 0.0),
        }
    } else {
        degrees.to_radians().sin_cos()
    };
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
