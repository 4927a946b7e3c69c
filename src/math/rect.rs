//! Axis-aligned rectangle on the ground plane

use crate::core::types::Vec2;

/// Axis-aligned rectangle defined by min and max corners
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    /// Create rect from min and max corners
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Create rect from center and half-extents
    pub fn from_center_half_extent(center: Vec2, half_extent: Vec2) -> Self {
        Self {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    /// Square rect of side `size` centered on `center`
    pub fn from_center_size(center: Vec2, size: f32) -> Self {
        Self::from_center_half_extent(center, Vec2::splat(size * 0.5))
    }

    /// Get center point
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Get size (max - min)
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Check if point is inside rect (edges inclusive)
    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x &&
        p.y >= self.min.y && p.y <= self.max.y
    }

    /// Squared distance from `p` to the closest point of the rect.
    /// Zero when `p` is inside.
    pub fn distance_squared_to_point(&self, p: Vec2) -> f32 {
        let closest = p.clamp(self.min, self.max);
        closest.distance_squared(p)
    }

    /// Distance from `p` to the nearest edge, zero when inside
    pub fn distance_to_point(&self, p: Vec2) -> f32 {
        self.distance_squared_to_point(p).sqrt()
    }
}
