//! World-space bounding boxes and overlap tests

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned box in world units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum corner
    pub min: Vec2,
    /// Extent along each axis
    pub size: Vec2,
}

impl Bounds {
    /// Create bounds from a corner and a size
    #[must_use]
    pub const fn new(min: Vec2, size: Vec2) -> Self {
        Self { min, size }
    }

    /// Create bounds from two opposite corners in any order
    #[must_use]
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        let min = a.min(b);
        Self {
            min,
            size: a.max(b) - min,
        }
    }

    /// Maximum corner
    #[must_use]
    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }

    /// Center point
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.min + self.size * 0.5
    }

    /// Point containment, inclusive of the edges
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        let max = self.max();
        point.x >= self.min.x && point.x <= max.x && point.y >= self.min.y && point.y <= max.y
    }

    /// Box overlap test. Touching edges count as a collision.
    #[must_use]
    pub fn overlaps(&self, other: &Bounds) -> bool {
        let a_max = self.max();
        let b_max = other.max();
        self.min.x <= b_max.x
            && a_max.x >= other.min.x
            && self.min.y <= b_max.y
            && a_max.y >= other.min.y
    }
}
