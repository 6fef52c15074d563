//! Position, rotation and scale for game objects and draw contexts
//!
//! The model is a simplified 2D one: composition adds components instead of
//! multiplying matrices, and the rotation angle is stored but never applied
//! when painting.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::objects::ObjectId;

/// Transform component
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position in world space
    pub position: Vec3,
    /// Rotation angles; only `x` is driven by [`Transform::rotate_transform`]
    pub euler_angles: Vec3,
    /// Scale factor
    pub scale: Vec3,
    /// Object this transform is relative to
    #[serde(default)]
    pub parent: Option<ObjectId>,
}

impl Transform {
    /// Create a new transform at the origin
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transform with just a position
    #[must_use]
    pub fn from_position(position: Vec2) -> Self {
        Self {
            position: position.extend(0.0),
            ..Default::default()
        }
    }

    /// Attach to a parent object
    #[must_use]
    pub fn with_parent(mut self, parent: ObjectId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Planar position
    #[must_use]
    pub fn position_2d(&self) -> Vec2 {
        self.position.truncate()
    }

    /// Planar scale
    #[must_use]
    pub fn scale_2d(&self) -> Vec2 {
        self.scale.truncate()
    }

    /// Translate by a delta
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Translate by a delta expressed in the current scale
    pub fn translate_scaled(&mut self, delta: Vec2) {
        self.position.x += delta.x * self.scale.x;
        self.position.y += delta.y * self.scale.y;
    }

    /// Set the planar scale. Overwrites, never accumulates.
    pub fn scale_transform(&mut self, scale: Vec2) {
        self.scale.x = scale.x;
        self.scale.y = scale.y;
    }

    /// Set both planar axes to the same scale
    pub fn scale_uniform(&mut self, scale: f32) {
        self.scale_transform(Vec2::splat(scale));
    }

    /// Add to the rotation angle
    pub fn rotate_transform(&mut self, angle: f32) {
        self.euler_angles.x += angle;
    }

    /// Back to the identity transform. The parent link is kept.
    pub fn reset(&mut self) {
        self.reset_position();
        self.reset_scale();
        self.reset_rotation();
    }

    /// Move back to the origin
    pub fn reset_position(&mut self) {
        self.position = Vec3::ZERO;
    }

    /// Scale back to one
    pub fn reset_scale(&mut self) {
        self.scale = Vec3::ONE;
    }

    /// Clear the rotation
    pub fn reset_rotation(&mut self) {
        self.euler_angles = Vec3::ZERO;
    }

    /// Combine with `other` component-wise: positions, scales and angles are
    /// each added.
    pub fn multiply(&mut self, other: &Transform) {
        self.position += other.position;
        self.scale += other.scale;
        self.euler_angles += other.euler_angles;
    }

    /// Map a local point through position and scale
    #[must_use]
    pub fn apply(&self, point: Vec2) -> Vec2 {
        self.position_2d() + point * self.scale_2d()
    }

    /// Inverse of [`Transform::apply`]. Zero scale axes map to zero.
    #[must_use]
    pub fn apply_inverse(&self, point: Vec2) -> Vec2 {
        let scale = self.scale_2d();
        let local = point - self.position_2d();
        Vec2::new(
            if scale.x == 0.0 { 0.0 } else { local.x / scale.x },
            if scale.y == 0.0 { 0.0 } else { local.y / scale.y },
        )
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            euler_angles: Vec3::ZERO,
            scale: Vec3::ONE,
            parent: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let t = Transform::new();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.euler_angles, Vec3::ZERO);
        assert_eq!(t.scale, Vec3::ONE);
        assert!(t.parent.is_none());
    }

    #[test]
    fn test_translate_is_relative() {
        let mut t = Transform::from_position(Vec2::new(1.0, 2.0));
        t.translate(Vec3::new(1.0, 1.0, 1.0));
        t.translate(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(t.position, Vec3::new(3.0, 3.0, 1.0));
    }

    #[test]
    fn test_translate_scaled_uses_current_scale() {
        let mut t = Transform::new();
        t.scale_transform(Vec2::new(2.0, 3.0));
        t.translate_scaled(Vec2::new(1.0, 1.0));
        assert_eq!(t.position_2d(), Vec2::new(2.0, 3.0));
    }

    #[test]
    fn test_scale_transform_overwrites() {
        let mut t = Transform::new();
        t.scale_transform(Vec2::new(2.0, 2.0));
        t.scale_transform(Vec2::new(3.0, 0.5));
        assert_eq!(t.scale, Vec3::new(3.0, 0.5, 1.0));
    }

    #[test]
    fn test_reset_keeps_parent() {
        let mut t = Transform::from_position(Vec2::ONE).with_parent(ObjectId(4));
        t.rotate_transform(1.5);
        t.scale_uniform(4.0);
        t.reset();
        assert_eq!(t, Transform::new().with_parent(ObjectId(4)));
    }

    #[test]
    fn test_multiply_is_additive() {
        let mut a = Transform::from_position(Vec2::new(1.0, 1.0));
        a.rotate_transform(0.5);
        let b = Transform::from_position(Vec2::new(2.0, 3.0));
        a.multiply(&b);
        assert_eq!(a.position, Vec3::new(3.0, 4.0, 0.0));
        assert_eq!(a.scale, Vec3::splat(2.0));
        assert_eq!(a.euler_angles.x, 0.5);
    }

    #[test]
    fn test_apply_roundtrip() {
        let mut t = Transform::from_position(Vec2::new(10.0, 20.0));
        t.scale_uniform(2.0);
        let screen = t.apply(Vec2::new(3.0, -1.0));
        assert_eq!(screen, Vec2::new(16.0, 18.0));
        assert_eq!(t.apply_inverse(screen), Vec2::new(3.0, -1.0));
    }
}
