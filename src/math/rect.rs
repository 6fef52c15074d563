//! Integer pixel rectangles
//!
//! Used for frame buffer regions. Width and height may be zero or negative,
//! in which case the rectangle is empty and covers no pixels.

/// Axis-aligned pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width in pixels
    pub width: i32,
    /// Height in pixels
    pub height: i32,
}

impl Rect {
    /// Create a rectangle from its top-left corner and size
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle anchored at the origin
    #[must_use]
    pub const fn from_size(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Exclusive right edge, saturating at `i32::MAX`
    #[must_use]
    pub const fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge, saturating at `i32::MAX`
    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Returns true if the rectangle covers no pixels
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Check whether a pixel lies inside
    #[must_use]
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Check whether two rectangles share at least one pixel
    #[must_use]
    pub const fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Overlapping part of two rectangles, or an empty rectangle
    #[must_use]
    pub fn intersect(&self, other: &Rect) -> Rect {
        if !self.intersects(other) {
            return Rect::default();
        }
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        Rect::new(x, y, right - x, bottom - y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect_overlapping() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Rect::new(5, 5, 5, 5));
        assert_eq!(b.intersect(&a), Rect::new(5, 5, 5, 5));
    }

    #[test]
    fn test_touching_edges_do_not_intersect() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(10, 0, 10, 10);
        assert!(!a.intersects(&b));
        assert!(a.intersect(&b).is_empty());
    }

    #[test]
    fn test_empty_rect() {
        let empty = Rect::new(3, 3, 0, 5);
        assert!(empty.is_empty());
        assert!(!empty.intersects(&Rect::new(0, 0, 10, 10)));
    }

    #[test]
    fn test_edges_saturate_near_max() {
        let far = Rect::new(i32::MAX - 1, i32::MAX - 2, 4, 4);
        assert_eq!(far.right(), i32::MAX);
        assert_eq!(far.bottom(), i32::MAX);
        assert!(!far.intersects(&Rect::from_size(10, 10)));
        assert!(far.intersect(&Rect::from_size(10, 10)).is_empty());
    }

    #[test]
    fn test_contains() {
        let r = Rect::new(2, 2, 3, 3);
        assert!(r.contains(2, 2));
        assert!(r.contains(4, 4));
        assert!(!r.contains(5, 4));
        assert!(!r.contains(1, 2));
    }
}
