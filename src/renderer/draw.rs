//! Per-frame drawing state handed to every drawable

use glam::Vec2;

use crate::core::EngineEvent;
use crate::math::Rect;
use crate::objects::Transform;
use crate::renderer::{Bitmap, BitmapLock, BlendMode, FrameBufferError};

/// How a sprite's pixels are combined with the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transparency {
    /// Opaque; pixels are copied
    #[default]
    None,
    /// Partial alpha; real alpha compositing
    Semi,
    /// Binary transparency; the cheap averaging blend
    Has,
}

impl Transparency {
    /// Pixel combination used for this mode
    #[must_use]
    pub const fn blend_mode(self) -> BlendMode {
        match self {
            Self::None => BlendMode::Replace,
            Self::Semi => BlendMode::Composite,
            Self::Has => BlendMode::Average,
        }
    }
}

/// Locked frame buffer plus the transform and clock of the current frame
pub struct DrawContext<'a> {
    target: &'a Bitmap,
    surface: BitmapLock<'a>,
    transform: Transform,
    elapsed: f64,
    events: Vec<EngineEvent>,
}

impl<'a> DrawContext<'a> {
    /// Lock `target` for the duration of the context
    pub fn new(target: &'a Bitmap, transform: Transform, elapsed: f64) -> Self {
        Self {
            target,
            surface: target.lock(),
            transform,
            elapsed,
            events: Vec::new(),
        }
    }

    /// World-to-screen transform
    #[must_use]
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Replace the world-to-screen transform
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    /// Seconds since the engine started
    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Direct access to the frame pixels
    pub fn surface(&mut self) -> &mut BitmapLock<'a> {
        &mut self.surface
    }

    /// Map a world point to screen pixels
    #[must_use]
    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        self.transform.apply(world)
    }

    /// Draw `bitmap` with its top-left corner at `position` (world space).
    ///
    /// The bitmap is stretched with nearest-neighbour sampling when the
    /// transform scale is not one.
    pub fn draw_bitmap(
        &mut self,
        bitmap: &Bitmap,
        position: Vec2,
        transparency: Transparency,
    ) -> Result<(), FrameBufferError> {
        if bitmap.same_surface(self.target) {
            return Err(FrameBufferError::Aliased);
        }

        let origin = self.world_to_screen(position).floor();
        let scale = self.transform.scale_2d();
        let source = bitmap.lock();
        let size = if scale == Vec2::ONE {
            Vec2::new(source.width() as f32, source.height() as f32)
        } else {
            (Vec2::new(source.width() as f32, source.height() as f32) * scale).round()
        };

        // Off-screen (or degenerate) placements are culled before the
        // float-to-pixel casts saturate.
        let limit = Vec2::new(self.surface.width() as f32, self.surface.height() as f32);
        let end = origin + size;
        if !origin.is_finite()
            || !end.is_finite()
            || origin.x >= limit.x
            || origin.y >= limit.y
            || end.x <= 0.0
            || end.y <= 0.0
        {
            return Ok(());
        }

        let dst = Rect::new(origin.x as i32, origin.y as i32, size.x as i32, size.y as i32);
        let mode = transparency.blend_mode();
        if scale == Vec2::ONE {
            self.surface.draw_region(&source, source.bounds(), dst, mode);
        } else {
            self.surface.draw_scaled(&source, dst, mode);
        }
        Ok(())
    }

    /// Report an event from inside a paint call
    pub fn emit(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    /// Release the frame lock and return the collected events
    #[must_use]
    pub fn finish(self) -> Vec<EngineEvent> {
        self.events
    }
}
