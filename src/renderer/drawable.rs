//! Drawable and paintable contracts
//!
//! [`Drawable`] is what the rendering queue calls each frame. [`Paintable`]
//! is the user-facing side: a shared handle that can put itself into a queue
//! and take itself out again.

use std::sync::{Arc, Mutex};

use crate::input::MouseClick;
use crate::math::Bounds;
use crate::renderer::{DrawContext, FrameBufferError, QueueHandle};

/// Number of priority levels
pub const PRIORITY_LEVELS: usize = 5;

/// Largest valid priority value
pub const MAX_PRIORITY: u8 = (PRIORITY_LEVELS - 1) as u8;

/// Anything the rendering queue can paint
pub trait Drawable: Send {
    /// Stable id, unique among drawables
    fn id(&self) -> u64;

    /// Paint bucket, `0..=MAX_PRIORITY`; lower values are painted first
    fn priority(&self) -> u8;

    /// Invisible drawables stay queued but are skipped when painting
    fn is_visible(&self) -> bool;

    /// World-space area used for click hit tests
    fn bounds(&self) -> Bounds;

    /// Paint into the frame
    fn paint(&mut self, ctx: &mut DrawContext<'_>) -> Result<(), FrameBufferError>;

    /// A click landed inside [`Drawable::bounds`]
    fn on_click(&mut self, _click: &MouseClick) {}
}

/// Drawable shared between its owner and a rendering queue
pub type SharedDrawable = Arc<Mutex<dyn Drawable>>;

/// Show/hide/invalidate contract of user-facing drawable handles
pub trait Paintable {
    /// Error returned when the drawable cannot be shown
    type Error;

    /// Stage the drawable for addition to `queue`. Showing twice is a no-op.
    fn show(&self, queue: &QueueHandle) -> Result<(), Self::Error>;

    /// Stage removal from the queue it was shown in. Returns false if hidden.
    fn hide(&self) -> bool;

    /// Whether the drawable is currently shown
    fn is_shown(&self) -> bool;

    /// Drop cached render state so the next paint rebuilds it
    fn invalidate(&self);
}
