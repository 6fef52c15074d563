//! Software rendering module
//!
//! Frame buffers, the camera, sprites and the priority-bucketed rendering
//! queue that composites them every frame.

mod bitmap;
mod camera;
mod color;
mod draw;
mod drawable;
mod queue;
mod sprite;

pub use bitmap::{Bitmap, BitmapLock, BlendMode, FrameBufferError};
pub use camera::{Camera, CameraError, CameraSnapshot, CameraState, Cameras, SNAP_EPSILON, UNBOUNDED};
pub use color::Color;
pub use draw::{DrawContext, Transparency};
pub use drawable::{Drawable, MAX_PRIORITY, PRIORITY_LEVELS, Paintable, SharedDrawable};
pub use queue::{QueueHandle, RenderReport, RenderingQueue};
pub use sprite::{MAX_ANIMATION_FPS, Sprite, SpriteError, SpriteHandle};
