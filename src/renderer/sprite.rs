//! Sprites: positioned, prioritized bitmaps with optional frame animation

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use glam::Vec2;
use thiserror::Error;

use crate::core::EngineEvent;
use crate::input::MouseClick;
use crate::math::Bounds;
use crate::renderer::{
    Bitmap, DrawContext, Drawable, FrameBufferError, MAX_PRIORITY, Paintable, QueueHandle,
    SharedDrawable, Transparency,
};

/// Global counter for sprite ids
static NEXT_SPRITE_ID: AtomicU64 = AtomicU64::new(1);

/// Fastest supported animation rate
pub const MAX_ANIMATION_FPS: u32 = 1000;

/// Errors raised by sprite configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpriteError {
    /// Priority above [`MAX_PRIORITY`]
    #[error("priority must be between 0 and {MAX_PRIORITY}, got {0}")]
    InvalidPriority(u8),
    /// Priority changes require the sprite to be hidden
    #[error("cannot change priority while the sprite is shown")]
    PriorityWhileShown,
    /// Frame rate outside `1..=MAX_ANIMATION_FPS`
    #[error("animation fps must be between 1 and {MAX_ANIMATION_FPS}, got {0}")]
    InvalidFrameRate(u32),
    /// Animations need at least one frame
    #[error("animation has no frames")]
    NoFrames,
}

type ClickCallback = Box<dyn FnMut(&MouseClick) + Send>;
type AnimationEndCallback = Box<dyn FnMut(u64) + Send>;

#[derive(Debug)]
struct Animation {
    frames: Vec<Bitmap>,
    /// Next frame to show
    next: usize,
    interval_ms: f64,
    looping: bool,
    playing: bool,
    last_switch_ms: Option<f64>,
}

enum Step {
    Idle,
    Frame(Bitmap),
    Ended,
}

impl Animation {
    fn step(&mut self, now_ms: f64) -> Step {
        if !self.playing {
            return Step::Idle;
        }
        let Some(last) = self.last_switch_ms else {
            self.last_switch_ms = Some(now_ms);
            return Step::Idle;
        };
        if now_ms - last < self.interval_ms {
            return Step::Idle;
        }
        if self.next >= self.frames.len() {
            if !self.looping {
                self.playing = false;
                return Step::Ended;
            }
            self.next = 0;
        }
        let frame = self.frames[self.next].clone();
        self.next += 1;
        self.last_switch_ms = Some(now_ms);
        Step::Frame(frame)
    }
}

/// Sprite state readable without locking the sprite.
///
/// Click and animation-end callbacks run while the queue holds the sprite
/// lock, so everything [`SpriteHandle`] touches for show/hide lives here.
#[derive(Debug)]
struct Shared {
    id: u64,
    priority: AtomicU8,
    /// Image must be rebuilt before the next paint
    dirty: AtomicBool,
    shown: Mutex<Option<QueueHandle>>,
}

impl Shared {
    fn shown(&self) -> MutexGuard<'_, Option<QueueHandle>> {
        self.shown.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A bitmap placed in the world
pub struct Sprite {
    shared: Arc<Shared>,
    name: String,
    tag: String,
    position: Vec2,
    size: Vec2,
    /// Image as supplied, before resizing
    source: Bitmap,
    /// Image painted each frame, matching `size`
    image: Bitmap,
    visible: bool,
    transparency: Transparency,
    animation: Option<Animation>,
    on_click: Option<ClickCallback>,
    on_animation_end: Option<AnimationEndCallback>,
}

impl Sprite {
    /// Priority given to new sprites
    pub const DEFAULT_PRIORITY: u8 = 0;

    /// Create a sprite the size of its image
    #[must_use]
    pub fn new(position: Vec2, image: Bitmap) -> Self {
        let size = Vec2::new(image.width() as f32, image.height() as f32);
        Self {
            shared: Arc::new(Shared {
                id: NEXT_SPRITE_ID.fetch_add(1, Ordering::Relaxed),
                priority: AtomicU8::new(Self::DEFAULT_PRIORITY),
                dirty: AtomicBool::new(false),
                shown: Mutex::new(None),
            }),
            name: String::new(),
            tag: String::new(),
            position,
            size,
            source: image.clone(),
            image,
            visible: true,
            transparency: Transparency::None,
            animation: None,
            on_click: None,
            on_animation_end: None,
        }
    }

    /// Resize the sprite (and its image)
    #[must_use]
    pub fn with_size(mut self, size: Vec2) -> Self {
        self.change_size(size);
        self
    }

    /// Set the paint priority
    pub fn with_priority(mut self, priority: u8) -> Result<Self, SpriteError> {
        self.set_priority(priority)?;
        Ok(self)
    }

    /// Set the transparency mode
    #[must_use]
    pub fn with_transparency(mut self, transparency: Transparency) -> Self {
        self.transparency = transparency;
        self
    }

    /// Set the name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the tag
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Top-left corner in world space
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Size in world units
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Image painted this frame
    #[must_use]
    pub fn image(&self) -> &Bitmap {
        &self.image
    }

    /// Transparency mode
    #[must_use]
    pub fn transparency(&self) -> Transparency {
        self.transparency
    }

    /// Whether the sprite is in a rendering queue (or staged for one)
    #[must_use]
    pub fn is_shown(&self) -> bool {
        self.shared.shown().is_some()
    }

    /// Change the paint priority. Only allowed while hidden.
    pub fn set_priority(&mut self, priority: u8) -> Result<(), SpriteError> {
        let shown = self.shared.shown();
        if shown.is_some() {
            return Err(SpriteError::PriorityWhileShown);
        }
        if priority > MAX_PRIORITY {
            return Err(SpriteError::InvalidPriority(priority));
        }
        self.shared.priority.store(priority, Ordering::Relaxed);
        Ok(())
    }

    /// Show or hide without leaving the queue
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Change how pixels are combined with the frame
    pub fn set_transparency(&mut self, transparency: Transparency) {
        self.transparency = transparency;
    }

    /// Move to a new position
    pub fn change_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Resize; the image and any animation frames are resampled
    pub fn change_size(&mut self, size: Vec2) {
        self.size = size.max(Vec2::ONE);
        self.rebuild_image();
        if let Some(animation) = self.animation.as_mut() {
            let (w, h) = pixel_size(self.size);
            for frame in &mut animation.frames {
                *frame = fit(frame, w, h);
            }
        }
    }

    /// Replace the image; it is resampled to the current size
    pub fn change_image(&mut self, image: Bitmap) {
        self.source = image;
        self.rebuild_image();
    }

    /// Resample the painted image from the source image
    pub fn rebuild_image(&mut self) {
        let (w, h) = pixel_size(self.size);
        self.image = fit(&self.source, w, h);
    }

    /// Called with the click whenever the sprite is clicked.
    ///
    /// The sprite is locked while the callback runs: use a [`SpriteHandle`]
    /// to show, hide or invalidate it, never [`SpriteHandle::lock`].
    pub fn set_on_click(&mut self, callback: impl FnMut(&MouseClick) + Send + 'static) {
        self.on_click = Some(Box::new(callback));
    }

    /// Called with the sprite id when a non-looping animation ends
    pub fn set_on_animation_end(&mut self, callback: impl FnMut(u64) + Send + 'static) {
        self.on_animation_end = Some(Box::new(callback));
    }

    // ========================================================================
    // Animation
    // ========================================================================

    /// Play `frames` at `fps`. The first frame is shown immediately.
    pub fn animate(&mut self, frames: Vec<Bitmap>, fps: u32, looping: bool) -> Result<(), SpriteError> {
        let interval_ms = frame_interval(fps)?;
        if frames.is_empty() {
            return Err(SpriteError::NoFrames);
        }
        let (w, h) = pixel_size(self.size);
        let frames: Vec<Bitmap> = frames.iter().map(|f| fit(f, w, h)).collect();
        self.image = frames[0].clone();
        self.animation = Some(Animation {
            frames,
            next: 1,
            interval_ms,
            looping,
            playing: true,
            last_switch_ms: None,
        });
        Ok(())
    }

    /// Change the animation speed
    pub fn set_fps(&mut self, fps: u32) -> Result<(), SpriteError> {
        let interval_ms = frame_interval(fps)?;
        if let Some(animation) = self.animation.as_mut() {
            animation.interval_ms = interval_ms;
        }
        Ok(())
    }

    /// Current animation rate, if animated
    #[must_use]
    pub fn fps(&self) -> Option<u32> {
        self.animation
            .as_ref()
            .map(|a| (1000.0 / a.interval_ms).round() as u32)
    }

    /// Pause on the current frame
    pub fn stop_animation(&mut self) {
        if let Some(animation) = self.animation.as_mut() {
            animation.playing = false;
        }
    }

    /// Continue a paused animation
    pub fn resume_animation(&mut self) {
        if let Some(animation) = self.animation.as_mut() {
            animation.playing = true;
            animation.last_switch_ms = None;
        }
    }

    /// Whether an animation is running
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.animation.as_ref().is_some_and(|a| a.playing)
    }

    /// Drop the animation and go back to the plain image
    pub fn clear_animation(&mut self) {
        self.animation = None;
        self.rebuild_image();
    }
}

impl Drawable for Sprite {
    fn id(&self) -> u64 {
        self.shared.id
    }

    fn priority(&self) -> u8 {
        self.shared.priority.load(Ordering::Relaxed)
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn bounds(&self) -> Bounds {
        Bounds::new(self.position, self.size)
    }

    fn paint(&mut self, ctx: &mut DrawContext<'_>) -> Result<(), FrameBufferError> {
        if self.shared.dirty.swap(false, Ordering::Relaxed) {
            self.rebuild_image();
        }
        let id = self.shared.id;
        let step = match self.animation.as_mut() {
            Some(animation) => animation.step(ctx.elapsed() * 1000.0),
            None => Step::Idle,
        };
        match step {
            Step::Idle => {}
            Step::Frame(frame) => self.image = frame,
            Step::Ended => {
                log::debug!("Sprite {id} animation ended");
                ctx.emit(EngineEvent::AnimationEnded { sprite: id });
                if let Some(callback) = self.on_animation_end.as_mut() {
                    callback(id);
                }
            }
        }
        ctx.draw_bitmap(&self.image, self.position, self.transparency)
    }

    fn on_click(&mut self, click: &MouseClick) {
        if let Some(callback) = self.on_click.as_mut() {
            callback(click);
        }
    }
}

impl fmt::Debug for Sprite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sprite")
            .field("id", &self.shared.id)
            .field("name", &self.name)
            .field("position", &self.position)
            .field("size", &self.size)
            .field("priority", &self.priority())
            .field("visible", &self.visible)
            .field("shown", &self.is_shown())
            .finish_non_exhaustive()
    }
}

fn frame_interval(fps: u32) -> Result<f64, SpriteError> {
    if fps == 0 || fps > MAX_ANIMATION_FPS {
        return Err(SpriteError::InvalidFrameRate(fps));
    }
    Ok(1000.0 / f64::from(fps))
}

fn pixel_size(size: Vec2) -> (u32, u32) {
    (size.x.round().max(1.0) as u32, size.y.round().max(1.0) as u32)
}

/// Same bitmap when it already has the right size, a resampled copy otherwise
fn fit(bitmap: &Bitmap, width: u32, height: u32) -> Bitmap {
    if bitmap.width() == width && bitmap.height() == height {
        bitmap.clone()
    } else {
        bitmap.resized(width, height)
    }
}

// ============================================================================
// Sprite Handle
// ============================================================================

/// Shared sprite handle.
///
/// The rendering queue only holds weak references: dropping every handle
/// removes the sprite from the screen on the next frame. `show`, `hide`,
/// `is_shown`, `id` and `invalidate` never lock the sprite, so they are safe
/// to call from the sprite's own callbacks.
#[derive(Debug, Clone)]
pub struct SpriteHandle {
    sprite: Arc<Mutex<Sprite>>,
    shared: Arc<Shared>,
}

impl SpriteHandle {
    /// Wrap a sprite
    #[must_use]
    pub fn new(sprite: Sprite) -> Self {
        let shared = Arc::clone(&sprite.shared);
        Self {
            sprite: Arc::new(Mutex::new(sprite)),
            shared,
        }
    }

    /// Lock the sprite
    pub fn lock(&self) -> MutexGuard<'_, Sprite> {
        self.sprite.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sprite id
    #[must_use]
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    /// Type-erased handle for use with a [`QueueHandle`]
    #[must_use]
    pub fn as_drawable(&self) -> SharedDrawable {
        self.sprite.clone()
    }
}

impl Paintable for SpriteHandle {
    type Error = SpriteError;

    fn show(&self, queue: &QueueHandle) -> Result<(), SpriteError> {
        let mut shown = self.shared.shown();
        if shown.is_some() {
            return Ok(());
        }
        let priority = self.shared.priority.load(Ordering::Relaxed);
        queue.stage_add(priority, self.shared.id, self.as_drawable());
        *shown = Some(queue.clone());
        Ok(())
    }

    fn hide(&self) -> bool {
        match self.shared.shown().take() {
            Some(queue) => {
                queue.remove(self.shared.priority.load(Ordering::Relaxed), self.shared.id);
                true
            }
            None => false,
        }
    }

    fn is_shown(&self) -> bool {
        self.shared.shown().is_some()
    }

    fn invalidate(&self) {
        self.shared.dirty.store(true, Ordering::Relaxed);
    }
}
