//! Software frame buffers
//!
//! A [`Bitmap`] is a shared 32-bit ARGB surface. Cloning a bitmap clones the
//! handle, not the pixels. Pixel access goes through [`BitmapLock`], a scoped
//! exclusive lock, so reading or writing an unlocked surface cannot be
//! expressed.
//!
//! Region operations work on two surfaces at once. Using the same surface as
//! source and destination is rejected with [`FrameBufferError::Aliased`]
//! instead of deadlocking on the second lock.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use thiserror::Error;

use crate::math::Rect;
use crate::renderer::Color;

/// Global counter for bitmap ids
static NEXT_BITMAP_ID: AtomicU64 = AtomicU64::new(1);

/// Errors raised by frame buffer access
#[derive(Debug, Error)]
pub enum FrameBufferError {
    /// Pixel coordinates outside the surface
    #[error("pixel ({x}, {y}) is outside the {width}x{height} surface")]
    OutOfRange {
        /// Requested column
        x: i32,
        /// Requested row
        y: i32,
        /// Surface width
        width: u32,
        /// Surface height
        height: u32,
    },
    /// Source and destination are the same surface
    #[error("source and destination refer to the same surface")]
    Aliased,
    /// The surface is locked elsewhere
    #[error("surface is already locked")]
    Locked,
    /// Pixel data does not match the requested dimensions
    #[error("expected {expected} pixels, got {actual}")]
    InvalidSize {
        /// `width * height`
        expected: usize,
        /// Supplied pixel count
        actual: usize,
    },
    /// Image decoding failed
    #[error("failed to load image: {0}")]
    Image(#[from] image::ImageError),
}

/// How source pixels are combined with destination pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Overwrite the destination
    #[default]
    Replace,
    /// Skip alpha 0, overwrite alpha 255, otherwise average each channel
    Average,
    /// Standard source-over alpha compositing
    Composite,
}

impl BlendMode {
    #[inline]
    fn apply(self, src: Color, dst: Color) -> Color {
        match self {
            Self::Replace => src,
            Self::Average => src.average_over(dst),
            Self::Composite => src.composite_over(dst),
        }
    }
}

#[derive(Debug)]
struct Surface {
    id: u64,
    width: u32,
    height: u32,
    pixels: Mutex<Vec<Color>>,
}

/// Shared handle to a pixel surface
#[derive(Debug, Clone)]
pub struct Bitmap {
    inner: Arc<Surface>,
}

impl Bitmap {
    /// Create a transparent surface
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Color::TRANSPARENT)
    }

    /// Create a surface filled with one color
    #[must_use]
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        let len = width as usize * height as usize;
        Self::wrap(width, height, vec![color; len])
    }

    /// Wrap existing pixel data (row-major)
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Color>) -> Result<Self, FrameBufferError> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(FrameBufferError::InvalidSize {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self::wrap(width, height, pixels))
    }

    /// Convert a decoded RGBA image
    #[must_use]
    pub fn from_rgba_image(image: &image::RgbaImage) -> Self {
        let pixels = image.pixels().map(|p| Color::from(p.0)).collect();
        Self::wrap(image.width(), image.height(), pixels)
    }

    /// Decode an image file (PNG or JPEG)
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FrameBufferError> {
        let path = path.as_ref();
        let image = image::open(path)?.to_rgba8();
        log::debug!(
            "Loaded bitmap {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(Self::from_rgba_image(&image))
    }

    fn wrap(width: u32, height: u32, pixels: Vec<Color>) -> Self {
        Self {
            inner: Arc::new(Surface {
                id: NEXT_BITMAP_ID.fetch_add(1, Ordering::Relaxed),
                width,
                height,
                pixels: Mutex::new(pixels),
            }),
        }
    }

    /// Unique id of the underlying surface
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Width in pixels
    #[must_use]
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    /// Height in pixels
    #[must_use]
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    /// Full surface rectangle
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.inner.width as i32, self.inner.height as i32)
    }

    /// Check whether two handles point at the same surface
    #[must_use]
    pub fn same_surface(&self, other: &Bitmap) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Lock the surface for pixel access, waiting for other holders.
    pub fn lock(&self) -> BitmapLock<'_> {
        let pixels = self
            .inner
            .pixels
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        BitmapLock {
            width: self.inner.width,
            height: self.inner.height,
            pixels,
        }
    }

    /// Lock the surface without waiting.
    pub fn try_lock(&self) -> Result<BitmapLock<'_>, FrameBufferError> {
        let pixels = match self.inner.pixels.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(FrameBufferError::Locked),
        };
        Ok(BitmapLock {
            width: self.inner.width,
            height: self.inner.height,
            pixels,
        })
    }

    /// Copy of the current pixels
    #[must_use]
    pub fn snapshot(&self) -> Vec<Color> {
        self.lock().pixels().to_vec()
    }

    /// New surface resampled with nearest neighbour
    #[must_use]
    pub fn resized(&self, width: u32, height: u32) -> Bitmap {
        let target = Bitmap::new(width, height);
        {
            let src = self.lock();
            let mut dst = target.lock();
            dst.draw_scaled(
                &src,
                Rect::from_size(width as i32, height as i32),
                BlendMode::Replace,
            );
        }
        target
    }

    /// Copy `src_rect` of `src` into `dst_rect` of `dst`.
    ///
    /// Both rectangles are clipped to their surfaces; an empty overlap is a
    /// no-op.
    pub fn copy_region(
        src: &Bitmap,
        dst: &Bitmap,
        src_rect: Rect,
        dst_rect: Rect,
    ) -> Result<(), FrameBufferError> {
        Self::region(src, dst, src_rect, dst_rect, BlendMode::Replace)
    }

    /// Blend `src_rect` of `src` into `dst_rect` of `dst` with
    /// [`BlendMode::Average`].
    pub fn blend_region(
        src: &Bitmap,
        dst: &Bitmap,
        src_rect: Rect,
        dst_rect: Rect,
    ) -> Result<(), FrameBufferError> {
        Self::region(src, dst, src_rect, dst_rect, BlendMode::Average)
    }

    fn region(
        src: &Bitmap,
        dst: &Bitmap,
        src_rect: Rect,
        dst_rect: Rect,
        mode: BlendMode,
    ) -> Result<(), FrameBufferError> {
        if src.same_surface(dst) {
            return Err(FrameBufferError::Aliased);
        }
        // Lock in id order so opposite-direction copies cannot deadlock
        let (source, mut target) = if src.id() < dst.id() {
            let source = src.lock();
            (source, dst.lock())
        } else {
            let target = dst.lock();
            (src.lock(), target)
        };
        target.draw_region(&source, src_rect, dst_rect, mode);
        Ok(())
    }
}

/// Exclusive access to a locked surface
pub struct BitmapLock<'a> {
    width: u32,
    height: u32,
    pixels: MutexGuard<'a, Vec<Color>>,
}

impl BitmapLock<'_> {
    /// Width in pixels
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Full surface rectangle
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.width as i32, self.height as i32)
    }

    /// Row-major pixel slice
    #[must_use]
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Mutable row-major pixel slice
    pub fn pixels_mut(&mut self) -> &mut [Color] {
        &mut self.pixels
    }

    fn index(&self, x: i32, y: i32) -> Result<usize, FrameBufferError> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return Err(FrameBufferError::OutOfRange {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(y as usize * self.width as usize + x as usize)
    }

    /// Read one pixel
    pub fn get_pixel(&self, x: i32, y: i32) -> Result<Color, FrameBufferError> {
        let index = self.index(x, y)?;
        Ok(self.pixels[index])
    }

    /// Write one pixel
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) -> Result<(), FrameBufferError> {
        let index = self.index(x, y)?;
        self.pixels[index] = color;
        Ok(())
    }

    /// Fill the whole surface.
    ///
    /// When every channel byte is equal the buffer is filled as raw bytes,
    /// otherwise eight pixels are written per step.
    pub fn clear(&mut self, color: Color) {
        match color.uniform_byte() {
            Some(byte) => bytemuck::cast_slice_mut::<Color, u8>(self.pixels.as_mut_slice()).fill(byte),
            None => {
                let batch = [color; 8];
                let mut chunks = self.pixels.chunks_exact_mut(batch.len());
                for chunk in &mut chunks {
                    chunk.copy_from_slice(&batch);
                }
                chunks.into_remainder().fill(color);
            }
        }
    }

    /// Combine a region of `src` into this surface.
    ///
    /// The copied extent is the smaller of the two rectangles, clipped so that
    /// no pixel outside either surface is read or written.
    pub fn draw_region(&mut self, src: &BitmapLock<'_>, src_rect: Rect, dst_rect: Rect, mode: BlendMode) {
        let Some(clip) = clip_regions(src.bounds(), self.bounds(), src_rect, dst_rect) else {
            return;
        };

        let src_stride = src.width as usize;
        let dst_stride = self.width as usize;
        let width = clip.width as usize;

        for row in 0..clip.height as usize {
            let s = (clip.src_y as usize + row) * src_stride + clip.src_x as usize;
            let d = (clip.dst_y as usize + row) * dst_stride + clip.dst_x as usize;
            let source = &src.pixels[s..s + width];
            let target = &mut self.pixels[d..d + width];
            match mode {
                BlendMode::Replace => target.copy_from_slice(source),
                _ => {
                    for (out, &pixel) in target.iter_mut().zip(source) {
                        *out = mode.apply(pixel, *out);
                    }
                }
            }
        }
    }

    /// Draw all of `src` stretched into `dst_rect` with nearest-neighbour
    /// sampling. Pixels falling outside this surface are skipped.
    pub fn draw_scaled(&mut self, src: &BitmapLock<'_>, dst_rect: Rect, mode: BlendMode) {
        if dst_rect.is_empty() || src.width == 0 || src.height == 0 {
            return;
        }
        let visible = dst_rect.intersect(&self.bounds());
        if visible.is_empty() {
            return;
        }

        let src_w = i64::from(src.width);
        let src_h = i64::from(src.height);
        let dst_w = i64::from(dst_rect.width);
        let dst_h = i64::from(dst_rect.height);
        let src_stride = src.width as usize;
        let dst_stride = self.width as usize;

        for y in visible.y..visible.bottom() {
            let sy = ((i64::from(y) - i64::from(dst_rect.y)) * src_h / dst_h) as usize;
            let row = y as usize * dst_stride;
            for x in visible.x..visible.right() {
                let sx = ((i64::from(x) - i64::from(dst_rect.x)) * src_w / dst_w) as usize;
                let color = src.pixels[sy * src_stride + sx];
                let dst = &mut self.pixels[row + x as usize];
                *dst = mode.apply(color, *dst);
            }
        }
    }
}

/// Clipped copy extents shared by both surfaces
#[derive(Debug, PartialEq, Eq)]
struct Clip {
    src_x: i32,
    src_y: i32,
    dst_x: i32,
    dst_y: i32,
    width: i32,
    height: i32,
}

fn clip_regions(src_bounds: Rect, dst_bounds: Rect, src_rect: Rect, dst_rect: Rect) -> Option<Clip> {
    if src_rect.is_empty() || dst_rect.is_empty() {
        return None;
    }

    let (src_x, dst_x, width) = clip_axis(
        (src_rect.x, src_bounds.x, src_bounds.right()),
        (dst_rect.x, dst_bounds.x, dst_bounds.right()),
        src_rect.width.min(dst_rect.width),
    )?;
    let (src_y, dst_y, height) = clip_axis(
        (src_rect.y, src_bounds.y, src_bounds.bottom()),
        (dst_rect.y, dst_bounds.y, dst_bounds.bottom()),
        src_rect.height.min(dst_rect.height),
    )?;

    Some(Clip {
        src_x,
        src_y,
        dst_x,
        dst_y,
        width,
        height,
    })
}

/// Clip one axis of a copy. Each side is `(start, low, high)`: the span is
/// moved forward until both starts reach their `low` and shortened to end
/// before either `high`. Computed in `i64` so rects near the `i32` limits
/// cannot overflow.
fn clip_axis(src: (i32, i32, i32), dst: (i32, i32, i32), span: i32) -> Option<(i32, i32, i32)> {
    let (src_start, src_low, src_high) = (i64::from(src.0), i64::from(src.1), i64::from(src.2));
    let (dst_start, dst_low, dst_high) = (i64::from(dst.0), i64::from(dst.1), i64::from(dst.2));

    let skip = (src_low - src_start).max(dst_low - dst_start).max(0);
    let src_start = src_start + skip;
    let dst_start = dst_start + skip;
    let span = (i64::from(span) - skip)
        .min(src_high - src_start)
        .min(dst_high - dst_start);
    if span <= 0 {
        return None;
    }
    // Both starts now lie inside their surfaces
    Some((src_start as i32, dst_start as i32, span as i32))
}
