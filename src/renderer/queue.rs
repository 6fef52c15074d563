//! Priority-bucketed rendering queue
//!
//! Each frame the queue clears the frame buffer, applies the camera
//! transform and paints every visible drawable, bucket by bucket from
//! priority 0 to 4. Adds and removes never touch the buckets directly: they
//! are staged through a [`QueueHandle`] and committed after painting, so a
//! drawable may show or hide others (or itself) while being painted without
//! changing the current pass.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use crate::collections::WeakRegistry;
use crate::core::EngineEvent;
use crate::input::MouseClick;
use crate::objects::Transform;
use crate::renderer::{
    Bitmap, Color, DrawContext, Drawable, MAX_PRIORITY, PRIORITY_LEVELS, SharedDrawable,
};

enum Staged {
    Add {
        priority: u8,
        id: u64,
        drawable: SharedDrawable,
    },
    Remove {
        priority: u8,
        id: u64,
    },
}

/// Cloneable staging side of a [`RenderingQueue`].
///
/// Operations are applied in the order they were staged when the queue
/// commits at the end of its next render pass.
#[derive(Clone, Default)]
pub struct QueueHandle {
    staging: Arc<Mutex<Vec<Staged>>>,
}

impl QueueHandle {
    fn staging(&self) -> std::sync::MutexGuard<'_, Vec<Staged>> {
        self.staging.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stage a drawable for addition.
    ///
    /// Locks the drawable to read its id and priority; from inside that
    /// drawable's own paint call use [`QueueHandle::stage_add`] instead.
    pub fn add(&self, drawable: SharedDrawable) {
        let (id, priority) = {
            let guard = drawable.lock().unwrap_or_else(PoisonError::into_inner);
            (guard.id(), guard.priority())
        };
        self.stage_add(priority, id, drawable);
    }

    /// Stage an addition with explicit id and priority
    pub fn stage_add(&self, priority: u8, id: u64, drawable: SharedDrawable) {
        self.staging().push(Staged::Add {
            priority,
            id,
            drawable,
        });
    }

    /// Stage removal of drawable `id` from bucket `priority`
    pub fn remove(&self, priority: u8, id: u64) {
        self.staging().push(Staged::Remove { priority, id });
    }

    /// Number of staged operations
    #[must_use]
    pub fn pending(&self) -> usize {
        self.staging().len()
    }

    /// Whether two handles stage into the same queue
    #[must_use]
    pub fn same_queue(&self, other: &QueueHandle) -> bool {
        Arc::ptr_eq(&self.staging, &other.staging)
    }

    fn take(&self) -> Vec<Staged> {
        std::mem::take(&mut *self.staging())
    }
}

impl fmt::Debug for QueueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueHandle")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Outcome of one render pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderReport {
    /// Drawables painted
    pub painted: usize,
    /// Queued drawables skipped because they were invisible
    pub hidden: usize,
    /// Drawables whose paint call failed
    pub failed: usize,
    /// Events emitted while painting
    pub events: Vec<EngineEvent>,
}

/// Five priority buckets of weakly held drawables
pub struct RenderingQueue {
    buckets: [WeakRegistry<Mutex<dyn Drawable>>; PRIORITY_LEVELS],
    handle: QueueHandle,
}

impl RenderingQueue {
    /// Create an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: std::array::from_fn(|_| WeakRegistry::new()),
            handle: QueueHandle::default(),
        }
    }

    /// Handle for staging adds and removes
    #[must_use]
    pub fn handle(&self) -> QueueHandle {
        self.handle.clone()
    }

    /// Paint one frame into `target`, then commit staged operations.
    pub fn render(
        &mut self,
        target: &Bitmap,
        background: Color,
        transform: Transform,
        elapsed: f64,
    ) -> RenderReport {
        let mut report = RenderReport::default();
        let mut ctx = DrawContext::new(target, transform, elapsed);
        ctx.surface().clear(background);

        for bucket in &mut self.buckets {
            for (id, drawable) in bucket.live() {
                let mut drawable = drawable.lock().unwrap_or_else(PoisonError::into_inner);
                if !drawable.is_visible() {
                    report.hidden += 1;
                    continue;
                }
                match panic::catch_unwind(AssertUnwindSafe(|| drawable.paint(&mut ctx))) {
                    Ok(Ok(())) => report.painted += 1,
                    Ok(Err(err)) => {
                        log::warn!("Drawable {id} failed to paint: {err}");
                        report.failed += 1;
                    }
                    Err(_) => {
                        log::error!("Drawable {id} panicked while painting");
                        report.failed += 1;
                    }
                }
            }
        }

        report.events = ctx.finish();
        self.commit();
        report
    }

    /// Apply staged operations in order
    pub fn commit(&mut self) {
        for op in self.handle.take() {
            match op {
                Staged::Add {
                    priority,
                    id,
                    drawable,
                } => {
                    if !self.bucket_mut(priority).insert(id, &drawable) {
                        log::debug!("Drawable {id} is already queued");
                    }
                }
                Staged::Remove { priority, id } => {
                    self.bucket_mut(priority).remove(id);
                }
            }
        }
    }

    fn bucket_mut(&mut self, priority: u8) -> &mut WeakRegistry<Mutex<dyn Drawable>> {
        &mut self.buckets[usize::from(priority.min(MAX_PRIORITY))]
    }

    /// Deliver a click to every visible drawable under the cursor, topmost
    /// bucket first. Returns the ids that were hit.
    pub fn dispatch_click(&mut self, click: &MouseClick) -> Vec<u64> {
        let mut hits = Vec::new();
        for bucket in self.buckets.iter_mut().rev() {
            for (id, drawable) in bucket.live() {
                let mut drawable = drawable.lock().unwrap_or_else(PoisonError::into_inner);
                if drawable.is_visible() && drawable.bounds().contains(click.world) {
                    drawable.on_click(click);
                    hits.push(id);
                }
            }
        }
        hits
    }

    /// Live drawables in one bucket
    #[must_use]
    pub fn bucket_len(&self, priority: u8) -> usize {
        self.buckets
            .get(usize::from(priority))
            .map_or(0, WeakRegistry::live_count)
    }

    /// Live drawables across all buckets
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.iter().map(WeakRegistry::live_count).sum()
    }

    /// Returns true if nothing is queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every queued drawable and staged operation
    pub fn clear(&mut self) {
        self.handle.take();
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }
}

impl Default for RenderingQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
