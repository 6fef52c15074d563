//! State shared by both loops and handed to every game and object hook

use std::time::Duration;

use crate::core::{EngineConfig, EngineEvent, EngineStats, EventQueue, Time};
use crate::input::Input;
use crate::objects::{GameObject, GameObjectHandle, ObjectId, ObjectRegistry};
use crate::renderer::{Bitmap, Cameras, Color, Paintable, QueueHandle, RenderingQueue};

type Deferred = Box<dyn FnOnce(&mut EngineContext) + Send + 'static>;

/// Context passed to game callbacks
pub struct EngineContext {
    /// Time tracking
    pub time: Time,
    /// Input state
    pub input: Input,
    /// Live game objects
    pub objects: ObjectRegistry,
    /// Cameras, one of them active
    pub cameras: Cameras,
    /// Drawables painted every frame
    pub rendering: RenderingQueue,
    /// Engine events, readable for one frame
    pub events: EventQueue,
    /// Loop statistics
    pub stats: EngineStats,
    /// Clear color of the frame buffer
    pub background: Color,
    /// Off-screen frame buffer
    frame: Bitmap,
    /// Delayed invocations, ordered by due time
    deferred: Vec<(Duration, Deferred)>,
    /// Should the engine quit
    should_quit: bool,
}

impl EngineContext {
    /// Build the context for a validated configuration
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            time: Time::with_fixed_delta(config.fixed_interval()),
            input: Input::new(),
            objects: ObjectRegistry::new(),
            cameras: Cameras::new(config.width, config.height),
            rendering: RenderingQueue::new(),
            events: EventQueue::new(),
            stats: EngineStats::new(),
            background: config.background,
            frame: Bitmap::new(config.width, config.height),
            deferred: Vec::new(),
            should_quit: false,
        }
    }

    /// Frame buffer the rendering queue paints into
    #[must_use]
    pub fn frame(&self) -> &Bitmap {
        &self.frame
    }

    /// Frame buffer width
    #[must_use]
    pub fn width(&self) -> u32 {
        self.frame.width()
    }

    /// Frame buffer height
    #[must_use]
    pub fn height(&self) -> u32 {
        self.frame.height()
    }

    /// Replace the frame buffer and resize every camera viewport.
    ///
    /// Zero-sized requests are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 || (width, height) == (self.width(), self.height()) {
            return false;
        }
        self.frame = Bitmap::new(width, height);
        self.cameras.set_viewport(width, height);
        self.events.push(EngineEvent::Resized { width, height });
        log::debug!("frame buffer resized to {width}x{height}");
        true
    }

    /// Handle for showing drawables
    #[must_use]
    pub fn queue(&self) -> QueueHandle {
        self.rendering.handle()
    }

    /// Show a sprite or any other paintable on the next frame
    pub fn show<P: Paintable + ?Sized>(&self, paintable: &P) -> Result<(), P::Error> {
        paintable.show(&self.rendering.handle())
    }

    /// Register a game object; it starts on the next variable frame
    pub fn spawn(&mut self, object: GameObject) -> GameObjectHandle {
        self.objects.spawn(object)
    }

    /// Destroy a game object by id
    pub fn destroy(&mut self, id: ObjectId) -> bool {
        self.objects.destroy(id)
    }

    /// Run `action` on the variable loop once `delay` of frame time has passed
    pub fn invoke_after(
        &mut self,
        delay: Duration,
        action: impl FnOnce(&mut EngineContext) + Send + 'static,
    ) {
        let due = self.time.elapsed() + delay;
        let at = self.deferred.partition_point(|(other, _)| *other <= due);
        self.deferred.insert(at, (due, Box::new(action)));
    }

    /// Delayed invocations not yet run
    #[must_use]
    pub fn pending_invocations(&self) -> usize {
        self.deferred.len()
    }

    /// Run every invocation that is due. Invocations scheduled while running
    /// wait for the next frame.
    pub(crate) fn run_due_invocations(&mut self) {
        let now = self.time.elapsed();
        let ready = self.deferred.partition_point(|(due, _)| *due <= now);
        if ready == 0 {
            return;
        }
        let due: Vec<_> = self.deferred.drain(..ready).collect();
        for (_, action) in due {
            action(self);
        }
    }

    /// Request engine shutdown
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Check if engine should quit
    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("time", &self.time)
            .field("objects", &self.objects)
            .field("frame", &(self.width(), self.height()))
            .field("pending_invocations", &self.deferred.len())
            .field("should_quit", &self.should_quit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn context() -> EngineContext {
        EngineContext::new(&EngineConfig::default().with_size(16, 8))
    }

    #[test]
    fn test_resize_swaps_frame_and_viewports() {
        let mut ctx = context();
        assert!(ctx.resize(32, 16));
        assert!(!ctx.resize(32, 16));
        assert!(!ctx.resize(0, 16));

        assert_eq!((ctx.width(), ctx.height()), (32, 16));
        assert_eq!(ctx.cameras.active().center_point(), glam::Vec2::new(16.0, 8.0));
        ctx.events.swap();
        assert!(ctx
            .events
            .iter()
            .any(|e| *e == EngineEvent::Resized { width: 32, height: 16 }));
    }

    #[test]
    fn test_invoke_after_runs_when_due_in_order() {
        let mut ctx = context();
        let log = Arc::new(Mutex::new(Vec::new()));

        for (delay, tag) in [(30, "late"), (10, "early"), (10, "early2")] {
            let log = Arc::clone(&log);
            ctx.invoke_after(Duration::from_millis(delay), move |_| log.lock().unwrap().push(tag));
        }

        ctx.time.advance(Duration::from_millis(5));
        ctx.run_due_invocations();
        assert!(log.lock().unwrap().is_empty());

        ctx.time.advance(Duration::from_millis(10));
        ctx.run_due_invocations();
        assert_eq!(*log.lock().unwrap(), vec!["early", "early2"]);

        ctx.time.advance(Duration::from_millis(20));
        ctx.run_due_invocations();
        assert_eq!(*log.lock().unwrap(), vec!["early", "early2", "late"]);
        assert_eq!(ctx.pending_invocations(), 0);
    }

    #[test]
    fn test_invocation_scheduled_from_invocation_waits() {
        let mut ctx = context();
        let hits = Arc::new(Mutex::new(0));
        let outer = Arc::clone(&hits);
        ctx.invoke_after(Duration::ZERO, move |ctx| {
            *outer.lock().unwrap() += 1;
            let inner = Arc::clone(&outer);
            ctx.invoke_after(Duration::ZERO, move |_| *inner.lock().unwrap() += 1);
        });

        ctx.run_due_invocations();
        assert_eq!(*hits.lock().unwrap(), 1);
        assert_eq!(ctx.pending_invocations(), 1);
        ctx.run_due_invocations();
        assert_eq!(*hits.lock().unwrap(), 2);
    }

    #[test]
    fn test_quit_flag() {
        let mut ctx = context();
        assert!(!ctx.should_quit());
        ctx.quit();
        assert!(ctx.should_quit());
    }
}
