//! The host the engine runs inside
//!
//! A host owns the window (or whatever stands in for it), pumps its events
//! into the engine through an [`EngineHandle`], and presents finished frames.
//! Hosts are shared with the loop tasks, so every method takes `&self`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::core::EngineError;
use crate::input::InputEvent;
use crate::renderer::Bitmap;

/// Window and event pump collaborator
pub trait Host: Send + Sync + 'static {
    /// Drawable area in pixels
    fn size(&self) -> (u32, u32);

    /// A new frame is ready in `frame`
    fn request_repaint(&self, frame: &Bitmap);

    /// Pump events until the window closes or `engine.is_close_requested()`.
    ///
    /// Blocks the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Host`] if the event pump fails
    fn run(&self, engine: EngineHandle) -> Result<(), EngineError>;
}

/// Sending side of the engine's input queue, plus the close flag
#[derive(Debug, Clone)]
pub struct EngineHandle {
    input: mpsc::UnboundedSender<InputEvent>,
    close: Arc<AtomicBool>,
}

impl EngineHandle {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<InputEvent>) {
        let (input, inbox) = mpsc::unbounded_channel();
        (
            Self {
                input,
                close: Arc::new(AtomicBool::new(false)),
            },
            inbox,
        )
    }

    /// Queue an input event for the next variable frame.
    ///
    /// Returns `false` once the engine has been dropped.
    pub fn dispatch(&self, event: InputEvent) -> bool {
        self.input.send(event).is_ok()
    }

    /// Ask the host and both loops to wind down
    pub fn request_close(&self) {
        self.close.store(true, Ordering::SeqCst);
    }

    /// Whether a close was requested by the host or the game
    #[must_use]
    pub fn is_close_requested(&self) -> bool {
        self.close.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.close.store(false, Ordering::SeqCst);
    }
}

/// In-process host without a window.
///
/// Counts repaints and keeps a copy of the last frame. Scripted input is
/// dispatched when [`Host::run`] starts.
#[derive(Debug)]
pub struct HeadlessHost {
    width: u32,
    height: u32,
    run_for: Option<Duration>,
    script: Mutex<Vec<InputEvent>>,
    repaints: AtomicU64,
    last_frame: Mutex<Option<Bitmap>>,
}

impl HeadlessHost {
    /// Create a host of the given size that runs until the engine closes
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            run_for: None,
            script: Mutex::new(Vec::new()),
            repaints: AtomicU64::new(0),
            last_frame: Mutex::new(None),
        }
    }

    /// Close on its own after `duration`
    #[must_use]
    pub fn with_run_duration(mut self, duration: Duration) -> Self {
        self.run_for = Some(duration);
        self
    }

    /// Input to dispatch when the pump starts
    #[must_use]
    pub fn with_script(self, events: impl IntoIterator<Item = InputEvent>) -> Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(events);
        self
    }

    /// Frames presented so far
    #[must_use]
    pub fn repaint_count(&self) -> u64 {
        self.repaints.load(Ordering::SeqCst)
    }

    /// Copy of the most recent frame
    #[must_use]
    pub fn last_frame(&self) -> Option<Bitmap> {
        self.last_frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Host for HeadlessHost {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn request_repaint(&self, frame: &Bitmap) {
        self.repaints.fetch_add(1, Ordering::SeqCst);
        match Bitmap::from_pixels(frame.width(), frame.height(), frame.snapshot()) {
            Ok(copy) => *self.last_frame.lock().unwrap_or_else(PoisonError::into_inner) = Some(copy),
            Err(err) => log::warn!("Headless host could not keep the frame: {err}"),
        }
    }

    fn run(&self, engine: EngineHandle) -> Result<(), EngineError> {
        let script = std::mem::take(&mut *self.script.lock().unwrap_or_else(PoisonError::into_inner));
        for event in script {
            if !engine.dispatch(event) {
                return Err(EngineError::Host("engine input queue closed".into()));
            }
        }

        let started = Instant::now();
        while !engine.is_close_requested() {
            if self.run_for.is_some_and(|limit| started.elapsed() >= limit) {
                engine.request_close();
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::Color;

    #[test]
    fn test_handle_queues_input() {
        let (handle, mut inbox) = EngineHandle::channel();
        assert!(handle.dispatch(InputEvent::MouseWheel(1.0)));
        assert_eq!(inbox.try_recv().ok(), Some(InputEvent::MouseWheel(1.0)));

        drop(inbox);
        assert!(!handle.dispatch(InputEvent::CloseRequested));
    }

    #[test]
    fn test_close_flag_is_shared() {
        let (handle, _inbox) = EngineHandle::channel();
        let clone = handle.clone();
        clone.request_close();
        assert!(handle.is_close_requested());
        handle.reset();
        assert!(!clone.is_close_requested());
    }

    #[test]
    fn test_headless_repaint_keeps_copy() {
        let host = HeadlessHost::new(4, 4);
        let frame = Bitmap::filled(4, 4, Color::RED);
        host.request_repaint(&frame);
        frame.lock().clear(Color::BLUE);

        let copy = host.last_frame().unwrap();
        assert_eq!(host.repaint_count(), 1);
        assert!(!copy.same_surface(&frame));
        assert_eq!(copy.lock().get_pixel(0, 0).unwrap(), Color::RED);
    }

    #[test]
    fn test_headless_repaint_copies_pixels_exactly() {
        let host = HeadlessHost::new(3, 2);
        let frame = Bitmap::new(3, 2);
        {
            let mut lock = frame.lock();
            lock.set_pixel(0, 0, Color::RED).unwrap();
            lock.set_pixel(2, 1, Color::BLUE).unwrap();
        }
        host.request_repaint(&frame);

        let copy = host.last_frame().unwrap();
        assert_eq!((copy.width(), copy.height()), (3, 2));
        assert_eq!(copy.snapshot(), frame.snapshot());
    }

    #[test]
    fn test_headless_run_dispatches_script_and_times_out() {
        let host = HeadlessHost::new(4, 4)
            .with_script([InputEvent::MouseWheel(2.0)])
            .with_run_duration(Duration::from_millis(5));
        let (handle, mut inbox) = EngineHandle::channel();

        host.run(handle.clone()).unwrap();

        assert!(handle.is_close_requested());
        assert_eq!(inbox.try_recv().ok(), Some(InputEvent::MouseWheel(2.0)));
    }
}
