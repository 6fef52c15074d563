//! Engine events
//!
//! Double-buffered queue: events pushed during frame N become readable in
//! frame N+1, after the variable loop calls [`EventQueue::swap`].
//!
//! # Example
//!
//! ```ignore
//! for event in ctx.events.iter() {
//!     if let EngineEvent::SpriteClicked { sprite, .. } = event {
//!         log::info!("clicked {sprite}");
//!     }
//! }
//! ```

use std::collections::VecDeque;

use glam::Vec2;
use winit::event::MouseButton;

use crate::objects::ObjectId;

// ============================================================================
// Event Types
// ============================================================================

/// Things that happened inside the engine.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EngineEvent {
    /// A camera ticked. Fired every frame, moved or not.
    CameraMoved {
        /// Index in the camera registry
        camera: usize,
        /// Position after the tick
        position: Vec2,
        /// Zoom after the tick
        scale: f32,
    },
    /// A shown sprite was clicked
    SpriteClicked {
        /// Sprite id
        sprite: u64,
        /// Released button
        button: MouseButton,
        /// Click position in world space
        position: Vec2,
    },
    /// A non-looping sprite animation played its last frame
    AnimationEnded {
        /// Sprite id
        sprite: u64,
    },
    /// An object ran its start hook
    ObjectStarted {
        /// Object id
        object: ObjectId,
    },
    /// An object was destroyed through the registry
    ObjectDestroyed {
        /// Object id
        object: ObjectId,
    },
    /// The frame buffer was resized
    Resized {
        /// New width
        width: u32,
        /// New height
        height: u32,
    },
    /// The engine is shutting down
    GameClosing,
}

// ============================================================================
// Event Queue
// ============================================================================

/// Double-buffered event queue.
#[derive(Debug)]
pub struct EventQueue<E = EngineEvent> {
    /// Events being written this frame
    pending: VecDeque<E>,
    /// Events from the previous frame
    ready: VecDeque<E>,
}

impl<E> EventQueue<E> {
    /// Create an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: VecDeque::with_capacity(64),
            ready: VecDeque::with_capacity(64),
        }
    }

    /// Queue an event for the next frame
    #[inline]
    pub fn push(&mut self, event: E) {
        self.pending.push_back(event);
    }

    /// Queue several events for the next frame
    pub fn extend(&mut self, events: impl IntoIterator<Item = E>) {
        self.pending.extend(events);
    }

    /// Make this frame's events readable and start a new pending buffer
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.ready);
        self.pending.clear();
    }

    /// Events from the previous frame
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.ready.iter()
    }

    /// Take ownership of the previous frame's events
    pub fn drain(&mut self) -> impl Iterator<Item = E> + '_ {
        self.ready.drain(..)
    }

    /// Number of readable events
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.ready.len()
    }

    /// Returns true if nothing is readable
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    /// Number of events waiting for the next swap
    #[must_use]
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drop everything, readable and pending
    pub fn clear(&mut self) {
        self.pending.clear();
        self.ready.clear();
    }
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_visible_after_swap() {
        let mut queue = EventQueue::new();
        queue.push(EngineEvent::AnimationEnded { sprite: 3 });
        assert!(queue.is_empty());
        assert_eq!(queue.pending_count(), 1);

        queue.swap();
        assert_eq!(
            queue.iter().collect::<Vec<_>>(),
            vec![&EngineEvent::AnimationEnded { sprite: 3 }]
        );
    }

    #[test]
    fn test_frames_are_isolated() {
        let mut queue: EventQueue<u32> = EventQueue::new();
        queue.push(1);
        queue.swap();
        queue.push(2);

        assert_eq!(queue.iter().copied().collect::<Vec<_>>(), vec![1]);
        queue.swap();
        assert_eq!(queue.iter().copied().collect::<Vec<_>>(), vec![2]);
        queue.swap();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drain_and_clear() {
        let mut queue: EventQueue<u32> = EventQueue::new();
        queue.extend([1, 2, 3]);
        queue.swap();
        assert_eq!(queue.drain().sum::<u32>(), 6);
        assert!(queue.is_empty());

        queue.push(4);
        queue.clear();
        assert_eq!(queue.pending_count(), 0);
    }
}
