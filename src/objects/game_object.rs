//! Game object identity and state

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::objects::{Behavior, Transform};

/// Global counter for object ids
static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique object identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared, lockable game object
pub type GameObjectHandle = Arc<Mutex<GameObject>>;

/// Everything about an object except its behavior.
///
/// Hooks receive this alongside the behavior itself.
#[derive(Debug, Clone)]
pub struct ObjectState {
    id: ObjectId,
    /// Display name
    pub name: String,
    /// Free-form grouping tag
    pub tag: String,
    /// Position, rotation and scale
    pub transform: Transform,
    enabled: bool,
    destroy_requested: bool,
}

impl ObjectState {
    /// Object id
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Whether lifecycle hooks run for this object
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Ask the engine to destroy this object once the current hook returns.
    ///
    /// Safe to call from the object's own hooks.
    pub fn destroy(&mut self) {
        self.destroy_requested = true;
    }

    /// Whether [`ObjectState::destroy`] was called
    #[must_use]
    pub fn is_destroy_requested(&self) -> bool {
        self.destroy_requested
    }
}

/// A named entity with a transform and an optional behavior
pub struct GameObject {
    pub(crate) state: ObjectState,
    pub(crate) behavior: Option<Box<dyn Behavior>>,
}

impl GameObject {
    /// Create an enabled object without a behavior
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            state: ObjectState {
                id: ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed)),
                name: name.into(),
                tag: String::new(),
                transform: Transform::default(),
                enabled: true,
                destroy_requested: false,
            },
            behavior: None,
        }
    }

    /// Set the tag
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.state.tag = tag.into();
        self
    }

    /// Set the initial transform
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.state.transform = transform;
        self
    }

    /// Attach a behavior
    #[must_use]
    pub fn with_behavior(mut self, behavior: impl Behavior) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }

    /// Object id
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.state.id
    }

    /// Display name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Grouping tag
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.state.tag
    }

    /// Identity, transform and flags
    #[must_use]
    pub fn state(&self) -> &ObjectState {
        &self.state
    }

    /// Mutable identity, transform and flags
    pub fn state_mut(&mut self) -> &mut ObjectState {
        &mut self.state
    }

    /// Transform
    #[must_use]
    pub fn transform(&self) -> &Transform {
        &self.state.transform
    }

    /// Mutable transform
    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.state.transform
    }

    /// Whether lifecycle hooks run for this object
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    /// Enable or disable, firing `on_enable`/`on_disable` on a change
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.state.enabled == enabled {
            return;
        }
        self.state.enabled = enabled;
        if let Some(behavior) = self.behavior.as_mut() {
            if enabled {
                behavior.on_enable(&mut self.state);
            } else {
                behavior.on_disable(&mut self.state);
            }
        }
    }

    /// Replace the behavior.
    ///
    /// Hook subscriptions are decided when the object starts; a behavior
    /// swapped in later is pruned from hooks it does not answer.
    pub fn set_behavior(&mut self, behavior: Option<Box<dyn Behavior>>) -> Option<Box<dyn Behavior>> {
        std::mem::replace(&mut self.behavior, behavior)
    }

    /// Whether a behavior is attached
    #[must_use]
    pub fn has_behavior(&self) -> bool {
        self.behavior.is_some()
    }
}

impl fmt::Debug for GameObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameObject")
            .field("state", &self.state)
            .field("has_behavior", &self.behavior.is_some())
            .finish()
    }
}
