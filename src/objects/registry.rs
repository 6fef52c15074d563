//! Engine-wide object registries
//!
//! One registry of every live object plus one per hook. All of them are
//! weak; only the pending-start list holds strong references, so an object
//! spawned and dropped in the same frame still gets its `start` call.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use smallvec::SmallVec;

use crate::collections::WeakRegistry;
use crate::objects::{GameObject, GameObjectHandle, ObjectId, Transform};

/// Deepest parent chain followed by [`ObjectRegistry::world_transform`]
pub const MAX_HIERARCHY_DEPTH: usize = 64;

type Slots = WeakRegistry<Mutex<GameObject>>;

/// Weak registries of live game objects, partitioned by hook
#[derive(Default)]
pub struct ObjectRegistry {
    all: Slots,
    update: Slots,
    late_update: Slots,
    fixed_update: Slots,
    pending: Vec<GameObjectHandle>,
    graveyard: Vec<GameObjectHandle>,
}

impl ObjectRegistry {
    /// Create empty registries
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an object in a handle and register it.
    ///
    /// The engine does not keep the object alive once it has started; hold on
    /// to the returned handle for as long as the object should exist.
    pub fn spawn(&mut self, object: GameObject) -> GameObjectHandle {
        let handle = Arc::new(Mutex::new(object));
        self.register(&handle);
        handle
    }

    /// Register an existing handle. Returns `false` if it is already live.
    pub fn register(&mut self, handle: &GameObjectHandle) -> bool {
        let id = lock_object(handle).id();
        if !self.all.insert(id.0, handle) {
            return false;
        }
        log::debug!("object {id} registered");
        self.pending.push(Arc::clone(handle));
        true
    }

    /// Remove an object from every registry.
    ///
    /// Its `on_destroy` hook runs at the end of the current variable frame.
    /// Returns `false` if the object is unknown or already gone.
    pub fn destroy(&mut self, id: ObjectId) -> bool {
        let Some(handle) = self.all.get(id.0) else {
            return false;
        };
        self.forget(id);
        self.graveyard.push(handle);
        true
    }

    /// Whether the object is registered and alive
    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.all.contains(id.0)
    }

    /// Look up a live object
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<GameObjectHandle> {
        self.all.get(id.0)
    }

    /// First live object with the given name.
    ///
    /// Objects whose hooks are running right now are skipped.
    pub fn find_by_name(&mut self, name: &str) -> Option<GameObjectHandle> {
        self.all
            .live()
            .into_iter()
            .map(|(_, handle)| handle)
            .find(|handle| peek(handle, |object| object.name() == name).unwrap_or(false))
    }

    /// Every live object carrying the tag.
    ///
    /// Objects whose hooks are running right now are skipped.
    pub fn find_by_tag(&mut self, tag: &str) -> Vec<GameObjectHandle> {
        self.all
            .live()
            .into_iter()
            .map(|(_, handle)| handle)
            .filter(|handle| peek(handle, |object| object.tag() == tag).unwrap_or(false))
            .collect()
    }

    /// Compose `local` with every ancestor's transform.
    ///
    /// The walk stops at a missing parent, at an ancestor that is locked
    /// elsewhere, at a cycle, or after [`MAX_HIERARCHY_DEPTH`] levels.
    #[must_use]
    pub fn world_transform(&self, local: &Transform) -> Transform {
        let mut world = *local;
        let mut visited: SmallVec<[ObjectId; 8]> = SmallVec::new();
        let mut next = local.parent;

        while let Some(parent_id) = next {
            if visited.contains(&parent_id) {
                log::warn!("transform hierarchy cycle at object {parent_id}");
                break;
            }
            if visited.len() >= MAX_HIERARCHY_DEPTH {
                log::warn!("transform hierarchy deeper than {MAX_HIERARCHY_DEPTH} levels");
                break;
            }
            let Some(parent) = self
                .all
                .get(parent_id.0)
                .and_then(|handle| peek(&handle, |object| *object.transform()))
            else {
                break;
            };
            visited.push(parent_id);
            world.multiply(&parent);
            next = parent.parent;
        }

        world.parent = None;
        world
    }

    /// Live objects
    #[must_use]
    pub fn len(&self) -> usize {
        self.all.live_count()
    }

    /// Whether no object is alive
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Objects waiting for their `start` call
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Live subscribers of the update hook
    #[must_use]
    pub fn update_count(&self) -> usize {
        self.update.live_count()
    }

    /// Live subscribers of the late update hook
    #[must_use]
    pub fn late_update_count(&self) -> usize {
        self.late_update.live_count()
    }

    /// Live subscribers of the fixed update hook
    #[must_use]
    pub fn fixed_update_count(&self) -> usize {
        self.fixed_update.live_count()
    }

    /// Drop every registration, including pending starts
    pub fn clear(&mut self) {
        self.all.clear();
        self.update.clear();
        self.late_update.clear();
        self.fixed_update.clear();
        self.pending.clear();
        self.graveyard.clear();
    }

    // ========================================================================
    // Lifecycle plumbing
    // ========================================================================

    pub(crate) fn take_pending(&mut self) -> Vec<GameObjectHandle> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn take_graveyard(&mut self) -> Vec<GameObjectHandle> {
        std::mem::take(&mut self.graveyard)
    }

    pub(crate) fn enroll(
        &mut self,
        id: ObjectId,
        handle: &GameObjectHandle,
        update: bool,
        late_update: bool,
        fixed_update: bool,
    ) {
        if update {
            self.update.insert(id.0, handle);
        }
        if late_update {
            self.late_update.insert(id.0, handle);
        }
        if fixed_update {
            self.fixed_update.insert(id.0, handle);
        }
    }

    pub(crate) fn subscribers(&mut self, hook: super::Hook) -> &mut Slots {
        match hook {
            super::Hook::Update => &mut self.update,
            super::Hook::LateUpdate => &mut self.late_update,
            super::Hook::FixedUpdate => &mut self.fixed_update,
        }
    }

    /// Unregister without scheduling `on_destroy`
    pub(crate) fn forget(&mut self, id: ObjectId) {
        self.all.remove(id.0);
        self.update.remove(id.0);
        self.late_update.remove(id.0);
        self.fixed_update.remove(id.0);
        self.pending
            .retain(|handle| peek(handle, |object| object.id() != id).unwrap_or(true));
    }
}

impl std::fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectRegistry")
            .field("live", &self.len())
            .field("pending", &self.pending.len())
            .field("update", &self.update_count())
            .field("late_update", &self.late_update_count())
            .field("fixed_update", &self.fixed_update_count())
            .finish()
    }
}

/// Lock an object, recovering from a poisoned lock
pub(crate) fn lock_object(handle: &GameObjectHandle) -> MutexGuard<'_, GameObject> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read from an object unless it is locked elsewhere
fn peek<R>(handle: &GameObjectHandle, read: impl FnOnce(&GameObject) -> R) -> Option<R> {
    match handle.try_lock() {
        Ok(guard) => Some(read(&guard)),
        Err(TryLockError::Poisoned(poisoned)) => Some(read(&poisoned.into_inner())),
        Err(TryLockError::WouldBlock) => None,
    }
}
