//! Game objects and their lifecycle
//!
//! Objects are owned by whoever holds their [`GameObjectHandle`]. The engine
//! only keeps weak references, sorted by which lifecycle hooks an object
//! answers to, so dropping the last handle is enough to retire an object.

mod behavior;
mod game_object;
mod lifecycle;
mod registry;
mod transform;

pub use behavior::{Behavior, FixedUpdate, HookResult, LateUpdate, Update};
pub use game_object::{GameObject, GameObjectHandle, ObjectId, ObjectState};
pub(crate) use lifecycle::{Hook, flush_destroyed, init_pending, panic_message, run_hook};
pub use registry::ObjectRegistry;
pub use transform::Transform;
