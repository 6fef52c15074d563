//! Scriptable behavior attached to a game object
//!
//! Every hook is optional. The per-frame hooks are separate traits that a
//! behavior exposes through the `as_*` capability queries; an object is only
//! subscribed to the hooks its behavior answers.
//!
//! # Example
//!
//! ```ignore
//! struct Spin;
//!
//! impl Behavior for Spin {
//!     fn as_update(&mut self) -> Option<&mut dyn Update> {
//!         Some(self)
//!     }
//! }
//!
//! impl Update for Spin {
//!     fn update(&mut self, object: &mut ObjectState, ctx: &mut EngineContext) -> HookResult {
//!         object.transform.rotate_transform(ctx.time.delta_seconds());
//!         Ok(())
//!     }
//! }
//! ```
//!
//! The object is locked while its hooks run. Locking its own handle from
//! inside a hook deadlocks; use the [`ObjectState`] passed in instead.

use crate::core::EngineContext;
use crate::objects::ObjectState;

/// Outcome of a lifecycle hook. Errors are logged and never stop the frame.
pub type HookResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Lifecycle hooks of a game object
pub trait Behavior: Send + 'static {
    /// Runs once, in the first variable frame after the object was spawned
    fn start(&mut self, _object: &mut ObjectState, _ctx: &mut EngineContext) -> HookResult {
        Ok(())
    }

    /// The object was enabled
    fn on_enable(&mut self, _object: &mut ObjectState) {}

    /// The object was disabled
    fn on_disable(&mut self, _object: &mut ObjectState) {}

    /// The object is being removed from the engine
    fn on_destroy(&mut self, _object: &mut ObjectState) {}

    /// Per-frame update capability
    fn as_update(&mut self) -> Option<&mut dyn Update> {
        None
    }

    /// Late update capability
    fn as_late_update(&mut self) -> Option<&mut dyn LateUpdate> {
        None
    }

    /// Fixed-rate update capability
    fn as_fixed_update(&mut self) -> Option<&mut dyn FixedUpdate> {
        None
    }
}

/// Called once per variable frame, after newly spawned objects started
pub trait Update {
    /// Per-frame logic
    fn update(&mut self, object: &mut ObjectState, ctx: &mut EngineContext) -> HookResult;
}

/// Called once per variable frame, after every update
pub trait LateUpdate {
    /// Follow-up logic that needs every update to have run
    fn late_update(&mut self, object: &mut ObjectState, ctx: &mut EngineContext) -> HookResult;
}

/// Called at the fixed rate
pub trait FixedUpdate {
    /// Fixed-step logic
    fn fixed_update(&mut self, object: &mut ObjectState, ctx: &mut EngineContext) -> HookResult;
}
