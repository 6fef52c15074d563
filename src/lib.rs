//! A 2D game engine built in Rust
//!
//! This engine provides:
//! - Software rendering into an off-screen ARGB frame buffer
//! - A five-level rendering queue with deferred show and hide
//! - Cameras with smooth panning and bounded zoom
//! - Game objects with weakly held update, late update and fixed update hooks
//! - A variable-rate frame loop and a fixed-rate logic loop on tokio

pub mod ai;
pub mod collections;
pub mod core;
pub mod input;
pub mod math;
pub mod objects;
pub mod renderer;

// Re-exports for convenience
pub use glam;
pub use winit;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::core::{
        Engine, EngineConfig, EngineContext, EngineError, EngineEvent, EngineHandle, Game,
        HeadlessHost, Host,
    };
    pub use crate::input::{Input, InputEvent, KeyCode, MouseButton, MouseClick};
    pub use crate::math::{Bounds, Rect};
    pub use crate::objects::{
        Behavior, FixedUpdate, GameObject, GameObjectHandle, HookResult, LateUpdate, ObjectId,
        ObjectState, Transform, Update,
    };
    pub use crate::renderer::{
        Bitmap, Camera, Color, Paintable, Sprite, SpriteHandle, Transparency,
    };
    pub use glam::{Vec2, Vec3};
}
