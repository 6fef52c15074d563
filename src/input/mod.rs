//! Input handling module
//!
//! Host input arrives as [`InputEvent`]s and is folded into the per-frame
//! [`Input`] state by the variable loop.

mod event;
mod state;

pub use event::{InputEvent, MouseClick};
pub use state::Input;
pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;
