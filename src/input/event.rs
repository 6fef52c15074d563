//! Input events delivered by the host event pump

use glam::Vec2;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

/// Raw input forwarded by a host. Positions are in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// A key went down
    KeyDown(KeyCode),
    /// A key was released
    KeyUp(KeyCode),
    /// A mouse button went down
    MouseDown {
        /// Which button
        button: MouseButton,
        /// Cursor position
        position: Vec2,
    },
    /// A mouse button was released; counts as a click
    MouseUp {
        /// Which button
        button: MouseButton,
        /// Cursor position
        position: Vec2,
    },
    /// The cursor moved
    MouseMove(Vec2),
    /// Wheel scrolled, in lines
    MouseWheel(f32),
    /// The drawable area changed size
    Resized {
        /// New width in pixels
        width: u32,
        /// New height in pixels
        height: u32,
    },
    /// The user asked to close the window
    CloseRequested,
}

/// A click resolved against the active camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseClick {
    /// Button that was released
    pub button: MouseButton,
    /// Cursor position on screen
    pub screen: Vec2,
    /// Cursor position in world space
    pub world: Vec2,
}
