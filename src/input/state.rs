//! Per-frame keyboard and mouse state

use glam::Vec2;
use std::collections::HashSet;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use crate::input::InputEvent;

/// Input state manager
#[derive(Debug, Default)]
pub struct Input {
    /// Currently pressed keys
    pressed_keys: HashSet<KeyCode>,
    /// Keys that went down this frame
    just_pressed_keys: HashSet<KeyCode>,
    /// Keys released this frame
    just_released_keys: HashSet<KeyCode>,
    /// Currently pressed mouse buttons
    pressed_buttons: HashSet<MouseButton>,
    /// Buttons released this frame
    clicked_buttons: HashSet<MouseButton>,
    /// Cursor position in screen pixels
    mouse_position: Vec2,
    /// Cursor movement this frame
    mouse_delta: Vec2,
    /// Wheel lines scrolled this frame
    wheel_delta: f32,
}

impl Input {
    /// Create an empty input state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-frame state. Called at the end of every variable frame.
    pub fn end_frame(&mut self) {
        self.just_pressed_keys.clear();
        self.just_released_keys.clear();
        self.clicked_buttons.clear();
        self.mouse_delta = Vec2::ZERO;
        self.wheel_delta = 0.0;
    }

    /// Fold a host event into the state
    pub fn apply(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::KeyDown(key) => {
                if self.pressed_keys.insert(key) {
                    self.just_pressed_keys.insert(key);
                }
            }
            InputEvent::KeyUp(key) => {
                self.pressed_keys.remove(&key);
                self.just_released_keys.insert(key);
            }
            InputEvent::MouseDown { button, position } => {
                self.move_cursor(position);
                self.pressed_buttons.insert(button);
            }
            InputEvent::MouseUp { button, position } => {
                self.move_cursor(position);
                self.pressed_buttons.remove(&button);
                self.clicked_buttons.insert(button);
            }
            InputEvent::MouseMove(position) => self.move_cursor(position),
            InputEvent::MouseWheel(lines) => self.wheel_delta += lines,
            InputEvent::Resized { .. } | InputEvent::CloseRequested => {}
        }
    }

    fn move_cursor(&mut self, position: Vec2) {
        self.mouse_delta += position - self.mouse_position;
        self.mouse_position = position;
    }

    /// Check if a key is held down
    #[must_use]
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    /// Check if a key went down this frame
    #[must_use]
    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.just_pressed_keys.contains(&key)
    }

    /// Check if a key was released this frame
    #[must_use]
    pub fn is_key_just_released(&self, key: KeyCode) -> bool {
        self.just_released_keys.contains(&key)
    }

    /// Check if a mouse button is held down
    #[must_use]
    pub fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed_buttons.contains(&button)
    }

    /// Check if a mouse button was clicked (released) this frame
    #[must_use]
    pub fn is_mouse_button_clicked(&self, button: MouseButton) -> bool {
        self.clicked_buttons.contains(&button)
    }

    /// Cursor position in screen pixels
    #[must_use]
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    /// Cursor movement this frame
    #[must_use]
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Wheel lines scrolled this frame
    #[must_use]
    pub fn wheel_delta(&self) -> f32 {
        self.wheel_delta
    }
}
