//! 2D camera with smooth panning and bounded zoom
//!
//! The camera keeps two positions: where it is now and where it is heading.
//! Each [`Camera::tick`] moves the current position toward the active pan
//! target, or toward the immediate target when no pan is running.

use glam::Vec2;
use thiserror::Error;

use crate::math::Bounds;
use crate::objects::Transform;

/// Sentinel for a disabled zoom bound
pub const UNBOUNDED: f32 = -1.0;

/// Distance on both axes at which a pan snaps and ends
pub const SNAP_EPSILON: f32 = 5.0;

/// Errors raised by camera configuration
#[derive(Debug, Error, PartialEq)]
pub enum CameraError {
    /// Zoom bounds must be positive or the unbounded sentinel
    #[error("zoom bound must be > 0 or -1, got {0}")]
    InvalidZoomBound(f32),
    /// Scale must be positive
    #[error("camera scale must be > 0, got {0}")]
    InvalidScale(f32),
}

/// What the camera is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    /// Resting at its target
    Idle,
    /// Interpolating toward a `go_to` destination
    Panning,
    /// Following directional nudges or a direct target
    FreeMove,
}

/// Position and zoom reported after every tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSnapshot {
    /// Camera position
    pub position: Vec2,
    /// Zoom factor
    pub scale: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pan {
    start: Vec2,
    end: Vec2,
}

/// 2D camera
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec2,
    /// Immediate target used outside of pans
    new_position: Vec2,
    pan: Option<Pan>,
    scale: f32,
    max_zoom_in: f32,
    max_zoom_out: f32,
    default_speed: f32,
    /// Interpolation factor per second of frame time
    movement_time: f32,
    center_point: Vec2,
    viewport: Vec2,
    world: Option<Bounds>,
}

impl Camera {
    /// Create a camera for a viewport of the given pixel size
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let mut camera = Self {
            position: Vec2::ZERO,
            new_position: Vec2::ZERO,
            pan: None,
            scale: 1.0,
            max_zoom_in: UNBOUNDED,
            max_zoom_out: UNBOUNDED,
            default_speed: 1.0,
            movement_time: 3.0,
            center_point: Vec2::ZERO,
            viewport: Vec2::ZERO,
            world: None,
        };
        camera.set_viewport(width, height);
        camera
    }

    /// Current position
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Immediate target position
    #[must_use]
    pub fn target(&self) -> Vec2 {
        self.new_position
    }

    /// Current zoom factor
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Upper zoom bound, or [`UNBOUNDED`]
    #[must_use]
    pub fn max_zoom_in(&self) -> f32 {
        self.max_zoom_in
    }

    /// Lower zoom bound, or [`UNBOUNDED`]
    #[must_use]
    pub fn max_zoom_out(&self) -> f32 {
        self.max_zoom_out
    }

    /// Viewport center in screen pixels
    #[must_use]
    pub fn center_point(&self) -> Vec2 {
        self.center_point
    }

    /// Pan destination, if panning
    #[must_use]
    pub fn pan_target(&self) -> Option<Vec2> {
        self.pan.map(|p| p.end)
    }

    /// Current movement state
    #[must_use]
    pub fn state(&self) -> CameraState {
        if self.pan.is_some() {
            CameraState::Panning
        } else if self.position != self.new_position {
            CameraState::FreeMove
        } else {
            CameraState::Idle
        }
    }

    /// Position and scale as reported to listeners
    #[must_use]
    pub fn snapshot(&self) -> CameraSnapshot {
        CameraSnapshot {
            position: self.position,
            scale: self.scale,
        }
    }

    /// Update the viewport size; the center point follows
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Vec2::new(width as f32, height as f32);
        self.center_point = Vec2::new((width / 2) as f32, (height / 2) as f32);
    }

    /// Speed used by the directional nudges without an explicit speed
    pub fn set_default_speed(&mut self, speed: f32) {
        self.default_speed = speed;
    }

    /// Interpolation factor applied per second
    pub fn set_movement_time(&mut self, movement_time: f32) {
        self.movement_time = movement_time;
    }

    /// Restrict camera movement to a world rectangle, or lift the restriction
    pub fn set_world_bounds(&mut self, world: Option<Bounds>) {
        self.world = world;
    }

    /// Check a candidate camera position against the world rectangle.
    ///
    /// Always true when no world rectangle is set.
    #[must_use]
    pub fn is_inside_world_borders(&self, position: Vec2) -> bool {
        self.world.is_none_or(|world| world.contains(position))
    }

    /// World-space rectangle currently visible through the viewport
    #[must_use]
    pub fn visible_region(&self) -> Bounds {
        Bounds::new(
            -self.center_point / self.scale - self.position,
            self.viewport / self.scale,
        )
    }

    // ========================================================================
    // Movement
    // ========================================================================

    /// Cancel any pan and set the immediate target.
    ///
    /// Ignored when the target lies outside the world rectangle.
    pub fn set_new_position(&mut self, position: Vec2) -> bool {
        if !self.is_inside_world_borders(position) {
            return false;
        }
        self.pan = None;
        self.new_position = position;
        true
    }

    /// Start a smooth pan toward `destination`.
    ///
    /// Nothing happens if the camera is already there or the destination is
    /// outside the world rectangle.
    pub fn go_to(&mut self, destination: Vec2) -> bool {
        if self.position == destination || !self.is_inside_world_borders(destination) {
            return false;
        }
        self.pan = Some(Pan {
            start: self.position,
            end: destination,
        });
        true
    }

    /// Jump straight to `position` without interpolation
    pub fn teleport_to(&mut self, position: Vec2) -> bool {
        if !self.is_inside_world_borders(position) {
            return false;
        }
        self.pan = None;
        self.position = position;
        self.new_position = position;
        true
    }

    /// Nudge up at the default speed
    pub fn up(&mut self) -> f32 {
        self.up_by(self.default_speed)
    }

    /// Nudge down at the default speed
    pub fn down(&mut self) -> f32 {
        self.down_by(self.default_speed)
    }

    /// Nudge left at the default speed
    pub fn left(&mut self) -> f32 {
        self.left_by(self.default_speed)
    }

    /// Nudge right at the default speed
    pub fn right(&mut self) -> f32 {
        self.right_by(self.default_speed)
    }

    /// Raise the immediate target by `speed`; returns the applied speed or 0
    pub fn up_by(&mut self, speed: f32) -> f32 {
        self.nudge(Vec2::new(0.0, speed), speed)
    }

    /// Lower the immediate target by `speed`; returns the applied speed or 0
    pub fn down_by(&mut self, speed: f32) -> f32 {
        self.nudge(Vec2::new(0.0, -speed), speed)
    }

    /// Shift the world left. The camera offset grows along x because the
    /// position is added to every world point when drawing.
    pub fn left_by(&mut self, speed: f32) -> f32 {
        self.nudge(Vec2::new(speed, 0.0), speed)
    }

    /// Shift the world right; returns the applied speed or 0
    pub fn right_by(&mut self, speed: f32) -> f32 {
        self.nudge(Vec2::new(-speed, 0.0), speed)
    }

    fn nudge(&mut self, delta: Vec2, speed: f32) -> f32 {
        if !self.is_inside_world_borders(self.position + delta) {
            return 0.0;
        }
        self.stop_pan();
        self.new_position += delta;
        speed
    }

    /// Abort a running pan, freezing the target at the current position
    pub fn stop_pan(&mut self) {
        if self.pan.take().is_some() {
            self.new_position = self.position;
        }
    }

    /// Advance by one frame of `delta_seconds`.
    ///
    /// Returns the post-tick snapshot. A snapshot is produced on every tick,
    /// even when nothing moved.
    pub fn tick(&mut self, delta_seconds: f32) -> CameraSnapshot {
        let by = (delta_seconds * self.movement_time).clamp(0.0, 1.0);
        match self.pan {
            Some(pan) => {
                self.position = self.position.lerp(pan.end, by);
                if within(self.position, pan.end, SNAP_EPSILON) {
                    log::trace!("Camera pan from {} reached {}", pan.start, pan.end);
                    self.pan = None;
                    self.new_position = self.position;
                }
            }
            None => self.position = self.position.lerp(self.new_position, by),
        }
        self.snapshot()
    }

    // ========================================================================
    // Zoom
    // ========================================================================

    /// Set the zoom factor directly, bypassing the zoom bounds
    pub fn set_scale(&mut self, scale: f32) -> Result<(), CameraError> {
        if scale <= 0.0 {
            return Err(CameraError::InvalidScale(scale));
        }
        self.scale = scale;
        Ok(())
    }

    /// Add `delta` to the zoom factor if the result respects every bound
    pub fn change_scale(&mut self, delta: f32) -> bool {
        let scale = self.scale + delta;
        if !self.is_scale_allowed(scale) {
            return false;
        }
        self.scale = scale;
        true
    }

    /// Set the largest allowed zoom factor, or [`UNBOUNDED`]
    pub fn set_max_zoom_in(&mut self, max: f32) -> Result<(), CameraError> {
        validate_bound(max)?;
        self.max_zoom_in = max;
        if max != UNBOUNDED && self.scale > max {
            self.scale = max;
        }
        Ok(())
    }

    /// Set the smallest allowed zoom factor, or [`UNBOUNDED`]
    pub fn set_max_zoom_out(&mut self, min: f32) -> Result<(), CameraError> {
        validate_bound(min)?;
        self.max_zoom_out = min;
        if min != UNBOUNDED && self.scale < min {
            self.scale = min;
        }
        Ok(())
    }

    fn is_scale_allowed(&self, scale: f32) -> bool {
        scale > 0.0
            && (self.max_zoom_out == UNBOUNDED || scale >= self.max_zoom_out)
            && (self.max_zoom_in == UNBOUNDED || scale <= self.max_zoom_in)
    }

    // ========================================================================
    // Projection
    // ========================================================================

    /// Composite draw transform: viewport center, then zoom, then camera
    /// position in zoomed units
    #[must_use]
    pub fn transform(&self) -> Transform {
        let mut transform = Transform::new();
        transform.translate_scaled(self.center_point);
        transform.scale_uniform(self.scale);
        transform.translate_scaled(self.position);
        transform
    }

    /// Map a screen pixel to world coordinates
    #[must_use]
    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        self.transform().apply_inverse(screen)
    }

    /// Map a world point to screen pixels
    #[must_use]
    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        self.transform().apply(world)
    }
}

fn validate_bound(value: f32) -> Result<(), CameraError> {
    if value == UNBOUNDED || value > 0.0 {
        Ok(())
    } else {
        Err(CameraError::InvalidZoomBound(value))
    }
}

/// Strict box test: `a` lies less than `d` from `b` on both axes
fn within(a: Vec2, b: Vec2, d: f32) -> bool {
    a.x < b.x + d && a.x + d > b.x && a.y < b.y + d && a.y + d > b.y
}

// ============================================================================
// Camera Registry
// ============================================================================

/// Cameras owned by the engine, one of which is active
#[derive(Debug, Clone)]
pub struct Cameras {
    cameras: Vec<Camera>,
    active: usize,
}

impl Cameras {
    /// Registry holding a single camera for the given viewport
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            cameras: vec![Camera::new(width, height)],
            active: 0,
        }
    }

    /// Add a camera and return its index
    pub fn add(&mut self, camera: Camera) -> usize {
        self.cameras.push(camera);
        self.cameras.len() - 1
    }

    /// Make another camera active. Returns false for an unknown index.
    pub fn set_active(&mut self, index: usize) -> bool {
        if index < self.cameras.len() {
            self.active = index;
            true
        } else {
            false
        }
    }

    /// Index of the active camera
    #[must_use]
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// The active camera
    #[must_use]
    pub fn active(&self) -> &Camera {
        &self.cameras[self.active]
    }

    /// The active camera, mutably
    pub fn active_mut(&mut self) -> &mut Camera {
        &mut self.cameras[self.active]
    }

    /// Camera by index
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Camera> {
        self.cameras.get(index)
    }

    /// Camera by index, mutably
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Camera> {
        self.cameras.get_mut(index)
    }

    /// Number of cameras
    #[must_use]
    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    /// Always false; the registry keeps at least one camera
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    /// Propagate a viewport resize to every camera
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        for camera in &mut self.cameras {
            camera.set_viewport(width, height);
        }
    }

    /// Tick every camera and collect their snapshots by index
    pub fn tick_all(&mut self, delta_seconds: f32) -> Vec<(usize, CameraSnapshot)> {
        self.cameras
            .iter_mut()
            .enumerate()
            .map(|(index, camera)| (index, camera.tick(delta_seconds)))
            .collect()
    }
}
