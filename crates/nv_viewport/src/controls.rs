//! Camera controllers.
//!
//! A controller turns user input into camera motion. Input is fed through
//! [`CameraController::handle_input`], whose `true` return is the change
//! notification: the scene manager redraws immediately when it sees it.
//! [`CameraController::update`] is called once per scheduled tick to let
//! damped motion settle.

use std::f32::consts::PI;

use nv_math::{Camera, Quat, Vec2, Vec3};

use crate::config::ControlsConfig;

/// Pending motion below this magnitude is dropped.
const SETTLE_EPSILON: f32 = 1e-5;

/// Closest the camera may get to the up axis, in radians.
const MIN_POLAR_ANGLE: f32 = 0.05;

/// User input understood by camera controllers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ControlInput {
    /// Drag to orbit, in pixels
    Rotate { dx: f32, dy: f32 },
    /// Drag to pan, in pixels
    Pan { dx: f32, dy: f32 },
    /// Wheel motion in lines; positive zooms in
    Zoom { delta: f32 },
}

/// Something that moves a camera in response to input.
pub trait CameraController {
    /// Feed one input event. Returns `true` if the camera changed.
    fn handle_input(&mut self, camera: &mut Camera, input: ControlInput) -> bool;

    /// Advance damped motion by one tick. Returns `true` if the camera moved.
    fn update(&mut self, camera: &mut Camera) -> bool;
}

/// Orbit-style controller with damping.
///
/// Rotation orbits the camera around its target using the camera's up
/// vector as the pole, so the flipped-Y convention is respected. Each input
/// or update applies `damping` of the pending motion; the rest carries over
/// to later updates and decays geometrically.
#[derive(Clone, Debug)]
pub struct OrbitControls {
    pub damping: f32,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pending_rotate: Vec2,
    pending_pan: Vec3,
    pending_zoom: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::from_config(&ControlsConfig::default())
    }
}

impl OrbitControls {
    pub fn from_config(config: &ControlsConfig) -> Self {
        Self {
            damping: config.damping.clamp(0.01, 1.0),
            rotate_speed: config.rotate_speed,
            pan_speed: config.pan_speed,
            zoom_speed: config.zoom_speed,
            min_distance: 1.0,
            max_distance: f32::INFINITY,
            pending_rotate: Vec2::ZERO,
            pending_pan: Vec3::ZERO,
            pending_zoom: 0.0,
        }
    }

    /// Whether motion is still waiting to be applied.
    pub fn is_settling(&self) -> bool {
        self.pending_rotate != Vec2::ZERO || self.pending_pan != Vec3::ZERO || self.pending_zoom != 0.0
    }

    /// Drop any pending motion.
    pub fn stop(&mut self) {
        self.pending_rotate = Vec2::ZERO;
        self.pending_pan = Vec3::ZERO;
        self.pending_zoom = 0.0;
    }

    fn step(&mut self, camera: &mut Camera) -> bool {
        if !self.is_settling() {
            return false;
        }

        let rotate = self.pending_rotate * self.damping;
        let pan = self.pending_pan * self.damping;
        let zoom = self.pending_zoom * self.damping;
        self.pending_rotate -= rotate;
        self.pending_pan -= pan;
        self.pending_zoom -= zoom;
        self.settle();

        let up = camera.up;
        let mut offset = camera.position - camera.target;

        offset = Quat::from_axis_angle(up, -rotate.x) * offset;
        if let Some(right) = offset.cross(up).try_normalize() {
            let polar = offset.normalize().dot(up).clamp(-1.0, 1.0).acos();
            let target_polar = (polar + rotate.y).clamp(MIN_POLAR_ANGLE, PI - MIN_POLAR_ANGLE);
            offset = Quat::from_axis_angle(right, polar - target_polar) * offset;
        }

        let distance = (offset.length() * (-zoom).exp()).clamp(self.min_distance, self.max_distance);
        offset = offset.normalize_or_zero() * distance;

        camera.target += pan;
        camera.position = camera.target + offset;
        true
    }

    fn settle(&mut self) {
        if self.pending_rotate.length() < SETTLE_EPSILON {
            self.pending_rotate = Vec2::ZERO;
        }
        if self.pending_pan.length() < SETTLE_EPSILON {
            self.pending_pan = Vec3::ZERO;
        }
        if self.pending_zoom.abs() < SETTLE_EPSILON {
            self.pending_zoom = 0.0;
        }
    }

    /// World-space pan for a pixel drag, scaled by distance to the target.
    fn pan_offset(&self, camera: &Camera, dx: f32, dy: f32) -> Vec3 {
        let forward = (camera.target - camera.position).normalize_or_zero();
        let right = forward.cross(camera.up).normalize_or_zero();
        let screen_up = right.cross(forward);
        let scale = camera.distance() * self.pan_speed;
        (-dx * right + dy * screen_up) * scale
    }
}

impl CameraController for OrbitControls {
    fn handle_input(&mut self, camera: &mut Camera, input: ControlInput) -> bool {
        match input {
            ControlInput::Rotate { dx, dy } => {
                self.pending_rotate += Vec2::new(dx, dy) * self.rotate_speed;
            }
            ControlInput::Pan { dx, dy } => {
                self.pending_pan += self.pan_offset(camera, dx, dy);
            }
            ControlInput::Zoom { delta } => {
                self.pending_zoom += delta * self.zoom_speed;
            }
        }
        self.step(camera)
    }

    fn update(&mut self, camera: &mut Camera) -> bool {
        self.step(camera)
    }
}
