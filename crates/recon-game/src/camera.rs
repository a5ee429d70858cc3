//! Euler-angle fly camera.

use glam::{Mat4, Vec3};
use recon_core::CameraConfig;

pub const DEFAULT_YAW: f32 = -90.0;
pub const DEFAULT_PITCH: f32 = 0.0;
/// Resting field of view, in degrees.
pub const DEFAULT_ZOOM: f32 = 45.0;
pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 90.0;
pub const PITCH_LIMIT: f32 = 89.0;
pub const NEAR: f32 = 0.1;
pub const FAR: f32 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Movement {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    /// Degrees.
    yaw: f32,
    /// Degrees.
    pitch: f32,
    pub speed: f32,
    pub sensitivity: f32,
    /// Vertical field of view in degrees.
    zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        let mut cam = Self {
            position,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: Vec3::Y,
            yaw: DEFAULT_YAW,
            pitch: DEFAULT_PITCH,
            speed: 10.0,
            sensitivity: 0.1,
            zoom: DEFAULT_ZOOM,
        };
        cam.update_vectors();
        cam
    }

    pub fn from_config(cfg: &CameraConfig) -> Self {
        let mut cam = Self::new(Vec3::from_array(cfg.position));
        cam.speed = cfg.speed;
        cam.sensitivity = cfg.sensitivity;
        cam.zoom = cfg.zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        cam
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// OpenGL clip-space perspective for the current zoom.
    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.zoom.to_radians(), aspect.max(f32::EPSILON), NEAR, FAR)
    }

    /// Forward/backward stay on the ground plane regardless of pitch.
    pub fn process_movement(&mut self, dir: Movement, dt: f32) {
        let velocity = self.speed * dt;
        let flat_front = Vec3::new(self.front.x, 0.0, self.front.z).normalize_or_zero();
        match dir {
            Movement::Forward => self.position += flat_front * velocity,
            Movement::Backward => self.position -= flat_front * velocity,
            Movement::Left => self.position -= self.right * velocity,
            Movement::Right => self.position += self.right * velocity,
            Movement::Up => self.position += self.world_up * velocity,
            Movement::Down => self.position -= self.world_up * velocity,
        }
    }

    /// `dy` is positive upwards (callers flip window-space y).
    pub fn process_mouse(&mut self, dx: f32, dy: f32, constrain_pitch: bool) {
        self.yaw += dx * self.sensitivity;
        self.pitch += dy * self.sensitivity;
        if constrain_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }
        self.update_vectors();
    }

    /// Positive offsets narrow the field of view.
    pub fn process_zoom(&mut self, offset: f32) {
        self.zoom = (self.zoom - offset).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Widen back toward the resting FOV by `step` degrees, never past it.
    pub fn relax_zoom(&mut self, step: f32) {
        if self.zoom < DEFAULT_ZOOM {
            self.zoom = (self.zoom + step).min(DEFAULT_ZOOM);
        }
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
            .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}
