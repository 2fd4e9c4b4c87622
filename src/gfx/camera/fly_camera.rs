//! First-person fly camera driven by keyboard, mouse and scroll input

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Vector3};

/// Default heading, looking down the negative Z axis.
pub const YAW: f32 = -90.0;
pub const PITCH: f32 = 0.0;
/// World units per second.
pub const SPEED: f32 = 2.5;
/// Degrees per pixel of mouse travel.
pub const SENSITIVITY: f32 = 0.1;
pub const ZOOM: f32 = 45.0;
pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 45.0;
pub const PITCH_LIMIT: f32 = 89.0;

/// Planar movement directions relative to the camera orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

/// Fly camera with Euler-angle orientation.
///
/// `front`, `right` and `up` always form an orthonormal, right-handed basis;
/// they are recomputed whenever yaw or pitch changes, which is why the angles
/// are only reachable through methods.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vector3<f32>,
    front: Vector3<f32>,
    up: Vector3<f32>,
    right: Vector3<f32>,
    world_up: Vector3<f32>,
    yaw: f32,
    pitch: f32,
    zoom: f32,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
}

impl Camera {
    /// Creates a camera at `position` with the default heading and zoom.
    pub fn new(position: Vector3<f32>) -> Self {
        Self::with_orientation(position, YAW, PITCH)
    }

    /// Creates a camera with an explicit yaw and pitch in degrees.
    pub fn with_orientation(position: Vector3<f32>, yaw: f32, pitch: f32) -> Self {
        let mut camera = Self {
            position,
            front: Vector3::new(0.0, 0.0, -1.0),
            up: Vector3::unit_y(),
            right: Vector3::unit_x(),
            world_up: Vector3::unit_y(),
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            zoom: ZOOM,
            movement_speed: SPEED,
            mouse_sensitivity: SENSITIVITY,
        };
        camera.update_camera_vectors();
        camera
    }

    /// Moves along the front or right vector, scaled by speed and `dt`.
    pub fn process_keyboard(&mut self, direction: CameraMovement, dt: f32) {
        let velocity = self.movement_speed * dt;
        match direction {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
        }
    }

    /// Applies a pixel delta to yaw and pitch. Pitch is clamped to avoid the
    /// view flipping over the pole; yaw is left unbounded.
    pub fn process_mouse_movement(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.mouse_sensitivity;
        self.pitch = (self.pitch + dy * self.mouse_sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_camera_vectors();
    }

    /// Adjusts the field of view by `dy` degrees within [`MIN_ZOOM`, `MAX_ZOOM`].
    pub fn process_mouse_scroll(&mut self, dy: f32) {
        self.zoom = (self.zoom + dy).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Right-handed look-at transform from the current position and heading.
    pub fn get_view_matrix(&self) -> Matrix4<f32> {
        let eye = Point3::from_vec(self.position);
        Matrix4::look_at_rh(eye, eye + self.front, self.up)
    }

    pub fn front(&self) -> Vector3<f32> {
        self.front
    }

    pub fn right(&self) -> Vector3<f32> {
        self.right
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Vertical field of view in degrees.
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    fn update_camera_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vector3::new(
            pitch.cos() * yaw.cos(),
            pitch.sin(),
            pitch.cos() * yaw.sin(),
        )
        .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vector3::new(0.0, 0.0, 0.0))
    }
}
