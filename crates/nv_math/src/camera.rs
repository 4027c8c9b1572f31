use glam::{Mat4, Vec3};

/// Perspective camera shared by the scene manager and the camera controllers.
///
/// The projection matrix is cached and only refreshed through
/// [`Camera::update_projection`], so callers that change `fov_y`, `near` or
/// `far` directly must refresh it themselves. `set_aspect` refreshes it.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    projection: Mat4,
}

impl Camera {
    /// Create a new camera
    pub fn new(position: Vec3, target: Vec3, aspect: f32) -> Self {
        Self::with_lens(position, target, aspect, 45.0, 0.1, 100.0)
    }

    /// Create a camera with an explicit vertical field of view (degrees) and clip planes
    pub fn with_lens(
        position: Vec3,
        target: Vec3,
        aspect: f32,
        fov_degrees: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let mut camera = Self {
            position,
            target,
            up: Vec3::Y,
            fov_y: fov_degrees.to_radians(),
            aspect,
            near,
            far,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection();
        camera
    }

    /// Aspect ratio for a viewport in pixels. Degenerate heights fall back to 1.0.
    pub fn aspect_for(width: u32, height: u32) -> f32 {
        if width == 0 || height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        }
    }

    /// Apply the vertical-axis flip convention.
    ///
    /// Tracing data is stored with +Y pointing down (image convention), so the
    /// flipped camera uses -Y as its up vector.
    pub fn set_flip_y(&mut self, flip: bool) {
        self.up = if flip { Vec3::NEG_Y } else { Vec3::Y };
    }

    /// Sign of the up vector's Y component (-1.0 when flipped)
    pub fn up_sign(&self) -> f32 {
        self.up.y.signum()
    }

    /// Get the view matrix (world → camera space)
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Get the cached projection matrix (camera → clip space)
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    /// Get the combined view-projection matrix
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }

    /// Recompute the projection matrix from fov, aspect and clip planes
    pub fn update_projection(&mut self) {
        self.projection = Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far);
    }

    /// Update aspect ratio (e.g., on window resize)
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.update_projection();
    }

    /// Distance from the camera to its target
    pub fn distance(&self) -> f32 {
        (self.position - self.target).length()
    }
}
