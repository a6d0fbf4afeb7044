use glam::{EulerRot, Mat4, Vec3};

/// Scale applied to the normalized look pair when steering the camera
pub const LOOK_FACTOR: f32 = 0.5;

pub struct Camera {
    pub eye: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 10.0),
            yaw: 0.0,
            pitch: 0.0,
            fov_y: 75f32.to_radians(),
            aspect: width as f32 / height as f32,
            z_near: 0.1,
            z_far: 1000.0,
        }
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height as f32;
    }

    /// Absolute free-look: orientation follows the held-button pointer
    /// position directly, it does not accumulate across frames.
    pub fn set_look(&mut self, look_x: f32, look_y: f32) {
        self.yaw = look_x * LOOK_FACTOR;
        self.pitch = look_y * LOOK_FACTOR;
    }

    pub fn view_proj(&self) -> Mat4 {
        let rotation = Mat4::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0);
        let view = (Mat4::from_translation(self.eye) * rotation).inverse();
        let proj = Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far);
        proj * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_is_scaled_not_accumulated() {
        let mut camera = Camera::new(800, 600);
        camera.set_look(1.0, -1.0);
        camera.set_look(0.4, 0.2);
        assert_eq!(camera.yaw, 0.2);
        assert_eq!(camera.pitch, 0.1);
    }

    #[test]
    fn view_proj_is_invertible() {
        let camera = Camera::new(800, 600);
        let vp = camera.view_proj();
        assert!(vp.determinant().abs() > f32::EPSILON);
    }
}
