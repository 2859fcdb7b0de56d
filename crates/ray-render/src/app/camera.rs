use nalgebra_glm::{
    Mat4,
    Vec3,
};
use std::f32::consts::FRAC_PI_2;

const FOV_Y: f32 = FRAC_PI_2;
const ASPECT_WIDTH: f32 = 16.0;
const ASPECT_HEIGHT: f32 = 9.0;
const NEAR_Z: f32 = 0.1;
const FAR_Z: f32 = 100.0;

/// Radians of yaw per pixel of cursor travel.
const MOUSE_SENSITIVITY: f32 = -0.005;
/// World units per second.
const MOVE_SPEED: f32 = 1.5;

fn yaw_axis() -> Vec3 {
    Vec3::new(0.0, -1.0, 0.0)
}

/// Free-flying camera that only turns about the vertical axis.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    yaw: f32,
    projection: Mat4,
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        // left-handed, depth 0..1
        let projection =
            nalgebra_glm::perspective_fov_lh_zo(FOV_Y, ASPECT_WIDTH, ASPECT_HEIGHT, NEAR_Z, FAR_Z);
        Self {
            position,
            yaw: 0.0,
            projection,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn turn(&mut self, cursor_dx: f32) {
        self.yaw += cursor_dx * MOUSE_SENSITIVITY;
    }

    /// Moves along the camera's own right/forward axes.
    pub fn advance(&mut self, right: f32, forward: f32, seconds: f32) {
        let local = Vec3::new(right, 0.0, forward);
        let world = nalgebra_glm::rotate_vec3(&local, self.yaw, &yaw_axis());
        self.position += world * MOVE_SPEED * seconds;
    }

    pub fn view(&self) -> Mat4 {
        let transform = nalgebra_glm::translation(&self.position)
            * nalgebra_glm::rotation(self.yaw, &yaw_axis());
        nalgebra_glm::inverse(&transform)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection * self.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn forward_is_positive_z_before_turning() {
        let mut camera = Camera::new(Vec3::new(0.0, 0.0, -1.0));
        camera.advance(0.0, 1.0, 1.0);
        let position = camera.position();
        assert!((position.z - (-1.0 + MOVE_SPEED)).abs() < EPSILON);
        assert!(position.x.abs() < EPSILON);
    }

    #[test]
    fn turning_rotates_movement() {
        let mut camera = Camera::new(Vec3::zeros());
        camera.turn(FRAC_PI_2 / MOUSE_SENSITIVITY);
        camera.advance(0.0, 1.0, 1.0 / MOVE_SPEED);
        let position = camera.position();
        assert!((position.x + 1.0).abs() < EPSILON, "{position:?}");
        assert!(position.z.abs() < EPSILON, "{position:?}");
    }

    #[test]
    fn view_moves_the_camera_to_the_origin() {
        let camera = Camera::new(Vec3::new(1.0, 2.0, 3.0));
        let eye = camera.view() * nalgebra_glm::vec4(1.0, 2.0, 3.0, 1.0);
        assert!(eye.xyz().norm() < EPSILON);
    }
}
