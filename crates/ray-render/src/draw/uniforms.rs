use bytemuck::{
    Pod,
    Zeroable,
};
use nalgebra_glm::{
    Mat4,
    Vec3,
};

/// Per-draw uniforms, std140: two matrices, the camera position and the
/// texture slot packed into its padding.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct StandardUniforms {
    pub model: [[f32; 4]; 4],
    pub vp: [[f32; 4]; 4],
    pub cam_pos: [f32; 3],
    pub texture: u32,
}

impl Default for StandardUniforms {
    fn default() -> Self {
        let identity: [[f32; 4]; 4] = Mat4::identity().into();
        Self {
            model: identity,
            vp: identity,
            cam_pos: [0.0; 3],
            texture: 0,
        }
    }
}

impl StandardUniforms {
    pub fn new(model: &Mat4, view_proj: &Mat4, cam_pos: &Vec3, texture: u32) -> Self {
        Self {
            model: (*model).into(),
            vp: (*view_proj).into(),
            cam_pos: (*cam_pos).into(),
            texture,
        }
    }
}

/// Camera position for the lighting pass. A `vec3` uniform occupies 16 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct CameraUniform {
    pub position: [f32; 3],
    _pad: f32,
}

impl CameraUniform {
    pub fn new(position: &Vec3) -> Self {
        Self {
            position: (*position).into(),
            _pad: 0.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{
        offset_of,
        size_of,
    };

    #[test]
    fn standard_uniforms_match_std140() {
        assert_eq!(size_of::<StandardUniforms>(), 144);
        assert_eq!(offset_of!(StandardUniforms, vp), 64);
        assert_eq!(offset_of!(StandardUniforms, cam_pos), 128);
        assert_eq!(offset_of!(StandardUniforms, texture), 140);
    }

    #[test]
    fn camera_uniform_is_padded() {
        assert_eq!(size_of::<CameraUniform>(), 16);
        let camera = CameraUniform::new(&Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(camera.position(), Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn matrices_are_column_major() {
        let model = nalgebra_glm::translate(&Mat4::identity(), &Vec3::new(1.0, 2.0, 3.0));
        let uniforms = StandardUniforms::new(&model, &Mat4::identity(), &Vec3::zeros(), 1);
        assert_eq!(uniforms.model[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(uniforms.texture, 1);
    }
}
