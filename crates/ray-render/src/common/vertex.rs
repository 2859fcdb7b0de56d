use ash::vk;
use std::mem::offset_of;

/// Matches the shader-side `Vertex` in both the vertex input and the
/// std430 storage buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Vertex {
    pub position: [f32; 4],
    pub normal: [f32; 4],
    pub tex_coords: [f32; 4],
}

impl Vertex {
    pub const fn new(position: [f32; 3], normal: [f32; 3], tex_coords: [f32; 2]) -> Self {
        Self {
            position: [position[0], position[1], position[2], 1.0],
            normal: [normal[0], normal[1], normal[2], 0.0],
            tex_coords: [tex_coords[0], tex_coords[1], 0.0, 0.0],
        }
    }

    pub fn get_binding_descriptions() -> Vec<vk::VertexInputBindingDescription> {
        vec![vk::VertexInputBindingDescription::default()
            .binding(0)
            .stride(std::mem::size_of::<Vertex>() as u32)
            .input_rate(vk::VertexInputRate::VERTEX)]
    }

    pub fn get_attribute_descriptions() -> Vec<vk::VertexInputAttributeDescription> {
        vec![
            vk::VertexInputAttributeDescription::default()
                .binding(0)
                .location(0)
                .format(vk::Format::R32G32B32A32_SFLOAT)
                .offset(offset_of!(Vertex, position) as u32),
            vk::VertexInputAttributeDescription::default()
                .binding(0)
                .location(1)
                .format(vk::Format::R32G32B32A32_SFLOAT)
                .offset(offset_of!(Vertex, normal) as u32),
            vk::VertexInputAttributeDescription::default()
                .binding(0)
                .location(2)
                .format(vk::Format::R32G32B32A32_SFLOAT)
                .offset(offset_of!(Vertex, tex_coords) as u32),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_are_three_vec4s() {
        assert_eq!(std::mem::size_of::<Vertex>(), 48);
        assert_eq!(Vertex::get_binding_descriptions()[0].stride, 48);

        let offsets = Vertex::get_attribute_descriptions()
            .iter()
            .map(|attribute| (attribute.location, attribute.offset))
            .collect::<Vec<_>>();
        assert_eq!(offsets, vec![(0, 0), (1, 16), (2, 32)]);
    }

    #[test]
    fn homogeneous_components() {
        let vertex = Vertex::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.5, 0.25]);
        assert_eq!(vertex.position[3], 1.0);
        assert_eq!(vertex.normal[3], 0.0);
        assert_eq!(vertex.tex_coords, [0.5, 0.25, 0.0, 0.0]);
    }
}
