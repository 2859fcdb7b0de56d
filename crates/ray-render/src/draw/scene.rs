use crate::common::vertex::Vertex;
use ash::vk;
use std::mem::{
    offset_of,
    size_of,
};

/// `VkDrawIndexedIndirectCommand` as it sits in the draw buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct IndirectDraw {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}

pub const INDIRECT_STRIDE: u32 = size_of::<IndirectDraw>() as u32;

/// Byte offsets of the `[indirect | vertices | indices]` regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawBufferLayout {
    pub vertex_offset: vk::DeviceSize,
    pub index_offset: vk::DeviceSize,
    pub size: vk::DeviceSize,
}

impl DrawBufferLayout {
    pub fn new(draw_count: usize, vertex_count: usize, index_count: usize) -> Self {
        let vertex_offset = (draw_count * size_of::<IndirectDraw>()) as vk::DeviceSize;
        let index_offset = vertex_offset + (vertex_count * size_of::<Vertex>()) as vk::DeviceSize;
        let size = index_offset + (index_count * size_of::<u16>()) as vk::DeviceSize;
        Self {
            vertex_offset,
            index_offset,
            size,
        }
    }
}

/// Values for specialization constants 0, 1 and 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct SpecializationData {
    pub draw_count: u32,
    pub vertex_count: u32,
    pub triangle_count: u32,
}

impl SpecializationData {
    pub fn map_entries() -> [vk::SpecializationMapEntry; 3] {
        [
            vk::SpecializationMapEntry::default()
                .constant_id(0)
                .offset(offset_of!(SpecializationData, draw_count) as u32)
                .size(size_of::<u32>()),
            vk::SpecializationMapEntry::default()
                .constant_id(1)
                .offset(offset_of!(SpecializationData, vertex_count) as u32)
                .size(size_of::<u32>()),
            vk::SpecializationMapEntry::default()
                .constant_id(2)
                .offset(offset_of!(SpecializationData, triangle_count) as u32)
                .size(size_of::<u32>()),
        ]
    }
}

/// Static geometry drawn by the geometry subpass.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
    pub draws: Vec<IndirectDraw>,
}

impl Scene {
    /// An octahedron drawn with two instances, then a floor quad and a back
    /// wall quad.
    pub fn demo() -> Self {
        let vertices = vec![
            Vertex::new([-0.5, 0.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 0.0]),
            Vertex::new([0.0, 0.0, -0.5], [0.0, 0.0, -1.0], [0.0, 1.0]),
            Vertex::new([0.5, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0]),
            Vertex::new([0.0, 0.0, 0.5], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex::new([0.0, -0.5, 0.0], [0.0, -1.0, 0.0], [0.5, 0.5]),
            Vertex::new([0.0, 0.5, 0.0], [0.0, 1.0, 0.0], [0.5, 0.5]),
            Vertex::new([-1.0, 1.0, -1.0], [0.0, -1.0, 0.0], [0.0, 0.0]),
            Vertex::new([1.0, 1.0, -1.0], [0.0, -1.0, 0.0], [1.0, 0.0]),
            Vertex::new([1.0, 1.0, 1.0], [0.0, -1.0, 0.0], [1.0, 1.0]),
            Vertex::new([-1.0, 1.0, 1.0], [0.0, -1.0, 0.0], [0.0, 1.0]),
            Vertex::new([-1.0, 1.0, 1.0], [0.0, 0.0, -1.0], [0.0, 1.0]),
            Vertex::new([1.0, 1.0, 1.0], [0.0, 0.0, -1.0], [1.0, 1.0]),
            Vertex::new([1.0, -1.0, 1.0], [0.0, 0.0, -1.0], [1.0, 0.0]),
            Vertex::new([-1.0, -1.0, 1.0], [0.0, 0.0, -1.0], [0.0, 0.0]),
        ];
        #[rustfmt::skip]
        let indices = vec![
            0, 1, 4,
            1, 2, 4,
            2, 3, 4,
            3, 0, 4,
            1, 0, 5,
            2, 1, 5,
            3, 2, 5,
            0, 3, 5,
            6, 7, 8,
            8, 9, 6,
            10, 11, 12,
            12, 13, 10,
        ];
        let draws = vec![
            IndirectDraw {
                index_count: 24,
                instance_count: 1,
                first_index: 0,
                vertex_offset: 0,
                first_instance: 0,
            },
            IndirectDraw {
                index_count: 12,
                instance_count: 1,
                first_index: 24,
                vertex_offset: 0,
                first_instance: 1,
            },
        ];
        Self {
            vertices,
            indices,
            draws,
        }
    }

    /// Same buffers, nothing queued.
    pub fn without_draws(mut self) -> Self {
        self.draws.clear();
        self
    }

    pub fn layout(&self) -> DrawBufferLayout {
        DrawBufferLayout::new(self.draws.len(), self.vertices.len(), self.indices.len())
    }

    /// Draw buffer contents, regions back to back.
    pub fn pack_draw_buffer(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.layout().size as usize);
        bytes.extend_from_slice(bytemuck::cast_slice(&self.draws));
        bytes.extend_from_slice(bytemuck::cast_slice(&self.vertices));
        bytes.extend_from_slice(bytemuck::cast_slice(&self.indices));
        bytes
    }

    /// One `uvec4(i0, i1, i2, 0)` per triangle for the storage buffer.
    pub fn triangle_indices(&self) -> Vec<[u32; 4]> {
        self.indices
            .chunks_exact(3)
            .map(|triangle| {
                [
                    triangle[0] as u32,
                    triangle[1] as u32,
                    triangle[2] as u32,
                    0,
                ]
            })
            .collect()
    }

    pub fn specialization(&self) -> SpecializationData {
        SpecializationData {
            draw_count: self.draws.len() as u32,
            vertex_count: self.vertices.len() as u32,
            triangle_count: (self.indices.len() / 3) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indirect_command_is_twenty_bytes() {
        assert_eq!(INDIRECT_STRIDE, 20);
        assert_eq!(
            size_of::<IndirectDraw>(),
            size_of::<vk::DrawIndexedIndirectCommand>()
        );
    }

    #[test]
    fn regions_are_back_to_back() {
        let scene = Scene::demo();
        let layout = scene.layout();
        assert_eq!(layout.vertex_offset, 40);
        assert_eq!(layout.index_offset, 40 + 14 * 48);
        assert_eq!(layout.size, 40 + 14 * 48 + 36 * 2);
        assert_eq!(scene.pack_draw_buffer().len() as u64, layout.size);
    }

    #[test]
    fn packed_regions_hold_their_data() {
        let scene = Scene::demo();
        let layout = scene.layout();
        let bytes = scene.pack_draw_buffer();

        let second: IndirectDraw = bytemuck::pod_read_unaligned(&bytes[20..40]);
        assert_eq!(second, scene.draws[1]);

        let vertex_start = layout.vertex_offset as usize;
        let first_vertex: Vertex = bytemuck::pod_read_unaligned(&bytes[vertex_start..vertex_start + 48]);
        assert_eq!(first_vertex, scene.vertices[0]);

        let index_start = layout.index_offset as usize;
        assert_eq!(&bytes[index_start..index_start + 2], &0u16.to_ne_bytes());
        assert_eq!(&bytes[bytes.len() - 2..], &10u16.to_ne_bytes());
    }

    #[test]
    fn draws_cover_every_index() {
        let scene = Scene::demo();
        let covered: u32 = scene.draws.iter().map(|draw| draw.index_count).sum();
        assert_eq!(covered as usize, scene.indices.len());
        assert_eq!(scene.draws[1].first_index, scene.draws[0].index_count);
        assert!(scene
            .indices
            .iter()
            .all(|&index| (index as usize) < scene.vertices.len()));
    }

    #[test]
    fn triangles_are_padded_to_uvec4() {
        let triangles = Scene::demo().triangle_indices();
        assert_eq!(triangles.len(), 12);
        assert_eq!(triangles[0], [0, 1, 4, 0]);
        assert_eq!(triangles[11], [12, 13, 10, 0]);
    }

    #[test]
    fn specialization_counts() {
        let data = Scene::demo().specialization();
        assert_eq!(
            data,
            SpecializationData {
                draw_count: 2,
                vertex_count: 14,
                triangle_count: 12,
            }
        );
        let entries = SpecializationData::map_entries();
        assert_eq!(entries.map(|entry| entry.offset), [0, 4, 8]);
        assert_eq!(entries.map(|entry| entry.constant_id), [0, 1, 2]);
    }

    #[test]
    fn empty_scene_keeps_geometry() {
        let scene = Scene::demo().without_draws();
        assert!(scene.draws.is_empty());
        assert_eq!(scene.layout().vertex_offset, 0);
        assert_eq!(scene.specialization().draw_count, 0);
    }
}
