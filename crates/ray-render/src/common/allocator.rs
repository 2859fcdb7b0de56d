//! Manual memory packing: several resources share one allocation at
//! alignment-rounded offsets, bound once and never resized.

use super::memory::MemoryProperties;
use crate::error::{
    SetupError,
    Stage,
};
use anyhow::{
    Context as _,
    Result,
};
use ash::vk;

/// Rounds `value` up to a multiple of `alignment`. Zero alignment is treated
/// as one.
pub fn align_up(value: vk::DeviceSize, alignment: vk::DeviceSize) -> vk::DeviceSize {
    let alignment = alignment.max(1);
    match value % alignment {
        0 => value,
        rest => value + (alignment - rest),
    }
}

pub fn align_down(value: vk::DeviceSize, alignment: vk::DeviceSize) -> vk::DeviceSize {
    let alignment = alignment.max(1);
    value - value % alignment
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedLayout {
    pub offsets: Vec<vk::DeviceSize>,
    pub size: vk::DeviceSize,
}

/// Places `(size, alignment)` entries back to back in order, each at the
/// running offset rounded up to its alignment.
pub fn pack_offsets(entries: &[(vk::DeviceSize, vk::DeviceSize)]) -> PackedLayout {
    let mut offsets = Vec::with_capacity(entries.len());
    let mut size = 0;
    for &(entry_size, alignment) in entries.iter() {
        let offset = align_up(size, alignment);
        offsets.push(offset);
        size = offset + entry_size;
    }
    PackedLayout { offsets, size }
}

/// Memory types every requirement accepts.
pub fn combined_type_bits(requirements: &[vk::MemoryRequirements]) -> u32 {
    requirements
        .iter()
        .fold(u32::MAX, |bits, requirement| bits & requirement.memory_type_bits)
}

/// One device allocation backing several images.
pub struct PackedImageMemory {
    memory: vk::DeviceMemory,
    layout: PackedLayout,
    device: ash::Device,
}

impl PackedImageMemory {
    /// Allocates a single block for `images` and binds each at its offset.
    /// Bind failures surface with `bind_status`.
    pub fn new(
        images: &[vk::Image],
        required_properties: vk::MemoryPropertyFlags,
        memory_properties: &MemoryProperties,
        device: ash::Device,
        allocate_status: i32,
        bind_status: i32,
    ) -> Result<Self> {
        let requirements = images
            .iter()
            .map(|&image| unsafe { device.get_image_memory_requirements(image) })
            .collect::<Vec<_>>();
        let layout = pack_offsets(
            &requirements
                .iter()
                .map(|requirement| (requirement.size, requirement.alignment))
                .collect::<Vec<_>>(),
        );
        let type_bits = combined_type_bits(&requirements);
        let memory_type_index = memory_properties.find_memory_type(type_bits, required_properties)?;

        log::debug!(
            "packing {} images into {} bytes at {:?} (memory type {})",
            images.len(),
            layout.size,
            layout.offsets,
            memory_type_index
        );

        let alloc_info = vk::MemoryAllocateInfo::default()
            .allocation_size(layout.size)
            .memory_type_index(memory_type_index);
        let memory = unsafe { device.allocate_memory(&alloc_info, None) }.context(
            SetupError::resource(Stage::RendererCreate, "image memory", allocate_status),
        )?;
        let packed = Self {
            memory,
            layout,
            device,
        };

        for (&image, &offset) in images.iter().zip(packed.layout.offsets.iter()) {
            unsafe { packed.device.bind_image_memory(image, packed.memory, offset) }.context(
                SetupError::resource(Stage::RendererCreate, "image memory binding", bind_status),
            )?;
        }
        Ok(packed)
    }

    pub fn layout(&self) -> &PackedLayout {
        &self.layout
    }
}

impl Drop for PackedImageMemory {
    fn drop(&mut self) {
        unsafe {
            self.device.free_memory(self.memory, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_layout(entries: &[(vk::DeviceSize, vk::DeviceSize)]) {
        let layout = pack_offsets(entries);
        assert_eq!(layout.offsets.len(), entries.len());
        if entries.is_empty() {
            assert_eq!(layout.size, 0);
            return;
        }
        assert_eq!(layout.offsets[0], 0);
        for i in 0..entries.len() {
            let (size, alignment) = entries[i];
            assert_eq!(layout.offsets[i] % alignment.max(1), 0);
            if i > 0 {
                assert!(layout.offsets[i] >= layout.offsets[i - 1] + entries[i - 1].0);
            }
            if i == entries.len() - 1 {
                assert_eq!(layout.size, layout.offsets[i] + size);
            }
        }
    }

    #[test]
    fn offsets_respect_alignment_and_order() {
        // depth, color, position, normal as a driver might report them
        let entries = [(3_686_400, 4096), (3_686_400, 1024), (7_372_800, 65536), (3_686_400, 256)];
        let layout = pack_offsets(&entries);
        assert_eq!(layout.offsets, vec![0, 3_686_400, 7_405_568, 14_778_368]);
        assert_eq!(layout.size, 18_464_768);
        check_layout(&entries);
    }

    #[test]
    fn invariants_hold_for_assorted_inputs() {
        let cases: [&[(vk::DeviceSize, vk::DeviceSize)]; 5] = [
            &[],
            &[(1, 1)],
            &[(1, 1), (1, 256), (3, 4), (7, 8)],
            &[(4096, 4096), (4096, 4096)],
            &[(100, 64), (1, 128), (129, 1), (0, 512), (17, 16)],
        ];
        for entries in cases.iter() {
            check_layout(entries);
        }
    }

    #[test]
    fn already_aligned_offsets_are_unchanged() {
        assert_eq!(align_up(512, 256), 512);
        assert_eq!(align_up(513, 256), 768);
        assert_eq!(align_down(513, 256), 512);
        assert_eq!(align_up(7, 0), 7);
    }

    #[test]
    fn type_bits_are_intersected() {
        let requirements = [
            vk::MemoryRequirements {
                size: 16,
                alignment: 16,
                memory_type_bits: 0b1110,
            },
            vk::MemoryRequirements {
                size: 16,
                alignment: 16,
                memory_type_bits: 0b0111,
            },
        ];
        assert_eq!(combined_type_bits(&requirements), 0b0110);
    }
}
