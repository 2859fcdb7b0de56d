use crate::error::SetupError;
use anyhow::Result;
use ash::vk;

/// Lowest-indexed memory type allowed by `type_filter` whose flags include
/// all of `required_properties`.
pub fn find_memory_type(
    type_filter: u32,
    required_properties: vk::MemoryPropertyFlags,
    memory_types: &[vk::MemoryType],
) -> Option<u32> {
    memory_types
        .iter()
        .take(vk::MAX_MEMORY_TYPES)
        .enumerate()
        .find(|(type_i, mem_type)| {
            type_filter & (1 << type_i) != 0
                && mem_type.property_flags.contains(required_properties)
        })
        .map(|(type_i, _)| type_i as u32)
}

/// Memory layout snapshot taken once at device selection.
#[derive(Debug, Clone, Copy)]
pub struct MemoryProperties {
    properties: vk::PhysicalDeviceMemoryProperties,
}

impl MemoryProperties {
    pub fn query(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> Self {
        let properties = unsafe { instance.get_physical_device_memory_properties(physical_device) };
        Self { properties }
    }

    pub fn memory_types(&self) -> &[vk::MemoryType] {
        &self.properties.memory_types[..self.properties.memory_type_count as usize]
    }

    pub fn find_memory_type(
        &self,
        type_filter: u32,
        required_properties: vk::MemoryPropertyFlags,
    ) -> Result<u32> {
        find_memory_type(type_filter, required_properties, self.memory_types()).ok_or_else(|| {
            SetupError::NoMemoryType {
                type_bits: type_filter,
                flags: required_properties,
            }
            .into()
        })
    }
}

/// Dedicated allocation freed on drop.
pub struct DeviceMemory {
    memory: vk::DeviceMemory,
    device: ash::Device,
}

impl DeviceMemory {
    pub fn allocate(
        size: vk::DeviceSize,
        memory_type_index: u32,
        device: ash::Device,
    ) -> Result<Self> {
        let alloc_info = vk::MemoryAllocateInfo::default()
            .allocation_size(size)
            .memory_type_index(memory_type_index);
        let memory = unsafe { device.allocate_memory(&alloc_info, None)? };
        Ok(Self { memory, device })
    }

    pub fn vk_memory(&self) -> vk::DeviceMemory {
        self.memory
    }
}

impl Drop for DeviceMemory {
    fn drop(&mut self) {
        unsafe {
            self.device.free_memory(self.memory, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEVICE_LOCAL: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::DEVICE_LOCAL;
    const HOST_VISIBLE: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::HOST_VISIBLE;
    const HOST_COHERENT: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::HOST_COHERENT;

    fn memory_types(flags: &[vk::MemoryPropertyFlags]) -> Vec<vk::MemoryType> {
        flags
            .iter()
            .map(|&property_flags| vk::MemoryType {
                property_flags,
                heap_index: 0,
            })
            .collect()
    }

    #[test]
    fn lowest_index_with_superset_flags_wins() {
        let types = memory_types(&[
            HOST_VISIBLE,
            DEVICE_LOCAL,
            DEVICE_LOCAL | HOST_VISIBLE | HOST_COHERENT,
            DEVICE_LOCAL,
        ]);
        assert_eq!(find_memory_type(0b1111, DEVICE_LOCAL, &types), Some(1));
        assert_eq!(find_memory_type(0b1101, DEVICE_LOCAL, &types), Some(2));
        assert_eq!(find_memory_type(0b1001, DEVICE_LOCAL, &types), Some(3));
        assert_eq!(
            find_memory_type(0b1111, HOST_VISIBLE | HOST_COHERENT, &types),
            Some(2)
        );
    }

    #[test]
    fn every_candidate_is_checked_against_the_table() {
        let flags_table = [
            DEVICE_LOCAL,
            HOST_VISIBLE,
            HOST_VISIBLE | HOST_COHERENT,
            DEVICE_LOCAL | HOST_VISIBLE,
            vk::MemoryPropertyFlags::empty(),
        ];
        let types = memory_types(&flags_table);
        let wanted = [DEVICE_LOCAL, HOST_VISIBLE, HOST_COHERENT, DEVICE_LOCAL | HOST_VISIBLE];

        for mask in 0u32..(1 << flags_table.len()) {
            for &desired in wanted.iter() {
                let expected = (0..flags_table.len())
                    .find(|&i| mask & (1 << i) != 0 && flags_table[i].contains(desired))
                    .map(|i| i as u32);
                assert_eq!(find_memory_type(mask, desired, &types), expected);
            }
        }
    }

    #[test]
    fn no_match_is_none() {
        let types = memory_types(&[HOST_VISIBLE, HOST_VISIBLE | HOST_COHERENT]);
        assert_eq!(find_memory_type(0b11, DEVICE_LOCAL, &types), None);
        assert_eq!(find_memory_type(0, HOST_VISIBLE, &types), None);
    }

    #[test]
    fn bits_beyond_the_table_are_ignored() {
        let types = memory_types(&[HOST_VISIBLE]);
        assert_eq!(find_memory_type(0b10, vk::MemoryPropertyFlags::empty(), &types), None);
    }
}
