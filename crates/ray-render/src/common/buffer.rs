use super::memory::MemoryProperties;
use anyhow::Result;
use ash::vk;

/// Exclusive for a single family, concurrent across several.
pub fn sharing_mode(queue_families: &[u32]) -> vk::SharingMode {
    if queue_families.len() > 1 {
        vk::SharingMode::CONCURRENT
    } else {
        vk::SharingMode::EXCLUSIVE
    }
}

pub fn copy_buffer(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    src: vk::Buffer,
    dst: vk::Buffer,
    size: vk::DeviceSize,
) {
    let copy_region = vk::BufferCopy::default()
        .size(size)
        .src_offset(0)
        .dst_offset(0);

    unsafe {
        device.cmd_copy_buffer(command_buffer, src, dst, &[copy_region]);
    }
}

pub struct Buffer {
    buffer: vk::Buffer,
    device_memory: vk::DeviceMemory,
    memory_property_flags: vk::MemoryPropertyFlags,
    size: vk::DeviceSize,
    allocation_size: vk::DeviceSize,
    device: ash::Device,
}

impl Buffer {
    /// `queue_families` lists who may touch the buffer. More than one family
    /// selects concurrent sharing.
    pub fn new(
        size: vk::DeviceSize,
        usage_flags: vk::BufferUsageFlags,
        memory_property_flags: vk::MemoryPropertyFlags,
        queue_families: &[u32],
        memory_properties: &MemoryProperties,
        device: ash::Device,
    ) -> Result<Self> {
        let mut create_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage_flags)
            .sharing_mode(sharing_mode(queue_families));
        if queue_families.len() > 1 {
            create_info = create_info.queue_family_indices(queue_families);
        }

        let buffer = unsafe { device.create_buffer(&create_info, None)? };
        let mem_requirements = unsafe { device.get_buffer_memory_requirements(buffer) };

        let memory_type = match memory_properties
            .find_memory_type(mem_requirements.memory_type_bits, memory_property_flags)
        {
            Ok(memory_type) => memory_type,
            Err(error) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(error);
            }
        };

        let alloc_info = vk::MemoryAllocateInfo::default()
            .allocation_size(mem_requirements.size)
            .memory_type_index(memory_type);

        let device_memory = match unsafe { device.allocate_memory(&alloc_info, None) } {
            Ok(device_memory) => device_memory,
            Err(error) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(error.into());
            }
        };

        let buffer = Self {
            buffer,
            device_memory,
            memory_property_flags,
            size,
            allocation_size: mem_requirements.size,
            device,
        };
        unsafe {
            buffer
                .device
                .bind_buffer_memory(buffer.buffer, buffer.device_memory, 0)?;
        }
        Ok(buffer)
    }

    /// Copies `data` to `offset` through a whole-allocation mapping.
    pub fn write(&self, offset: vk::DeviceSize, data: &[u8]) -> Result<()> {
        anyhow::ensure!(
            offset + data.len() as vk::DeviceSize <= self.size,
            "write of {} bytes at {} overruns a {} byte buffer",
            data.len(),
            offset,
            self.size
        );
        unsafe {
            let mapped = self.device.map_memory(
                self.device_memory,
                0,
                vk::WHOLE_SIZE,
                vk::MemoryMapFlags::empty(),
            )? as *mut u8;
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped.add(offset as usize), data.len());
        }
        let flushed = self.flush(0, vk::WHOLE_SIZE);
        unsafe { self.device.unmap_memory(self.device_memory) };
        flushed
    }

    /// Maps `size` bytes at `offset`. Pair with [`Buffer::unmap`].
    pub fn map(&self, offset: vk::DeviceSize, size: vk::DeviceSize) -> Result<*mut u8> {
        let mapped = unsafe {
            self.device
                .map_memory(self.device_memory, offset, size, vk::MemoryMapFlags::empty())?
        };
        Ok(mapped as *mut u8)
    }

    pub fn unmap(&self) {
        unsafe { self.device.unmap_memory(self.device_memory) };
    }

    /// No-op on coherent memory.
    pub fn flush(&self, offset: vk::DeviceSize, size: vk::DeviceSize) -> Result<()> {
        if self
            .memory_property_flags
            .contains(vk::MemoryPropertyFlags::HOST_COHERENT)
        {
            return Ok(());
        }
        let mapped_range = [vk::MappedMemoryRange::default()
            .memory(self.device_memory)
            .offset(offset)
            .size(size)];
        unsafe {
            self.device.flush_mapped_memory_ranges(&mapped_range)?;
        }
        Ok(())
    }

    pub fn vk_buffer(&self) -> vk::Buffer {
        self.buffer
    }

    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    pub fn allocation_size(&self) -> vk::DeviceSize {
        self.allocation_size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.device_memory, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrent_only_across_families() {
        assert_eq!(sharing_mode(&[0]), vk::SharingMode::EXCLUSIVE);
        assert_eq!(sharing_mode(&[]), vk::SharingMode::EXCLUSIVE);
        assert_eq!(sharing_mode(&[0, 2]), vk::SharingMode::CONCURRENT);
    }
}
