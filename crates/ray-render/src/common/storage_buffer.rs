use super::{
    buffer::{
        copy_buffer,
        Buffer,
    },
    command_buffer::OneShotCommands,
    memory::MemoryProperties,
};
use anyhow::Result;
use ash::vk;

/// Device-local storage buffer filled once through a staging copy.
pub struct StorageBuffer {
    buffer: Buffer,
}

impl StorageBuffer {
    /// `queue_families` is every family that reads the buffer; sharing turns
    /// concurrent when there is more than one.
    pub fn new(
        data: &[u8],
        queue_families: &[u32],
        memory_properties: &MemoryProperties,
        transfer: &OneShotCommands,
        device: ash::Device,
    ) -> Result<Self> {
        let buffer_size = data.len() as vk::DeviceSize;
        anyhow::ensure!(buffer_size > 0, "storage buffer data is empty");

        let staging_buffer = Buffer::new(
            buffer_size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            &[],
            memory_properties,
            device.clone(),
        )?;
        staging_buffer.write(0, data)?;

        let buffer = Buffer::new(
            buffer_size,
            vk::BufferUsageFlags::STORAGE_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            queue_families,
            memory_properties,
            device,
        )?;

        transfer.submit_and_wait(|device, command_buffer| {
            copy_buffer(
                device,
                command_buffer,
                staging_buffer.vk_buffer(),
                buffer.vk_buffer(),
                buffer_size,
            );
        })?;

        Ok(Self { buffer })
    }

    pub fn vk_buffer(&self) -> vk::Buffer {
        self.buffer.vk_buffer()
    }

    pub fn size(&self) -> vk::DeviceSize {
        self.buffer.size()
    }
}
