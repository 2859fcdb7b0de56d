use super::consts::FENCE_TIMEOUT;
use anyhow::Result;
use ash::vk;

pub fn create_command_buffers(
    device: &ash::Device,
    command_pool: vk::CommandPool,
    count: u32,
) -> Result<Vec<vk::CommandBuffer>> {
    let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::default()
        .command_buffer_count(count)
        .command_pool(command_pool)
        .level(vk::CommandBufferLevel::PRIMARY);

    let command_buffers =
        unsafe { device.allocate_command_buffers(&command_buffer_allocate_info)? };
    Ok(command_buffers)
}

/// Command buffer allocated once and reused for blocking one-off work, such
/// as layout transitions and staging uploads.
pub struct OneShotCommands {
    command_buffer: vk::CommandBuffer,
    command_pool: vk::CommandPool,
    queue: vk::Queue,
    fence: vk::Fence,
    device: ash::Device,
}

impl OneShotCommands {
    pub fn new(device: ash::Device, command_pool: vk::CommandPool, queue: vk::Queue) -> Result<Self> {
        let command_buffer = create_command_buffers(&device, command_pool, 1)?[0];
        let fence = unsafe { device.create_fence(&vk::FenceCreateInfo::default(), None) };
        let fence = match fence {
            Ok(fence) => fence,
            Err(error) => {
                unsafe { device.free_command_buffers(command_pool, &[command_buffer]) };
                return Err(error.into());
            }
        };
        Ok(Self {
            command_buffer,
            command_pool,
            queue,
            fence,
            device,
        })
    }

    /// Records with `record`, submits, and blocks until the queue is done.
    pub fn submit_and_wait<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        let device = &self.device;
        let begin_info =
            vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            device.begin_command_buffer(self.command_buffer, &begin_info)?;
        }
        record(device, self.command_buffer);

        let command_buffers = [self.command_buffer];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
        unsafe {
            device.end_command_buffer(self.command_buffer)?;
            device.queue_submit(self.queue, &[submit_info], self.fence)?;
            device.wait_for_fences(&[self.fence], true, FENCE_TIMEOUT)?;
            device.reset_fences(&[self.fence])?;
            device.reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())?;
        }
        Ok(())
    }
}

impl Drop for OneShotCommands {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
            self.device
                .free_command_buffers(self.command_pool, &[self.command_buffer]);
        }
    }
}

/// Primary command buffers freed back to their pool on drop.
pub struct CommandBuffers {
    command_buffers: Vec<vk::CommandBuffer>,
    command_pool: vk::CommandPool,
    device: ash::Device,
}

impl CommandBuffers {
    pub fn new(device: ash::Device, command_pool: vk::CommandPool, count: u32) -> Result<Self> {
        let command_buffers = create_command_buffers(&device, command_pool, count)?;
        Ok(Self {
            command_buffers,
            command_pool,
            device,
        })
    }

    pub fn vk_command_buffers(&self) -> &[vk::CommandBuffer] {
        &self.command_buffers
    }
}

impl Drop for CommandBuffers {
    fn drop(&mut self) {
        unsafe {
            self.device
                .free_command_buffers(self.command_pool, &self.command_buffers);
        }
    }
}
