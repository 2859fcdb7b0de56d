use anyhow::Result;
use ash::vk;

pub struct DescriptorPool {
    pool: vk::DescriptorPool,
    device: ash::Device,
}

impl DescriptorPool {
    /// Sets allocated from the pool may be freed individually.
    pub fn new(
        max_sets: u32,
        pool_sizes: &[vk::DescriptorPoolSize],
        device: ash::Device,
    ) -> Result<Self> {
        let create_info = vk::DescriptorPoolCreateInfo::default()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .max_sets(max_sets)
            .pool_sizes(pool_sizes);
        let pool = unsafe { device.create_descriptor_pool(&create_info, None)? };

        Ok(Self { pool, device })
    }

    pub fn vk_pool(&self) -> vk::DescriptorPool {
        self.pool
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}
