use anyhow::Result;
use ash::vk;

pub struct DescriptorSet {
    descriptor_set: vk::DescriptorSet,
    descriptor_pool: vk::DescriptorPool,
    device: ash::Device,
}

impl DescriptorSet {
    pub fn new(
        layout: vk::DescriptorSetLayout,
        descriptor_pool: vk::DescriptorPool,
        device: ash::Device,
    ) -> Result<Self> {
        let set_layouts = [layout];
        let allocate_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(descriptor_pool)
            .set_layouts(&set_layouts);
        let descriptor_set = unsafe { device.allocate_descriptor_sets(&allocate_info)? }[0];

        Ok(Self {
            descriptor_set,
            descriptor_pool,
            device,
        })
    }

    pub fn vk_descriptor_set(&self) -> vk::DescriptorSet {
        self.descriptor_set
    }

    pub fn write_buffer(
        &self,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        buffer: vk::Buffer,
        range: vk::DeviceSize,
    ) {
        let buffer_info = [vk::DescriptorBufferInfo::default()
            .buffer(buffer)
            .offset(0)
            .range(range)];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(self.descriptor_set)
            .dst_binding(binding)
            .descriptor_type(descriptor_type)
            .buffer_info(&buffer_info);
        unsafe { self.device.update_descriptor_sets(&[write], &[]) };
    }

    pub fn write_image(
        &self,
        binding: u32,
        array_element: u32,
        descriptor_type: vk::DescriptorType,
        image_info: vk::DescriptorImageInfo,
    ) {
        let image_info = [image_info];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(self.descriptor_set)
            .dst_binding(binding)
            .dst_array_element(array_element)
            .descriptor_type(descriptor_type)
            .image_info(&image_info);
        unsafe { self.device.update_descriptor_sets(&[write], &[]) };
    }
}

impl Drop for DescriptorSet {
    fn drop(&mut self) {
        unsafe {
            // the pool is created with FREE_DESCRIPTOR_SET
            let _ = self
                .device
                .free_descriptor_sets(self.descriptor_pool, &[self.descriptor_set]);
        }
    }
}
