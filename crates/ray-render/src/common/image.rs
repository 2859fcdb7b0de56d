use anyhow::Result;
use ash::vk;

/// Image handle without memory of its own. Memory is bound by the owner.
pub struct Image {
    image: vk::Image,
    extent: vk::Extent2D,
    device: ash::Device,
}

impl Image {
    pub fn new_2d(
        format: vk::Format,
        extent: vk::Extent2D,
        usage: vk::ImageUsageFlags,
        tiling: vk::ImageTiling,
        initial_layout: vk::ImageLayout,
        device: ash::Device,
    ) -> Result<Self> {
        let image_create_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(tiling)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(initial_layout);
        let image = unsafe { device.create_image(&image_create_info, None)? };

        Ok(Self {
            image,
            extent,
            device,
        })
    }

    pub fn vk_image(&self) -> vk::Image {
        self.image
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_image(self.image, None);
        }
    }
}

/// One layout change of a whole single-mip image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutTransition {
    pub aspect_mask: vk::ImageAspectFlags,
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
    pub src_access_mask: vk::AccessFlags,
    pub dst_access_mask: vk::AccessFlags,
    pub src_stage_mask: vk::PipelineStageFlags,
    pub dst_stage_mask: vk::PipelineStageFlags,
}

impl LayoutTransition {
    pub fn record(&self, device: &ash::Device, command_buffer: vk::CommandBuffer, image: vk::Image) {
        let barrier = vk::ImageMemoryBarrier::default()
            .src_access_mask(self.src_access_mask)
            .dst_access_mask(self.dst_access_mask)
            .old_layout(self.old_layout)
            .new_layout(self.new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(self.aspect_mask)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        unsafe {
            device.cmd_pipeline_barrier(
                command_buffer,
                self.src_stage_mask,
                self.dst_stage_mask,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
    }
}
