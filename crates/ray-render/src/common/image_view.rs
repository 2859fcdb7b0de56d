use anyhow::Result;
use ash::vk;

pub struct ImageView {
    image_view: vk::ImageView,
    device: ash::Device,
}

impl ImageView {
    /// Single-mip, single-layer 2D view over `image`.
    pub fn new(
        image: vk::Image,
        format: vk::Format,
        aspect_mask: vk::ImageAspectFlags,
        device: ash::Device,
    ) -> Result<Self> {
        let image_view_create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::R,
                g: vk::ComponentSwizzle::G,
                b: vk::ComponentSwizzle::B,
                a: vk::ComponentSwizzle::A,
            })
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(aspect_mask)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );
        let image_view = unsafe { device.create_image_view(&image_view_create_info, None)? };
        Ok(Self { image_view, device })
    }

    pub fn vk_image_view(&self) -> vk::ImageView {
        self.image_view
    }
}

impl Drop for ImageView {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_image_view(self.image_view, None);
        }
    }
}
