use anyhow::Result;
use ash::vk;

pub struct Framebuffer {
    framebuffer: vk::Framebuffer,
    device: ash::Device,
}

impl Framebuffer {
    pub fn new(
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
        device: ash::Device,
    ) -> Result<Self> {
        let framebuffer_create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe { device.create_framebuffer(&framebuffer_create_info, None)? };

        Ok(Self {
            framebuffer,
            device,
        })
    }

    pub fn vk_framebuffer(&self) -> vk::Framebuffer {
        self.framebuffer
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}
