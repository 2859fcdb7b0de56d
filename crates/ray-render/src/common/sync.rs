use anyhow::Result;
use ash::vk;

/// One frame in flight: a single fence and render-complete semaphore reused
/// every frame.
pub struct FrameSync {
    render_complete: vk::Semaphore,
    frame_fence: vk::Fence,
    device: ash::Device,
}

impl FrameSync {
    pub fn new(device: ash::Device) -> Result<Self> {
        let semaphore_create_info = vk::SemaphoreCreateInfo::default();
        let fence_create_info = vk::FenceCreateInfo::default();

        let frame_fence = unsafe { device.create_fence(&fence_create_info, None)? };
        let render_complete = match unsafe { device.create_semaphore(&semaphore_create_info, None) }
        {
            Ok(semaphore) => semaphore,
            Err(error) => {
                unsafe { device.destroy_fence(frame_fence, None) };
                return Err(error.into());
            }
        };

        Ok(Self {
            render_complete,
            frame_fence,
            device,
        })
    }

    pub fn render_complete(&self) -> vk::Semaphore {
        self.render_complete
    }

    pub fn frame_fence(&self) -> vk::Fence {
        self.frame_fence
    }
}

impl Drop for FrameSync {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.render_complete, None);
            self.device.destroy_fence(self.frame_fence, None);
        }
    }
}

pub struct Semaphore {
    semaphore: vk::Semaphore,
    device: ash::Device,
}

impl Semaphore {
    pub fn new(device: ash::Device) -> Result<Self> {
        let semaphore =
            unsafe { device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None)? };
        Ok(Self { semaphore, device })
    }

    pub fn vk_semaphore(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}
