use super::device_context::DeviceContext;
use crate::{
    common::{
        surface::Surface,
        swapchain::Swapchain,
    },
    error::SetupError,
};
use anyhow::{
    Context as _,
    Result,
};
use ash::vk;
use winit::window::Window;

/// Presentation surface and swapchain bound to one window.
pub struct WindowContext {
    swapchain: Swapchain,
    surface: Surface,
    device: ash::Device,
}

impl Drop for WindowContext {
    fn drop(&mut self) {
        unsafe {
            if let Err(error) = self.device.device_wait_idle() {
                log::error!("device wait idle failed: {error}");
            }
        }
    }
}

impl WindowContext {
    pub fn new(device_context: &DeviceContext, window: &Window) -> Result<Self> {
        log::info!("creating surface");
        let surface = Surface::new(device_context.entry(), device_context.instance(), window)?;

        let graphics_family = device_context.queue_plan().graphics.family;
        let supported = surface
            .supports_present(device_context.physical_device(), graphics_family)
            .context(SetupError::PresentNotSupported {
                family: graphics_family,
            })?;
        if !supported {
            return Err(SetupError::PresentNotSupported {
                family: graphics_family,
            }
            .into());
        }

        log::info!("creating swapchain");
        let swapchain = Swapchain::new(
            device_context.instance(),
            device_context.ash_device(),
            device_context.physical_device(),
            &surface,
            window.inner_size(),
        )?;

        Ok(Self {
            swapchain,
            surface,
            device: device_context.ash_device().clone(),
        })
    }

    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn format(&self) -> vk::Format {
        self.swapchain.vk_swapchain_format()
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.vk_swapchain_extent()
    }
}
