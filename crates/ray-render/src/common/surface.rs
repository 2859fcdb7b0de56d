use crate::error::SetupError;
use anyhow::{
    Context as _,
    Result,
};
use ash::vk;
use winit::raw_window_handle::{
    HasDisplayHandle,
    HasWindowHandle,
};

pub struct Surface {
    pub surface: vk::SurfaceKHR,
    pub surface_loader: ash::khr::surface::Instance,
}

impl Surface {
    pub fn new(
        entry: &ash::Entry,
        instance: &ash::Instance,
        window: &winit::window::Window,
    ) -> Result<Self> {
        let display_handle = window.display_handle()?.as_raw();
        let window_handle = window.window_handle()?.as_raw();
        let surface = unsafe {
            ash_window::create_surface(entry, instance, display_handle, window_handle, None)
        }
        .context(SetupError::SurfaceCreation)?;
        let surface_loader = ash::khr::surface::Instance::new(entry, instance);

        Ok(Self {
            surface,
            surface_loader,
        })
    }

    pub fn supports_present(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
    ) -> Result<bool> {
        let supported = unsafe {
            self.surface_loader.get_physical_device_surface_support(
                physical_device,
                queue_family,
                self.surface,
            )?
        };
        Ok(supported)
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
