use super::{
    consts::DESIRED_SWAPCHAIN_IMAGES,
    surface::Surface,
};
use crate::error::SetupError;
use anyhow::{
    Context as _,
    Result,
};
use ash::vk;
use winit::dpi::PhysicalSize;

pub struct Swapchain {
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    swapchain_format: vk::SurfaceFormatKHR,
    swapchain_extent: vk::Extent2D,
}

impl Swapchain {
    pub fn new(
        instance: &ash::Instance,
        device: &ash::Device,
        physical_device: vk::PhysicalDevice,
        surface: &Surface,
        size: PhysicalSize<u32>,
    ) -> Result<Self> {
        let swapchain_support = query_swapchain_support(physical_device, surface)?;
        let capabilities = &swapchain_support.capabilities;
        let surface_format = choose_swapchain_format(&swapchain_support.formats)
            .ok_or(SetupError::SwapchainCreation)?;
        let present_mode = choose_swapchain_present_mode(&swapchain_support.present_modes);
        let extent = choose_swapchain_extent(capabilities, size);
        let image_count = choose_image_count(DESIRED_SWAPCHAIN_IMAGES, capabilities);
        let pre_transform = choose_pre_transform(capabilities);

        log::debug!(
            "swapchain: {:?} {:?}, {} images, {}x{}, {:?}",
            surface_format.format,
            surface_format.color_space,
            image_count,
            extent.width,
            extent.height,
            present_mode
        );

        let swapchain_create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface.surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        let swapchain_loader = ash::khr::swapchain::Device::new(instance, device);
        let swapchain = unsafe { swapchain_loader.create_swapchain(&swapchain_create_info, None) }
            .context(SetupError::SwapchainCreation)?;

        Ok(Swapchain {
            swapchain_loader,
            swapchain,
            swapchain_format: surface_format,
            swapchain_extent: extent,
        })
    }

    pub fn swapchain_loader(&self) -> &ash::khr::swapchain::Device {
        &self.swapchain_loader
    }

    pub fn vk_swapchain(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    pub fn vk_swapchain_images(&self) -> Result<Vec<vk::Image>> {
        Ok(unsafe { self.swapchain_loader.get_swapchain_images(self.swapchain)? })
    }

    pub fn vk_swapchain_format(&self) -> vk::Format {
        self.swapchain_format.format
    }

    pub fn vk_swapchain_extent(&self) -> vk::Extent2D {
        self.swapchain_extent
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            self.swapchain_loader
                .destroy_swapchain(self.swapchain, None);
        }
    }
}

pub struct SwapChainSupportDetail {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

/// 8-bit BGR or BGRA, the last such entry when several are reported. A lone
/// UNDEFINED entry means the surface takes anything.
pub fn choose_swapchain_format(
    available_formats: &[vk::SurfaceFormatKHR],
) -> Option<vk::SurfaceFormatKHR> {
    if let [only] = available_formats {
        if only.format == vk::Format::UNDEFINED {
            return Some(vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8_UNORM,
                color_space: only.color_space,
            });
        }
    }

    available_formats
        .iter()
        .rev()
        .find(|available_format| {
            available_format.format == vk::Format::B8G8R8_UNORM
                || available_format.format == vk::Format::B8G8R8A8_UNORM
        })
        .or_else(|| available_formats.first())
        .copied()
}

pub fn choose_swapchain_present_mode(
    available_present_modes: &[vk::PresentModeKHR],
) -> vk::PresentModeKHR {
    if available_present_modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// `max_image_count == 0` means no upper bound.
pub fn choose_image_count(desired: u32, capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = desired.max(capabilities.min_image_count);
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

pub fn choose_swapchain_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    size: PhysicalSize<u32>,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D::default()
            .width(size.width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ))
            .height(size.height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ))
    }
}

pub fn choose_pre_transform(
    capabilities: &vk::SurfaceCapabilitiesKHR,
) -> vk::SurfaceTransformFlagsKHR {
    if capabilities
        .supported_transforms
        .contains(vk::SurfaceTransformFlagsKHR::IDENTITY)
    {
        vk::SurfaceTransformFlagsKHR::IDENTITY
    } else {
        capabilities.current_transform
    }
}

pub fn query_swapchain_support(
    physical_device: vk::PhysicalDevice,
    surface: &Surface,
) -> Result<SwapChainSupportDetail> {
    unsafe {
        let capabilities = surface
            .surface_loader
            .get_physical_device_surface_capabilities(physical_device, surface.surface)?;
        let formats = surface
            .surface_loader
            .get_physical_device_surface_formats(physical_device, surface.surface)?;
        let present_modes = surface
            .surface_loader
            .get_physical_device_surface_present_modes(physical_device, surface.surface)?;

        Ok(SwapChainSupportDetail {
            capabilities,
            formats,
            present_modes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }
    }

    fn capabilities(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 1920,
                height: 1080,
            },
            ..Default::default()
        }
    }

    #[test]
    fn undefined_surface_gets_bgr_default() {
        let chosen = choose_swapchain_format(&[format(vk::Format::UNDEFINED)]).unwrap();
        assert_eq!(chosen.format, vk::Format::B8G8R8_UNORM);
    }

    #[test]
    fn bgra_is_preferred_over_first_entry() {
        let formats = [
            format(vk::Format::R8G8B8A8_SRGB),
            format(vk::Format::B8G8R8A8_UNORM),
        ];
        let chosen = choose_swapchain_format(&formats).unwrap();
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_UNORM);
    }

    #[test]
    fn first_entry_is_the_fallback() {
        let formats = [
            format(vk::Format::R8G8B8A8_SRGB),
            format(vk::Format::A2B10G10R10_UNORM_PACK32),
        ];
        let chosen = choose_swapchain_format(&formats).unwrap();
        assert_eq!(chosen.format, vk::Format::R8G8B8A8_SRGB);
        assert!(choose_swapchain_format(&[]).is_none());
    }

    #[test]
    fn mailbox_then_fifo() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_swapchain_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
        let modes = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO];
        assert_eq!(choose_swapchain_present_mode(&modes), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn image_count_is_clamped() {
        assert_eq!(choose_image_count(2, &capabilities(3, 8)), 3);
        assert_eq!(choose_image_count(2, &capabilities(1, 1)), 1);
        assert_eq!(choose_image_count(2, &capabilities(1, 0)), 2);
        assert_eq!(choose_image_count(5, &capabilities(1, 0)), 5);
    }

    #[test]
    fn window_size_is_used_only_for_sentinel_extent() {
        let mut caps = capabilities(2, 0);
        let extent = choose_swapchain_extent(&caps, PhysicalSize::new(4000, 720));
        assert_eq!((extent.width, extent.height), (1920, 720));

        caps.current_extent = vk::Extent2D {
            width: 800,
            height: 600,
        };
        let extent = choose_swapchain_extent(&caps, PhysicalSize::new(1280, 720));
        assert_eq!((extent.width, extent.height), (800, 600));
    }

    #[test]
    fn identity_transform_when_supported() {
        let mut caps = capabilities(2, 0);
        caps.supported_transforms =
            vk::SurfaceTransformFlagsKHR::IDENTITY | vk::SurfaceTransformFlagsKHR::ROTATE_90;
        caps.current_transform = vk::SurfaceTransformFlagsKHR::ROTATE_90;
        assert_eq!(choose_pre_transform(&caps), vk::SurfaceTransformFlagsKHR::IDENTITY);

        caps.supported_transforms = vk::SurfaceTransformFlagsKHR::ROTATE_90;
        assert_eq!(choose_pre_transform(&caps), vk::SurfaceTransformFlagsKHR::ROTATE_90);
    }
}
