use super::queue_family::QueuePlan;
use crate::error::{
    SetupError,
    Stage,
};
use anyhow::{
    Context as _,
    Result,
};
use ash::vk;
use std::ffi::CStr;

const DEVICE_EXTENSIONS: [&CStr; 1] = [ash::khr::swapchain::NAME];

/// Core features the deferred path relies on. Every flag is set here, before
/// the struct is referenced by the create info.
pub fn required_features() -> vk::PhysicalDeviceFeatures {
    vk::PhysicalDeviceFeatures::default()
        .multi_draw_indirect(true)
        .draw_indirect_first_instance(true)
        .vertex_pipeline_stores_and_atomics(true)
        .fragment_stores_and_atomics(true)
        .shader_clip_distance(true)
        .shader_sampled_image_array_dynamic_indexing(true)
}

pub fn create_logical_device(
    plan: &QueuePlan,
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> Result<Device> {
    let queue_priorities: Vec<Vec<f32>> = plan
        .requests
        .iter()
        .map(|&(_, count)| vec![1.0_f32; count as usize])
        .collect();
    let queue_create_infos = plan
        .requests
        .iter()
        .zip(queue_priorities.iter())
        .map(|(&(family, _), priorities)| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(priorities)
        })
        .collect::<Vec<_>>();

    let features = required_features();
    let extension_names = DEVICE_EXTENSIONS
        .iter()
        .map(|extension| extension.as_ptr())
        .collect::<Vec<_>>();
    let device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names)
        .enabled_features(&features);
    Device::new(&device_create_info, physical_device, instance)
}

pub struct Device {
    device: ash::Device,
}

impl Device {
    pub fn new(
        device_create_info: &vk::DeviceCreateInfo,
        physical_device: vk::PhysicalDevice,
        instance: &ash::Instance,
    ) -> Result<Self> {
        let device = unsafe { instance.create_device(physical_device, device_create_info, None) }
            .context(SetupError::resource(Stage::Device, "logical device", -4))?;
        Ok(Self { device })
    }

    pub fn ash_device(&self) -> &ash::Device {
        &self.device
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_device(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_set_is_complete_before_use() {
        let features = required_features();
        assert_eq!(features.multi_draw_indirect, vk::TRUE);
        assert_eq!(features.draw_indirect_first_instance, vk::TRUE);
        assert_eq!(features.vertex_pipeline_stores_and_atomics, vk::TRUE);
        assert_eq!(features.fragment_stores_and_atomics, vk::TRUE);
        assert_eq!(features.shader_clip_distance, vk::TRUE);
    }
}
