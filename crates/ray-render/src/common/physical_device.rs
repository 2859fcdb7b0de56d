use crate::error::SetupError;
use anyhow::Result;
use ash::vk;

const REQUIRED_QUEUE_FLAGS: vk::QueueFlags = vk::QueueFlags::from_raw(
    vk::QueueFlags::GRAPHICS.as_raw()
        | vk::QueueFlags::COMPUTE.as_raw()
        | vk::QueueFlags::TRANSFER.as_raw(),
);

/// What device selection looks at, detached from the live handle.
#[derive(Debug, Clone)]
pub struct DeviceCandidate {
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub queue_flags: Vec<vk::QueueFlags>,
    pub device_local_bytes: vk::DeviceSize,
}

impl DeviceCandidate {
    pub fn query(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> Result<Self> {
        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let memory_properties =
            unsafe { instance.get_physical_device_memory_properties(physical_device) };
        let queue_families =
            unsafe { instance.get_physical_device_queue_family_properties(physical_device) };

        let device_local_bytes = memory_properties
            .memory_heaps
            .iter()
            .take(memory_properties.memory_heap_count as usize)
            .filter(|heap| heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
            .map(|heap| heap.size)
            .sum();

        // a family without queues cannot serve any role
        let queue_flags = queue_families
            .iter()
            .map(|family| {
                if family.queue_count > 0 {
                    family.queue_flags
                } else {
                    vk::QueueFlags::empty()
                }
            })
            .collect();

        Ok(Self {
            name: properties
                .device_name_as_c_str()?
                .to_string_lossy()
                .into_owned(),
            device_type: properties.device_type,
            queue_flags,
            device_local_bytes,
        })
    }

    /// Graphics, compute and transfer may come from different families.
    pub fn has_required_queues(&self) -> bool {
        self.queue_flags
            .iter()
            .fold(vk::QueueFlags::empty(), |union, &flags| union | flags)
            .contains(REQUIRED_QUEUE_FLAGS)
    }

    fn tier(&self) -> Option<u8> {
        match self.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => Some(1),
            vk::PhysicalDeviceType::INTEGRATED_GPU => Some(0),
            _ => None,
        }
    }
}

/// Index of the preferred candidate. Discrete beats integrated whatever the
/// memory; within a tier the larger device-local total wins, later on ties.
pub fn select_candidate(candidates: &[DeviceCandidate]) -> Option<usize> {
    let mut best: Option<(usize, (u8, vk::DeviceSize))> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let Some(tier) = candidate.tier() else {
            continue;
        };
        if !candidate.has_required_queues() {
            continue;
        }
        let key = (tier, candidate.device_local_bytes);
        if best.map_or(true, |(_, best_key)| key >= best_key) {
            best = Some((index, key));
        }
    }
    best.map(|(index, _)| index)
}

pub fn pick_physical_device(
    instance: &ash::Instance,
) -> Result<(vk::PhysicalDevice, DeviceCandidate)> {
    let physical_devices = unsafe { instance.enumerate_physical_devices()? };

    log::debug!(
        "{} devices (GPU) found with vulkan support.",
        physical_devices.len()
    );

    let candidates = physical_devices
        .iter()
        .map(|&physical_device| DeviceCandidate::query(instance, physical_device))
        .collect::<Result<Vec<_>>>()?;
    for candidate in candidates.iter() {
        log::debug!(
            "\t{} ({:?}, {} MiB device local)",
            candidate.name,
            candidate.device_type,
            candidate.device_local_bytes >> 20
        );
    }

    let index = select_candidate(&candidates).ok_or(SetupError::NoSuitableDevice)?;
    log::info!("selected device: {}", candidates[index].name);
    Ok((physical_devices[index], candidates[index].clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIB: vk::DeviceSize = 1 << 30;

    fn candidate(
        device_type: vk::PhysicalDeviceType,
        queue_flags: &[vk::QueueFlags],
        device_local_bytes: vk::DeviceSize,
    ) -> DeviceCandidate {
        DeviceCandidate {
            name: format!("{:?}", device_type),
            device_type,
            queue_flags: queue_flags.to_vec(),
            device_local_bytes,
        }
    }

    fn full_queues() -> Vec<vk::QueueFlags> {
        vec![vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER]
    }

    #[test]
    fn discrete_beats_larger_integrated_in_either_order() {
        let discrete = candidate(vk::PhysicalDeviceType::DISCRETE_GPU, &full_queues(), 2 * GIB);
        let integrated =
            candidate(vk::PhysicalDeviceType::INTEGRATED_GPU, &full_queues(), 16 * GIB);

        let discrete_first = [discrete.clone(), integrated.clone()];
        assert_eq!(select_candidate(&discrete_first), Some(0));

        let integrated_first = [integrated, discrete];
        assert_eq!(select_candidate(&integrated_first), Some(1));
    }

    #[test]
    fn larger_memory_wins_within_tier() {
        let candidates = [
            candidate(vk::PhysicalDeviceType::DISCRETE_GPU, &full_queues(), 4 * GIB),
            candidate(vk::PhysicalDeviceType::DISCRETE_GPU, &full_queues(), 8 * GIB),
            candidate(vk::PhysicalDeviceType::DISCRETE_GPU, &full_queues(), 6 * GIB),
        ];
        assert_eq!(select_candidate(&candidates), Some(1));
    }

    #[test]
    fn other_device_types_are_rejected() {
        let candidates = [
            candidate(vk::PhysicalDeviceType::CPU, &full_queues(), 64 * GIB),
            candidate(vk::PhysicalDeviceType::VIRTUAL_GPU, &full_queues(), 64 * GIB),
        ];
        assert_eq!(select_candidate(&candidates), None);
    }

    #[test]
    fn capabilities_may_be_split_across_families() {
        let split = [
            vk::QueueFlags::GRAPHICS,
            vk::QueueFlags::COMPUTE,
            vk::QueueFlags::TRANSFER,
        ];
        let candidates = [candidate(
            vk::PhysicalDeviceType::INTEGRATED_GPU,
            &split,
            GIB,
        )];
        assert_eq!(select_candidate(&candidates), Some(0));
    }

    #[test]
    fn missing_capability_disqualifies_even_a_discrete_device() {
        let no_transfer = [vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE];
        let candidates = [
            candidate(vk::PhysicalDeviceType::DISCRETE_GPU, &no_transfer, 8 * GIB),
            candidate(vk::PhysicalDeviceType::INTEGRATED_GPU, &full_queues(), GIB),
        ];
        let selected = select_candidate(&candidates).unwrap();
        assert_eq!(selected, 1);
        assert!(candidates[selected].has_required_queues());
    }
}
