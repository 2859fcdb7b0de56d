use crate::{
    common::{
        debug::DebugUtils,
        device::{
            create_logical_device,
            Device,
        },
        instance::Instance,
        memory::MemoryProperties,
        physical_device::{
            pick_physical_device,
            DeviceCandidate,
        },
        queue_family::{
            QueueFamilyIndices,
            QueuePlan,
            QueueSlot,
        },
    },
    error::{
        SetupError,
        Stage,
    },
};
use anyhow::{
    Context as _,
    Result,
};
use ash::vk;
use winit::raw_window_handle::RawDisplayHandle;

#[derive(Debug, Clone, Copy)]
pub struct Queues {
    pub graphics: vk::Queue,
    pub transfer: vk::Queue,
    pub compute: vk::Queue,
}

/// Instance, physical device choice, queue routing and the logical device.
/// Fields drop in reverse creation order.
pub struct DeviceContext {
    queues: Queues,
    queue_plan: QueuePlan,
    queue_family_indices: QueueFamilyIndices,
    non_coherent_atom_size: vk::DeviceSize,
    memory_properties: MemoryProperties,
    candidate: DeviceCandidate,
    physical_device: vk::PhysicalDevice,
    device: Device,
    _debug_utils: Option<DebugUtils>,
    instance: Instance,
    entry: ash::Entry,
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        self.device_wait_idle();
    }
}

impl DeviceContext {
    /// `validation` enables the Khronos layer and the report callback.
    pub fn new(display_handle: RawDisplayHandle, validation: bool) -> Result<Self> {
        log::info!("loading vulkan entry");
        let entry = unsafe { ash::Entry::load() }
            .context(SetupError::resource(Stage::Instance, "vulkan entry", -4))?;

        log::info!("creating instance");
        let instance = Instance::new(&entry, display_handle, validation)?;

        let debug_utils = if validation {
            log::info!("setting up debug utils");
            Some(
                DebugUtils::new(&entry, instance.instance())
                    .context(SetupError::resource(Stage::Instance, "debug messenger", -5))?,
            )
        } else {
            None
        };

        log::info!("picking physical device");
        let (physical_device, candidate) = pick_physical_device(instance.instance())?;

        log::info!("partitioning queue families");
        let queue_family_indices = QueueFamilyIndices::partition(&candidate.queue_flags);
        let queue_counts = unsafe {
            instance
                .instance()
                .get_physical_device_queue_family_properties(physical_device)
        }
        .iter()
        .map(|family| family.queue_count)
        .collect::<Vec<_>>();
        let queue_plan = QueuePlan::new(&queue_family_indices, &queue_counts)
            .context(SetupError::resource(Stage::Device, "queue plan", -3))?;
        log::debug!(
            "queue families: graphics {:?}, transfer {:?}, compute {:?}",
            queue_plan.graphics,
            queue_plan.transfer,
            queue_plan.compute
        );

        log::info!("creating logical device");
        let device = create_logical_device(&queue_plan, instance.instance(), physical_device)?;

        let queue = |slot: QueueSlot| unsafe {
            device
                .ash_device()
                .get_device_queue(slot.family, slot.index)
        };
        let queues = Queues {
            graphics: queue(queue_plan.graphics),
            transfer: queue(queue_plan.transfer),
            compute: queue(queue_plan.compute),
        };

        let memory_properties = MemoryProperties::query(instance.instance(), physical_device);
        let non_coherent_atom_size = unsafe {
            instance
                .instance()
                .get_physical_device_properties(physical_device)
        }
        .limits
        .non_coherent_atom_size;

        Ok(Self {
            queues,
            queue_plan,
            queue_family_indices,
            non_coherent_atom_size,
            memory_properties,
            candidate,
            physical_device,
            device,
            _debug_utils: debug_utils,
            instance,
            entry,
        })
    }

    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    pub fn instance(&self) -> &ash::Instance {
        self.instance.instance()
    }

    pub fn ash_device(&self) -> &ash::Device {
        self.device.ash_device()
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn device_name(&self) -> &str {
        &self.candidate.name
    }

    pub fn memory_properties(&self) -> &MemoryProperties {
        &self.memory_properties
    }

    pub fn non_coherent_atom_size(&self) -> vk::DeviceSize {
        self.non_coherent_atom_size
    }

    pub fn queue_family_indices(&self) -> &QueueFamilyIndices {
        &self.queue_family_indices
    }

    pub fn queue_plan(&self) -> &QueuePlan {
        &self.queue_plan
    }

    pub fn queues(&self) -> Queues {
        self.queues
    }

    pub fn device_wait_idle(&self) {
        unsafe {
            if let Err(error) = self.ash_device().device_wait_idle() {
                log::error!("device wait idle failed: {error}");
            }
        }
    }
}
