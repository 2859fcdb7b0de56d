use super::{
    device_context::DeviceContext,
    window_context::WindowContext,
};
use crate::{
    common::{
        command_buffer::OneShotCommands,
        command_pool::CommandPool,
        image::LayoutTransition,
        image_view::ImageView,
        sync::Semaphore,
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

const UNDEFINED_TO_PRESENT: LayoutTransition = LayoutTransition {
    aspect_mask: vk::ImageAspectFlags::COLOR,
    old_layout: vk::ImageLayout::UNDEFINED,
    new_layout: vk::ImageLayout::PRESENT_SRC_KHR,
    src_access_mask: vk::AccessFlags::empty(),
    dst_access_mask: vk::AccessFlags::MEMORY_READ,
    src_stage_mask: vk::PipelineStageFlags::TOP_OF_PIPE,
    dst_stage_mask: vk::PipelineStageFlags::TOP_OF_PIPE,
};

/// Command pools, one-shot command buffers, swapchain views and the present
/// semaphore. Fields drop in reverse creation order.
pub struct RenderContext {
    present_semaphore: Semaphore,
    swapchain_views: Vec<ImageView>,
    swapchain_images: Vec<vk::Image>,
    transfer_commands: OneShotCommands,
    setup_commands: OneShotCommands,
    compute_pool: CommandPool,
    transfer_pool: CommandPool,
    graphics_pool: CommandPool,
    device: ash::Device,
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        unsafe {
            if let Err(error) = self.device.device_wait_idle() {
                log::error!("device wait idle failed: {error}");
            }
        }
    }
}

impl RenderContext {
    pub fn new(device_context: &DeviceContext, window_context: &WindowContext) -> Result<Self> {
        let device = device_context.ash_device().clone();
        let plan = device_context.queue_plan();
        let queues = device_context.queues();
        let pool_flags = vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER;

        log::info!("creating command pools");
        let graphics_pool = CommandPool::new(plan.graphics.family, pool_flags, device.clone())
            .context(SetupError::resource(Stage::RenderSetup, "graphics command pool", -1))?;
        let transfer_pool = CommandPool::new(plan.transfer.family, pool_flags, device.clone())
            .context(SetupError::resource(Stage::RenderSetup, "transfer command pool", -2))?;
        let compute_pool = CommandPool::new(plan.compute.family, pool_flags, device.clone())
            .context(SetupError::resource(Stage::RenderSetup, "compute command pool", -3))?;

        log::info!("allocating setup and transfer command buffers");
        let setup_commands = OneShotCommands::new(
            device.clone(),
            graphics_pool.vk_command_pool(),
            queues.graphics,
        )
        .context(SetupError::resource(Stage::RenderSetup, "setup command buffer", -4))?;
        let transfer_commands = OneShotCommands::new(
            device.clone(),
            transfer_pool.vk_command_pool(),
            queues.transfer,
        )
        .context(SetupError::resource(Stage::RenderSetup, "transfer command buffer", -5))?;

        log::info!("creating swapchain image views");
        let swapchain_images = window_context
            .swapchain()
            .vk_swapchain_images()
            .context(SetupError::resource(Stage::RenderSetup, "swapchain images", -6))?;
        let swapchain_views = swapchain_images
            .iter()
            .map(|&image| {
                ImageView::new(
                    image,
                    window_context.format(),
                    vk::ImageAspectFlags::COLOR,
                    device.clone(),
                )
            })
            .collect::<Result<Vec<_>>>()
            .context(SetupError::resource(Stage::RenderSetup, "swapchain image view", -7))?;

        // one blocking submit per image, startup only
        log::info!("transitioning {} swapchain images", swapchain_images.len());
        for &image in swapchain_images.iter() {
            setup_commands
                .submit_and_wait(|device, command_buffer| {
                    UNDEFINED_TO_PRESENT.record(device, command_buffer, image);
                })
                .context(SetupError::resource(Stage::RenderSetup, "swapchain transition", -8))?;
        }

        let present_semaphore = Semaphore::new(device.clone())
            .context(SetupError::resource(Stage::RenderSetup, "present semaphore", -9))?;

        Ok(Self {
            present_semaphore,
            swapchain_views,
            swapchain_images,
            transfer_commands,
            setup_commands,
            compute_pool,
            transfer_pool,
            graphics_pool,
            device,
        })
    }

    pub fn graphics_pool(&self) -> vk::CommandPool {
        self.graphics_pool.vk_command_pool()
    }

    pub fn transfer_pool(&self) -> vk::CommandPool {
        self.transfer_pool.vk_command_pool()
    }

    pub fn compute_pool(&self) -> vk::CommandPool {
        self.compute_pool.vk_command_pool()
    }

    /// Graphics-queue command buffer for blocking setup work.
    pub fn setup_commands(&self) -> &OneShotCommands {
        &self.setup_commands
    }

    /// Transfer-queue command buffer for staging uploads.
    pub fn transfer_commands(&self) -> &OneShotCommands {
        &self.transfer_commands
    }

    pub fn swapchain_images(&self) -> &[vk::Image] {
        &self.swapchain_images
    }

    pub fn swapchain_views(&self) -> &[ImageView] {
        &self.swapchain_views
    }

    pub fn image_count(&self) -> usize {
        self.swapchain_images.len()
    }

    pub fn present_semaphore(&self) -> vk::Semaphore {
        self.present_semaphore.vk_semaphore()
    }
}
