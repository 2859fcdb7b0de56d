use super::{
    commands::{
        plan_frames,
        FrameEncoder,
    },
    descriptors::{
        geometry_bindings,
        lighting_bindings,
        pool_sizes,
        shared_bindings,
        CAMERA_BINDING,
        INDEX_STORAGE_BINDING,
        INPUT_ATTACHMENT_BINDINGS,
        LIGHTING_TEXTURE_BINDING,
        MAX_SETS,
        TEXTURE_BINDING,
        UNIFORM_BINDING,
        VERTEX_STORAGE_BINDING,
    },
    gbuffer::{
        GBuffer,
        GBufferTarget,
    },
    pipeline::{
        BuildStage,
        PipelineSet,
        ShaderBytecode,
        ShaderModules,
    },
    render_pass::create_deferred_render_pass,
    scene::{
        DrawBufferLayout,
        Scene,
        SpecializationData,
    },
    uniforms::{
        CameraUniform,
        StandardUniforms,
    },
};
use crate::{
    common::{
        buffer::Buffer,
        command_buffer::CommandBuffers,
        consts::{
            FENCE_TIMEOUT,
            MAX_TEXTURES,
            UNIFORM_INSTANCES,
        },
        descriptor_pool::DescriptorPool,
        descriptor_set::DescriptorSet,
        descriptor_set_layout::DescriptorSetLayout,
        framebuffer::Framebuffer,
        memory::MemoryProperties,
        render_pass::RenderPass,
        storage_buffer::StorageBuffer,
        sync::FrameSync,
        uniform_buffer::UniformBuffer,
    },
    context::{
        DeviceContext,
        RenderContext,
        WindowContext,
    },
    error::{
        SetupError,
        Stage,
    },
    texture::{
        texture::Texture,
        texture_sampler::TextureSampler,
    },
};
use anyhow::{
    Context as _,
    Result,
};
use ash::vk;
use nalgebra_glm::Vec3;

const WHITE_PIXEL: [u8; 4] = [0xFF; 4];

/// Texture slots shared by both passes. Empty slots sample `fallback`.
struct TextureSlots {
    slots: Vec<Option<Texture>>,
    fallback: Texture,
    sampler: TextureSampler,
}

impl TextureSlots {
    fn descriptor_info(&self, slot: usize) -> vk::DescriptorImageInfo {
        self.slots[slot]
            .as_ref()
            .unwrap_or(&self.fallback)
            .descriptor_info(self.sampler.vk_sampler())
    }
}

/// Everything `build_pipeline` creates. Sets are freed before their pool and
/// pipelines are destroyed before the layouts they were built from.
struct PipelineResources {
    shared_set: DescriptorSet,
    lighting_set: DescriptorSet,
    geometry_set: DescriptorSet,
    textures: TextureSlots,
    pipelines: PipelineSet,
    _shared_set_layout: DescriptorSetLayout,
    _lighting_set_layout: DescriptorSetLayout,
    _geometry_set_layout: DescriptorSetLayout,
    _descriptor_pool: DescriptorPool,
    _shaders: ShaderModules,
    camera: UniformBuffer<CameraUniform>,
    uniforms: UniformBuffer<StandardUniforms>,
}

impl PipelineResources {
    fn write_texture(&self, slot: usize) {
        let image_info = self.textures.descriptor_info(slot);
        let descriptor_type = vk::DescriptorType::COMBINED_IMAGE_SAMPLER;
        self.geometry_set
            .write_image(TEXTURE_BINDING, slot as u32, descriptor_type, image_info);
        self.lighting_set.write_image(
            LIGHTING_TEXTURE_BINDING,
            slot as u32,
            descriptor_type,
            image_info,
        );
    }
}

/// One draw command buffer per swap image plus the frame fence.
struct FrameResources {
    sync: FrameSync,
    command_buffers: CommandBuffers,
}

/// Two-subpass deferred renderer. Create it, build the pipeline, fill
/// textures, then record commands; `render` only runs once all of that is
/// done. Fields drop in reverse creation order after an idle wait.
pub struct DeferredRenderer {
    frame: Option<FrameResources>,
    pipeline: Option<PipelineResources>,
    stage: BuildStage,
    index_storage: StorageBuffer,
    vertex_storage: StorageBuffer,
    draw_buffer: Buffer,
    framebuffers: Vec<Framebuffer>,
    render_pass: RenderPass,
    gbuffer: GBuffer,
    draw_layout: DrawBufferLayout,
    draw_count: u32,
    specialization: SpecializationData,
    cam_pos: Vec3,
    extent: vk::Extent2D,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    swap_images: Vec<vk::Image>,
    graphics_pool: vk::CommandPool,
    graphics_queue: vk::Queue,
    present_semaphore: vk::Semaphore,
    atom_size: vk::DeviceSize,
    memory_properties: MemoryProperties,
    device: ash::Device,
}

impl Drop for DeferredRenderer {
    fn drop(&mut self) {
        unsafe {
            if let Err(error) = self.device.device_wait_idle() {
                log::error!("device wait idle failed: {error}");
            }
        }
    }
}

impl DeferredRenderer {
    pub fn new(
        device_context: &DeviceContext,
        window_context: &WindowContext,
        render_context: &RenderContext,
        scene: &Scene,
    ) -> Result<Self> {
        let device = device_context.ash_device().clone();
        let memory_properties = *device_context.memory_properties();
        let extent = window_context.extent();

        let gbuffer = GBuffer::new(
            extent,
            &memory_properties,
            render_context.setup_commands(),
            device.clone(),
        )?;
        log::debug!(
            "g-buffer: {} bytes, offsets {:?}",
            gbuffer.allocation_size(),
            GBufferTarget::ALL.map(|target| gbuffer.offset(target))
        );

        log::info!("creating deferred render pass");
        let render_pass = create_deferred_render_pass(window_context.format(), device.clone())
            .context(SetupError::resource(Stage::RendererCreate, "render pass", -7))?;

        log::info!(
            "creating {} framebuffers",
            render_context.swapchain_views().len()
        );
        let framebuffers = render_context
            .swapchain_views()
            .iter()
            .map(|swap_view| {
                let attachments = [
                    swap_view.vk_image_view(),
                    gbuffer.view(GBufferTarget::Depth),
                    gbuffer.view(GBufferTarget::Albedo),
                    gbuffer.view(GBufferTarget::Position),
                    gbuffer.view(GBufferTarget::Normal),
                ];
                Framebuffer::new(
                    render_pass.vk_render_pass(),
                    &attachments,
                    extent,
                    device.clone(),
                )
            })
            .collect::<Result<Vec<_>>>()
            .context(SetupError::resource(Stage::RendererCreate, "framebuffer", -8))?;

        let draw_layout = scene.layout();
        log::info!(
            "creating draw buffer ({} bytes, {} draws)",
            draw_layout.size,
            scene.draws.len()
        );
        let draw_buffer = Buffer::new(
            draw_layout.size,
            vk::BufferUsageFlags::VERTEX_BUFFER
                | vk::BufferUsageFlags::INDEX_BUFFER
                | vk::BufferUsageFlags::INDIRECT_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            &[],
            &memory_properties,
            device.clone(),
        )
        .and_then(|buffer| {
            buffer.write(0, &scene.pack_draw_buffer())?;
            Ok(buffer)
        })
        .context(SetupError::resource(Stage::RendererCreate, "draw buffer", -9))?;

        log::info!("uploading shader storage buffers");
        let queue_families = device_context.queue_family_indices().unique_families();
        let vertex_storage = StorageBuffer::new(
            bytemuck::cast_slice(&scene.vertices),
            &queue_families,
            &memory_properties,
            render_context.transfer_commands(),
            device.clone(),
        )
        .context(SetupError::resource(Stage::RendererCreate, "vertex storage buffer", -10))?;
        let index_storage = StorageBuffer::new(
            bytemuck::cast_slice(&scene.triangle_indices()),
            &queue_families,
            &memory_properties,
            render_context.transfer_commands(),
            device.clone(),
        )
        .context(SetupError::resource(Stage::RendererCreate, "index storage buffer", -11))?;

        let swapchain = window_context.swapchain();
        Ok(Self {
            frame: None,
            pipeline: None,
            stage: BuildStage::Unbuilt,
            index_storage,
            vertex_storage,
            draw_buffer,
            framebuffers,
            render_pass,
            gbuffer,
            draw_layout,
            draw_count: scene.draws.len() as u32,
            specialization: scene.specialization(),
            cam_pos: Vec3::zeros(),
            extent,
            swapchain_loader: swapchain.swapchain_loader().clone(),
            swapchain: swapchain.vk_swapchain(),
            swap_images: render_context.swapchain_images().to_vec(),
            graphics_pool: render_context.graphics_pool(),
            graphics_queue: device_context.queues().graphics,
            present_semaphore: render_context.present_semaphore(),
            atom_size: device_context.non_coherent_atom_size(),
            memory_properties,
            device,
        })
    }

    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    /// Creates uniforms, shaders, descriptors, layouts and both pipelines.
    /// On failure everything created so far is released and the renderer
    /// returns to `Unbuilt`.
    pub fn build_pipeline(
        &mut self,
        bytecode: &ShaderBytecode,
        render_context: &RenderContext,
    ) -> Result<()> {
        anyhow::ensure!(
            self.stage == BuildStage::Unbuilt,
            "pipeline already built ({:?})",
            self.stage
        );
        match self.create_pipeline_resources(bytecode, render_context) {
            Ok(pipeline) => {
                self.pipeline = Some(pipeline);
                Ok(())
            }
            Err(error) => {
                self.stage = BuildStage::Unbuilt;
                Err(error)
            }
        }
    }

    fn create_pipeline_resources(
        &mut self,
        bytecode: &ShaderBytecode,
        render_context: &RenderContext,
    ) -> Result<PipelineResources> {
        let device = self.device.clone();

        log::info!("creating uniform buffers");
        let uniforms = UniformBuffer::new(
            &[StandardUniforms::default(); UNIFORM_INSTANCES],
            self.atom_size,
            &self.memory_properties,
            device.clone(),
        )
        .context(SetupError::resource(Stage::Pipeline, "uniform buffer", -1))?;
        let camera = UniformBuffer::new(
            &[CameraUniform::new(&self.cam_pos)],
            self.atom_size,
            &self.memory_properties,
            device.clone(),
        )
        .context(SetupError::resource(Stage::Pipeline, "camera buffer", -1))?;

        log::info!("loading shaders");
        let shaders = ShaderModules::new(bytecode, &device)?;
        self.stage.advance(BuildStage::ShadersLoaded)?;

        log::info!("creating descriptor sets");
        let descriptor_pool = DescriptorPool::new(MAX_SETS, &pool_sizes(), device.clone())
            .context(SetupError::resource(Stage::Pipeline, "descriptor pool", -3))?;
        let geometry_set_layout = DescriptorSetLayout::new(&geometry_bindings(), device.clone())
            .context(SetupError::resource(Stage::Pipeline, "descriptor set layout", -3))?;
        let lighting_set_layout = DescriptorSetLayout::new(&lighting_bindings(), device.clone())
            .context(SetupError::resource(Stage::Pipeline, "descriptor set layout", -3))?;
        let shared_set_layout = DescriptorSetLayout::new(&shared_bindings(), device.clone())
            .context(SetupError::resource(Stage::Pipeline, "descriptor set layout", -3))?;

        let allocate = |layout: &DescriptorSetLayout| {
            DescriptorSet::new(
                layout.vk_descriptor_set_layout(),
                descriptor_pool.vk_pool(),
                device.clone(),
            )
            .context(SetupError::resource(Stage::Pipeline, "descriptor set", -3))
        };
        let geometry_set = allocate(&geometry_set_layout)?;
        let lighting_set = allocate(&lighting_set_layout)?;
        let shared_set = allocate(&shared_set_layout)?;

        let textures = TextureSlots {
            slots: (0..MAX_TEXTURES).map(|_| None).collect(),
            fallback: Texture::new(
                1,
                1,
                &WHITE_PIXEL,
                &self.memory_properties,
                render_context.setup_commands(),
                device.clone(),
            )?,
            sampler: TextureSampler::new(device.clone())?,
        };

        geometry_set.write_buffer(
            UNIFORM_BINDING,
            vk::DescriptorType::UNIFORM_BUFFER,
            uniforms.vk_buffer(),
            uniforms.byte_size(),
        );
        for (binding, target) in INPUT_ATTACHMENT_BINDINGS.iter().zip(GBufferTarget::COLOR) {
            let image_info = vk::DescriptorImageInfo::default()
                .image_view(self.gbuffer.view(target))
                .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
            lighting_set.write_image(*binding, 0, vk::DescriptorType::INPUT_ATTACHMENT, image_info);
        }
        lighting_set.write_buffer(
            CAMERA_BINDING,
            vk::DescriptorType::UNIFORM_BUFFER,
            camera.vk_buffer(),
            camera.byte_size(),
        );
        shared_set.write_buffer(
            VERTEX_STORAGE_BINDING,
            vk::DescriptorType::STORAGE_BUFFER,
            self.vertex_storage.vk_buffer(),
            self.vertex_storage.size(),
        );
        shared_set.write_buffer(
            INDEX_STORAGE_BINDING,
            vk::DescriptorType::STORAGE_BUFFER,
            self.index_storage.vk_buffer(),
            self.index_storage.size(),
        );
        self.stage.advance(BuildStage::DescriptorsBound)?;

        log::info!("creating pipeline layouts");
        let layouts = PipelineSet::create_layouts(
            geometry_set_layout.vk_descriptor_set_layout(),
            lighting_set_layout.vk_descriptor_set_layout(),
            shared_set_layout.vk_descriptor_set_layout(),
            &device,
        )?;
        self.stage.advance(BuildStage::LayoutsCreated)?;

        let pipelines = PipelineSet::new(
            &shaders,
            layouts,
            self.render_pass.vk_render_pass(),
            &self.specialization,
            &device,
        )?;
        self.stage.advance(BuildStage::PipelinesCreated)?;

        let resources = PipelineResources {
            shared_set,
            lighting_set,
            geometry_set,
            textures,
            pipelines,
            _shared_set_layout: shared_set_layout,
            _lighting_set_layout: lighting_set_layout,
            _geometry_set_layout: geometry_set_layout,
            _descriptor_pool: descriptor_pool,
            _shaders: shaders,
            camera,
            uniforms,
        };
        for slot in 0..MAX_TEXTURES {
            resources.write_texture(slot);
        }
        Ok(resources)
    }

    /// Allocates one draw command buffer per swap image and records each once.
    pub fn record_commands(&mut self) -> Result<()> {
        anyhow::ensure!(
            self.stage == BuildStage::PipelinesCreated,
            "cannot record commands at {:?}",
            self.stage
        );

        log::info!("recording {} draw command buffers", self.swap_images.len());
        let command_buffers = CommandBuffers::new(
            self.device.clone(),
            self.graphics_pool,
            self.swap_images.len() as u32,
        )
        .context(SetupError::resource(Stage::RenderCommands, "draw command buffers", -1))?;
        let sync = FrameSync::new(self.device.clone())
            .context(SetupError::resource(Stage::RenderCommands, "frame sync", -2))?;

        self.encode(&command_buffers)?;
        self.frame = Some(FrameResources {
            sync,
            command_buffers,
        });

        self.stage.advance(BuildStage::CommandsRecorded)?;
        self.stage.advance(BuildStage::Built)
    }

    fn encode(&self, command_buffers: &CommandBuffers) -> Result<()> {
        let pipeline = self
            .pipeline
            .as_ref()
            .context("pipeline resources missing")?;
        let framebuffers = self
            .framebuffers
            .iter()
            .map(Framebuffer::vk_framebuffer)
            .collect::<Vec<_>>();
        let shared_set = pipeline.shared_set.vk_descriptor_set();
        let encoder = FrameEncoder {
            device: &self.device,
            pipelines: &pipeline.pipelines,
            render_pass: self.render_pass.vk_render_pass(),
            framebuffers: &framebuffers,
            swap_images: &self.swap_images,
            extent: self.extent,
            draw_buffer: self.draw_buffer.vk_buffer(),
            geometry_sets: [pipeline.geometry_set.vk_descriptor_set(), shared_set],
            lighting_sets: [pipeline.lighting_set.vk_descriptor_set(), shared_set],
        };

        let plans = plan_frames(self.swap_images.len(), &self.draw_layout, self.draw_count);
        for (command_buffer, plan) in command_buffers.vk_command_buffers().iter().zip(plans) {
            encoder
                .encode(*command_buffer, &plan)
                .context(SetupError::resource(Stage::RenderCommands, "draw commands", -3))?;
        }
        Ok(())
    }

    /// Descriptor writes invalidate recorded buffers, so they are recorded
    /// again once the device is idle.
    fn rerecord(&self) -> Result<()> {
        if let Some(frame) = self.frame.as_ref() {
            log::debug!("re-recording draw commands");
            self.encode(&frame.command_buffers)?;
        }
        Ok(())
    }

    fn pipeline_resources(&self) -> Result<&PipelineResources> {
        self.pipeline
            .as_ref()
            .context("pipeline has not been built")
    }

    /// Acquire, submit, present, then block on the frame fence so the next
    /// uniform write cannot race the GPU.
    pub fn render(&self) -> Result<()> {
        anyhow::ensure!(
            self.stage.is_built(),
            "renderer is not built ({:?})",
            self.stage
        );
        let frame = self.frame.as_ref().context("no recorded commands")?;

        let (image_index, suboptimal) = unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                FENCE_TIMEOUT,
                self.present_semaphore,
                vk::Fence::null(),
            )?
        };
        if suboptimal {
            log::warn!("swapchain is suboptimal for the surface");
        }

        let wait_semaphores = [self.present_semaphore];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [frame.command_buffers.vk_command_buffers()[image_index as usize]];
        let signal_semaphores = [frame.sync.render_complete()];
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);
        unsafe {
            self.device.queue_submit(
                self.graphics_queue,
                &[submit_info],
                frame.sync.frame_fence(),
            )?;
        }

        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);
        unsafe {
            self.swapchain_loader
                .queue_present(self.graphics_queue, &present_info)?;
        }

        let fences = [frame.sync.frame_fence()];
        unsafe {
            self.device.wait_for_fences(&fences, true, FENCE_TIMEOUT)?;
            self.device.reset_fences(&fences)?;
        }
        Ok(())
    }

    pub fn update_uniforms(&self, uniforms: &[StandardUniforms]) -> Result<()> {
        self.pipeline_resources()?.uniforms.update_all(uniforms)
    }

    pub fn update_uniform(&self, index: usize, uniform: &StandardUniforms) -> Result<()> {
        self.pipeline_resources()?
            .uniforms
            .update_single(index, uniform)
    }

    /// Stored immediately; written to the camera buffer once it exists.
    pub fn set_cam_pos(&mut self, cam_pos: Vec3) -> Result<()> {
        self.cam_pos = cam_pos;
        if let Some(pipeline) = self.pipeline.as_ref() {
            pipeline
                .camera
                .update_all(&[CameraUniform::new(&self.cam_pos)])?;
        }
        Ok(())
    }

    pub fn cam_pos(&self) -> Vec3 {
        self.cam_pos
    }

    /// Fills `slot` with an RGBA8 image and points both passes at it.
    pub fn create_texture(
        &mut self,
        slot: usize,
        width: u32,
        height: u32,
        pixels: &[u8],
        render_context: &RenderContext,
    ) -> Result<()> {
        anyhow::ensure!(slot < MAX_TEXTURES, "texture slot {} out of range", slot);
        self.pipeline_resources()?;

        let texture = Texture::new(
            width,
            height,
            pixels,
            &self.memory_properties,
            render_context.setup_commands(),
            self.device.clone(),
        )?;

        unsafe { self.device.device_wait_idle()? };
        if let Some(pipeline) = self.pipeline.as_mut() {
            if pipeline.textures.slots[slot].replace(texture).is_some() {
                log::debug!("replaced texture in slot {}", slot);
            }
        }
        self.update_texture(slot)
    }

    /// Writes the combined image sampler for `slot` into both passes' sets.
    pub fn update_texture(&self, slot: usize) -> Result<()> {
        anyhow::ensure!(slot < MAX_TEXTURES, "texture slot {} out of range", slot);
        let pipeline = self.pipeline_resources()?;
        if pipeline.textures.slots[slot].is_none() {
            log::warn!("texture slot {} is empty, binding the default", slot);
        }

        unsafe { self.device.device_wait_idle()? };
        pipeline.write_texture(slot);
        self.rerecord()
    }

    /// Reverts `slot` to the default texture. Empty slots are left alone.
    pub fn destroy_texture(&mut self, slot: usize) -> Result<()> {
        anyhow::ensure!(slot < MAX_TEXTURES, "texture slot {} out of range", slot);
        let Some(pipeline) = self.pipeline.as_ref() else {
            return Ok(());
        };
        if pipeline.textures.slots[slot].is_none() {
            return Ok(());
        }

        unsafe { self.device.device_wait_idle()? };
        let removed = self
            .pipeline
            .as_mut()
            .and_then(|pipeline| pipeline.textures.slots[slot].take());
        if let Some(pipeline) = self.pipeline.as_ref() {
            pipeline.write_texture(slot);
        }
        self.rerecord()?;
        drop(removed);
        Ok(())
    }
}
