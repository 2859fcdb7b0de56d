use super::scene::SpecializationData;
use crate::{
    common::{
        graphics_pipeline::GraphicsPipeline,
        pipeline_layout::PipelineLayout,
        vertex::Vertex,
    },
    error::{
        SetupError,
        Stage,
    },
    shader::shader::{
        spirv_words,
        ShaderModule,
    },
};
use anyhow::{
    Context as _,
    Result,
};
use ash::vk;

/// Progress of the deferred pipeline build. Each step must follow the one
/// before it; teardown releases everything at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildStage {
    Unbuilt,
    ShadersLoaded,
    DescriptorsBound,
    LayoutsCreated,
    PipelinesCreated,
    CommandsRecorded,
    Built,
}

impl BuildStage {
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Unbuilt => Some(Self::ShadersLoaded),
            Self::ShadersLoaded => Some(Self::DescriptorsBound),
            Self::DescriptorsBound => Some(Self::LayoutsCreated),
            Self::LayoutsCreated => Some(Self::PipelinesCreated),
            Self::PipelinesCreated => Some(Self::CommandsRecorded),
            Self::CommandsRecorded => Some(Self::Built),
            Self::Built => None,
        }
    }

    /// Moves to `to` when it is the immediate successor.
    pub fn advance(&mut self, to: Self) -> Result<()> {
        anyhow::ensure!(
            self.next() == Some(to),
            "cannot move from {:?} to {:?}",
            self,
            to
        );
        log::debug!("pipeline build: {:?} -> {:?}", self, to);
        *self = to;
        Ok(())
    }

    pub fn is_built(self) -> bool {
        self == Self::Built
    }
}

/// Raw SPIR-V for the two stage pairs.
#[derive(Debug, Clone, Copy)]
pub struct ShaderBytecode<'a> {
    pub geometry_vertex: &'a [u8],
    pub geometry_fragment: &'a [u8],
    pub lighting_vertex: &'a [u8],
    pub lighting_fragment: &'a [u8],
}

pub struct ShaderModules {
    pub geometry_vertex: ShaderModule,
    pub geometry_fragment: ShaderModule,
    pub lighting_vertex: ShaderModule,
    pub lighting_fragment: ShaderModule,
}

impl ShaderModules {
    pub fn new(bytecode: &ShaderBytecode, device: &ash::Device) -> Result<Self> {
        let module = |code: &[u8]| -> Result<ShaderModule> {
            let words = spirv_words(code)?;
            ShaderModule::new(&words, device.clone())
                .context(SetupError::resource(Stage::Pipeline, "shader module", -2))
        };
        Ok(Self {
            geometry_vertex: module(bytecode.geometry_vertex)?,
            geometry_fragment: module(bytecode.geometry_fragment)?,
            lighting_vertex: module(bytecode.lighting_vertex)?,
            lighting_fragment: module(bytecode.lighting_fragment)?,
        })
    }
}

/// Depth test for the geometry subpass, none for lighting.
pub fn depth_state(test: bool) -> vk::PipelineDepthStencilStateCreateInfo<'static> {
    let keep = vk::StencilOpState::default()
        .fail_op(vk::StencilOp::KEEP)
        .pass_op(vk::StencilOp::KEEP)
        .depth_fail_op(vk::StencilOp::KEEP)
        .compare_op(vk::CompareOp::ALWAYS);
    vk::PipelineDepthStencilStateCreateInfo::default()
        .depth_test_enable(test)
        .depth_write_enable(test)
        .depth_compare_op(if test {
            vk::CompareOp::LESS_OR_EQUAL
        } else {
            vk::CompareOp::ALWAYS
        })
        .depth_bounds_test_enable(false)
        .stencil_test_enable(false)
        .front(keep)
        .back(keep)
        .min_depth_bounds(0.0)
        .max_depth_bounds(1.0)
}

/// Straight overwrite of every channel.
pub fn opaque_blend_attachments(count: usize) -> Vec<vk::PipelineColorBlendAttachmentState> {
    vec![
        vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(false)
            .color_write_mask(vk::ColorComponentFlags::RGBA);
        count
    ]
}

pub fn rasterization_state() -> vk::PipelineRasterizationStateCreateInfo<'static> {
    vk::PipelineRasterizationStateCreateInfo::default()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(vk::PolygonMode::FILL)
        .cull_mode(vk::CullModeFlags::BACK)
        .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
        .depth_bias_enable(false)
        .line_width(1.0)
}

/// Both subpass pipelines and their layouts. The layouts differ only in the
/// first set.
pub struct PipelineSet {
    pipelines: GraphicsPipeline,
    lighting_layout: PipelineLayout,
    geometry_layout: PipelineLayout,
}

pub const GEOMETRY_PIPELINE: usize = 0;
pub const LIGHTING_PIPELINE: usize = 1;

impl PipelineSet {
    pub fn create_layouts(
        geometry_set: vk::DescriptorSetLayout,
        lighting_set: vk::DescriptorSetLayout,
        shared_set: vk::DescriptorSetLayout,
        device: &ash::Device,
    ) -> Result<(PipelineLayout, PipelineLayout)> {
        let geometry_layout = PipelineLayout::new(&[geometry_set, shared_set], device.clone())
            .context(SetupError::resource(Stage::Pipeline, "geometry pipeline layout", -4))?;
        let lighting_layout = PipelineLayout::new(&[lighting_set, shared_set], device.clone())
            .context(SetupError::resource(Stage::Pipeline, "lighting pipeline layout", -4))?;
        Ok((geometry_layout, lighting_layout))
    }

    pub fn new(
        shaders: &ShaderModules,
        layouts: (PipelineLayout, PipelineLayout),
        render_pass: vk::RenderPass,
        specialization: &SpecializationData,
        device: &ash::Device,
    ) -> Result<Self> {
        let (geometry_layout, lighting_layout) = layouts;

        let map_entries = SpecializationData::map_entries();
        let specialization_info = vk::SpecializationInfo::default()
            .map_entries(&map_entries)
            .data(bytemuck::bytes_of(specialization));

        let stage = |stage: vk::ShaderStageFlags, module: &ShaderModule| {
            vk::PipelineShaderStageCreateInfo::default()
                .stage(stage)
                .module(module.vk_shader_module())
                .name(c"main")
                .specialization_info(&specialization_info)
        };
        let geometry_stages = [
            stage(vk::ShaderStageFlags::VERTEX, &shaders.geometry_vertex),
            stage(vk::ShaderStageFlags::FRAGMENT, &shaders.geometry_fragment),
        ];
        let lighting_stages = [
            stage(vk::ShaderStageFlags::VERTEX, &shaders.lighting_vertex),
            stage(vk::ShaderStageFlags::FRAGMENT, &shaders.lighting_fragment),
        ];

        let binding_descriptions = Vertex::get_binding_descriptions();
        let attribute_descriptions = Vertex::get_attribute_descriptions();
        let geometry_vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&binding_descriptions)
            .vertex_attribute_descriptions(&attribute_descriptions);
        let lighting_vertex_input = vk::PipelineVertexInputStateCreateInfo::default();

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);
        let rasterization = rasterization_state();
        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1)
            .sample_shading_enable(false);
        let geometry_depth = depth_state(true);
        let lighting_depth = depth_state(false);

        let geometry_blend_attachments = opaque_blend_attachments(3);
        let lighting_blend_attachments = opaque_blend_attachments(1);
        let geometry_blend = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&geometry_blend_attachments);
        let lighting_blend = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&lighting_blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let create_infos = [
            vk::GraphicsPipelineCreateInfo::default()
                .stages(&geometry_stages)
                .vertex_input_state(&geometry_vertex_input)
                .input_assembly_state(&input_assembly)
                .viewport_state(&viewport_state)
                .rasterization_state(&rasterization)
                .multisample_state(&multisample)
                .depth_stencil_state(&geometry_depth)
                .color_blend_state(&geometry_blend)
                .dynamic_state(&dynamic_state)
                .layout(geometry_layout.vk_pipeline_layout())
                .render_pass(render_pass)
                .subpass(0),
            vk::GraphicsPipelineCreateInfo::default()
                .stages(&lighting_stages)
                .vertex_input_state(&lighting_vertex_input)
                .input_assembly_state(&input_assembly)
                .viewport_state(&viewport_state)
                .rasterization_state(&rasterization)
                .multisample_state(&multisample)
                .depth_stencil_state(&lighting_depth)
                .color_blend_state(&lighting_blend)
                .dynamic_state(&dynamic_state)
                .layout(lighting_layout.vk_pipeline_layout())
                .render_pass(render_pass)
                .subpass(1),
        ];

        log::info!("creating geometry and lighting pipelines");
        let pipelines = GraphicsPipeline::new(&create_infos, device.clone())
            .context(SetupError::resource(Stage::Pipeline, "graphics pipelines", -5))?;

        Ok(Self {
            pipelines,
            lighting_layout,
            geometry_layout,
        })
    }

    pub fn geometry_pipeline(&self) -> vk::Pipeline {
        self.pipelines.vk_pipeline(GEOMETRY_PIPELINE)
    }

    pub fn lighting_pipeline(&self) -> vk::Pipeline {
        self.pipelines.vk_pipeline(LIGHTING_PIPELINE)
    }

    pub fn geometry_layout(&self) -> vk::PipelineLayout {
        self.geometry_layout.vk_pipeline_layout()
    }

    pub fn lighting_layout(&self) -> vk::PipelineLayout {
        self.lighting_layout.vk_pipeline_layout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_in_order() {
        let mut stage = BuildStage::Unbuilt;
        let order = [
            BuildStage::ShadersLoaded,
            BuildStage::DescriptorsBound,
            BuildStage::LayoutsCreated,
            BuildStage::PipelinesCreated,
            BuildStage::CommandsRecorded,
            BuildStage::Built,
        ];
        for next in order {
            assert!(!stage.is_built());
            stage.advance(next).unwrap();
        }
        assert!(stage.is_built());
        assert_eq!(stage.next(), None);
    }

    #[test]
    fn stages_cannot_be_skipped() {
        let mut stage = BuildStage::ShadersLoaded;
        assert!(stage.advance(BuildStage::PipelinesCreated).is_err());
        assert_eq!(stage, BuildStage::ShadersLoaded);
        assert!(stage.advance(BuildStage::Unbuilt).is_err());
    }

    #[test]
    fn geometry_depth_test_is_less_or_equal() {
        let geometry = depth_state(true);
        assert_eq!(geometry.depth_test_enable, vk::TRUE);
        assert_eq!(geometry.depth_write_enable, vk::TRUE);
        assert_eq!(geometry.depth_compare_op, vk::CompareOp::LESS_OR_EQUAL);

        let lighting = depth_state(false);
        assert_eq!(lighting.depth_test_enable, vk::FALSE);
        assert_eq!(lighting.depth_write_enable, vk::FALSE);
    }

    #[test]
    fn back_faces_culled_counter_clockwise_front() {
        let rasterization = rasterization_state();
        assert_eq!(rasterization.cull_mode, vk::CullModeFlags::BACK);
        assert_eq!(rasterization.front_face, vk::FrontFace::COUNTER_CLOCKWISE);
    }

    #[test]
    fn blending_is_disabled() {
        let attachments = opaque_blend_attachments(3);
        assert_eq!(attachments.len(), 3);
        assert!(attachments
            .iter()
            .all(|attachment| attachment.blend_enable == vk::FALSE));
    }
}
