use crate::{
    common::{
        allocator::PackedImageMemory,
        command_buffer::OneShotCommands,
        image::{
            Image,
            LayoutTransition,
        },
        image_view::ImageView,
        memory::MemoryProperties,
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

/// G-buffer images in allocation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GBufferTarget {
    Depth,
    Albedo,
    Position,
    Normal,
}

impl GBufferTarget {
    pub const ALL: [Self; 4] = [Self::Depth, Self::Albedo, Self::Position, Self::Normal];
    pub const COLOR: [Self; 3] = [Self::Albedo, Self::Position, Self::Normal];

    pub fn format(self) -> vk::Format {
        match self {
            Self::Depth => vk::Format::D32_SFLOAT,
            Self::Albedo => vk::Format::R8G8B8A8_UNORM,
            Self::Position => vk::Format::R16G16B16A16_SFLOAT,
            Self::Normal => vk::Format::R16G16_SFLOAT,
        }
    }

    pub fn usage(self) -> vk::ImageUsageFlags {
        match self {
            Self::Depth => vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            _ => vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::INPUT_ATTACHMENT,
        }
    }

    pub fn aspect_mask(self) -> vk::ImageAspectFlags {
        match self {
            Self::Depth => vk::ImageAspectFlags::DEPTH,
            _ => vk::ImageAspectFlags::COLOR,
        }
    }

    /// Layout the render pass expects on entry.
    pub fn attachment_layout(self) -> vk::ImageLayout {
        match self {
            Self::Depth => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            _ => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }
    }

    /// One-time move from UNDEFINED into the attachment layout.
    pub fn initial_transition(self) -> LayoutTransition {
        match self {
            Self::Depth => LayoutTransition {
                aspect_mask: self.aspect_mask(),
                old_layout: vk::ImageLayout::UNDEFINED,
                new_layout: self.attachment_layout(),
                src_access_mask: vk::AccessFlags::empty(),
                dst_access_mask: vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                src_stage_mask: vk::PipelineStageFlags::TOP_OF_PIPE,
                dst_stage_mask: vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            },
            _ => LayoutTransition {
                aspect_mask: self.aspect_mask(),
                old_layout: vk::ImageLayout::UNDEFINED,
                new_layout: self.attachment_layout(),
                src_access_mask: vk::AccessFlags::empty(),
                dst_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
                src_stage_mask: vk::PipelineStageFlags::TOP_OF_PIPE,
                dst_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            },
        }
    }

    /// Position in the render pass attachment list. Slot 0 is the swap image.
    pub fn attachment_index(self) -> u32 {
        match self {
            Self::Depth => 1,
            Self::Albedo => 2,
            Self::Position => 3,
            Self::Normal => 4,
        }
    }
}

/// Depth, albedo, position and normal targets sharing one device-local
/// allocation. Views drop first, memory last.
pub struct GBuffer {
    views: Vec<ImageView>,
    _images: Vec<Image>,
    memory: PackedImageMemory,
}

impl GBuffer {
    pub fn new(
        extent: vk::Extent2D,
        memory_properties: &MemoryProperties,
        setup: &OneShotCommands,
        device: ash::Device,
    ) -> Result<Self> {
        log::info!("creating g-buffer {}x{}", extent.width, extent.height);
        let images = GBufferTarget::ALL
            .iter()
            .map(|target| {
                Image::new_2d(
                    target.format(),
                    extent,
                    target.usage(),
                    vk::ImageTiling::OPTIMAL,
                    vk::ImageLayout::UNDEFINED,
                    device.clone(),
                )
            })
            .collect::<Result<Vec<_>>>()
            .context(SetupError::resource(Stage::RendererCreate, "g-buffer image", -6))?;

        let handles = images.iter().map(Image::vk_image).collect::<Vec<_>>();
        let memory = PackedImageMemory::new(
            &handles,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            memory_properties,
            device.clone(),
            -2,
            -3,
        )?;

        setup
            .submit_and_wait(|device, command_buffer| {
                for (target, image) in GBufferTarget::ALL.iter().zip(handles.iter()) {
                    target
                        .initial_transition()
                        .record(device, command_buffer, *image);
                }
            })
            .context(SetupError::resource(Stage::RendererCreate, "g-buffer layouts", -4))?;

        let views = GBufferTarget::ALL
            .iter()
            .zip(handles.iter())
            .map(|(target, &image)| {
                ImageView::new(image, target.format(), target.aspect_mask(), device.clone())
            })
            .collect::<Result<Vec<_>>>()
            .context(SetupError::resource(Stage::RendererCreate, "g-buffer view", -5))?;

        Ok(Self {
            views,
            _images: images,
            memory,
        })
    }

    pub fn view(&self, target: GBufferTarget) -> vk::ImageView {
        self.views[target as usize].vk_image_view()
    }

    pub fn offset(&self, target: GBufferTarget) -> vk::DeviceSize {
        self.memory.layout().offsets[target as usize]
    }

    pub fn allocation_size(&self) -> vk::DeviceSize {
        self.memory.layout().size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_order_matches_declaration() {
        for (index, target) in GBufferTarget::ALL.iter().enumerate() {
            assert_eq!(*target as usize, index);
        }
    }

    #[test]
    fn only_color_targets_are_input_attachments() {
        for target in GBufferTarget::ALL {
            let is_input = target
                .usage()
                .contains(vk::ImageUsageFlags::INPUT_ATTACHMENT);
            assert_eq!(is_input, GBufferTarget::COLOR.contains(&target));
        }
    }

    #[test]
    fn transitions_land_in_attachment_layouts() {
        for target in GBufferTarget::ALL {
            let transition = target.initial_transition();
            assert_eq!(transition.old_layout, vk::ImageLayout::UNDEFINED);
            assert_eq!(transition.new_layout, target.attachment_layout());
            assert_eq!(transition.src_stage_mask, vk::PipelineStageFlags::TOP_OF_PIPE);
        }
        assert_eq!(
            GBufferTarget::Depth.initial_transition().dst_stage_mask,
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
        );
    }

    #[test]
    fn attachment_slots_follow_the_swap_image() {
        let slots = GBufferTarget::ALL.map(GBufferTarget::attachment_index);
        assert_eq!(slots, [1, 2, 3, 4]);
    }
}
