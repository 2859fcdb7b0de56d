use super::gbuffer::GBufferTarget;
use crate::common::render_pass::RenderPass;
use anyhow::Result;
use ash::vk;

pub const ATTACHMENT_COUNT: usize = 5;
pub const SWAP_ATTACHMENT: u32 = 0;

/// Swap image first, then the G-buffer targets in allocation order. Only the
/// swap image is stored.
pub fn attachment_descriptions(
    swap_format: vk::Format,
) -> [vk::AttachmentDescription; ATTACHMENT_COUNT] {
    let describe = |format: vk::Format, store_op: vk::AttachmentStoreOp, layout: vk::ImageLayout| {
        vk::AttachmentDescription::default()
            .format(format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(store_op)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(layout)
            .final_layout(layout)
    };
    let target = |target: GBufferTarget| {
        describe(
            target.format(),
            vk::AttachmentStoreOp::DONT_CARE,
            target.attachment_layout(),
        )
    };

    [
        describe(
            swap_format,
            vk::AttachmentStoreOp::STORE,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ),
        target(GBufferTarget::Depth),
        target(GBufferTarget::Albedo),
        target(GBufferTarget::Position),
        target(GBufferTarget::Normal),
    ]
}

/// Geometry color writes become visible to lighting fragment reads, per
/// region.
pub fn subpass_dependency() -> vk::SubpassDependency {
    vk::SubpassDependency::default()
        .src_subpass(0)
        .dst_subpass(1)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER)
        .src_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
        .dst_access_mask(vk::AccessFlags::SHADER_READ)
        .dependency_flags(vk::DependencyFlags::BY_REGION)
}

fn color_target_references(layout: vk::ImageLayout) -> [vk::AttachmentReference; 3] {
    GBufferTarget::COLOR.map(|target| {
        vk::AttachmentReference::default()
            .attachment(target.attachment_index())
            .layout(layout)
    })
}

/// Subpass 0 fills the G-buffer, subpass 1 reads it back as input
/// attachments and writes the swap image.
pub fn create_deferred_render_pass(
    swap_format: vk::Format,
    device: ash::Device,
) -> Result<RenderPass> {
    let attachments = attachment_descriptions(swap_format);

    let write_references = color_target_references(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    let read_references = color_target_references(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    let depth_reference = vk::AttachmentReference::default()
        .attachment(GBufferTarget::Depth.attachment_index())
        .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
    let swap_reference = [vk::AttachmentReference::default()
        .attachment(SWAP_ATTACHMENT)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];

    let subpasses = [
        vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&write_references)
            .depth_stencil_attachment(&depth_reference),
        vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&swap_reference)
            .input_attachments(&read_references),
    ];
    let dependencies = [subpass_dependency()];

    let render_pass_create_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses)
        .dependencies(&dependencies);

    RenderPass::new(&render_pass_create_info, device)
}

/// Clear values in attachment order.
pub fn clear_values() -> [vk::ClearValue; ATTACHMENT_COUNT] {
    let zero = vk::ClearValue {
        color: vk::ClearColorValue {
            float32: [0.0, 0.0, 0.0, 0.0],
        },
    };
    [
        vk::ClearValue {
            color: vk::ClearColorValue {
                float32: [0.0, 0.0, 0.0, 1.0],
            },
        },
        vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: 1.0,
                stencil: 0,
            },
        },
        zero,
        zero,
        zero,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_image_is_the_only_stored_attachment() {
        let attachments = attachment_descriptions(vk::Format::B8G8R8A8_UNORM);
        assert_eq!(attachments[0].format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(attachments[0].store_op, vk::AttachmentStoreOp::STORE);
        for attachment in attachments.iter().skip(1) {
            assert_eq!(attachment.store_op, vk::AttachmentStoreOp::DONT_CARE);
        }
        assert!(attachments
            .iter()
            .all(|attachment| attachment.load_op == vk::AttachmentLoadOp::CLEAR));
    }

    #[test]
    fn attachment_formats_follow_the_gbuffer() {
        let attachments = attachment_descriptions(vk::Format::B8G8R8_UNORM);
        for target in GBufferTarget::ALL {
            let attachment = attachments[target.attachment_index() as usize];
            assert_eq!(attachment.format, target.format());
            assert_eq!(attachment.initial_layout, target.attachment_layout());
            assert_eq!(attachment.final_layout, target.attachment_layout());
        }
    }

    #[test]
    fn dependency_is_write_then_read_per_region() {
        let dependency = subpass_dependency();
        assert_eq!((dependency.src_subpass, dependency.dst_subpass), (0, 1));
        assert_eq!(
            dependency.src_stage_mask,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        );
        assert_eq!(
            dependency.dst_stage_mask,
            vk::PipelineStageFlags::FRAGMENT_SHADER
        );
        assert_eq!(
            dependency.src_access_mask,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
        );
        assert_eq!(dependency.dst_access_mask, vk::AccessFlags::SHADER_READ);
        assert_eq!(dependency.dependency_flags, vk::DependencyFlags::BY_REGION);
    }

    #[test]
    fn clears_background_to_opaque_black() {
        let values = clear_values();
        unsafe {
            assert_eq!(values[0].color.float32, [0.0, 0.0, 0.0, 1.0]);
            assert_eq!(values[1].depth_stencil.depth, 1.0);
            for value in values.iter().skip(2) {
                assert_eq!(value.color.float32, [0.0; 4]);
            }
        }
    }
}
