use super::{
    pipeline::PipelineSet,
    render_pass::clear_values,
    scene::{
        DrawBufferLayout,
        INDIRECT_STRIDE,
    },
};
use crate::common::image::LayoutTransition;
use anyhow::Result;
use ash::vk;

/// Swap image handoff between the presentation engine and the render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapTransition {
    ToAttachment,
    ToPresent,
}

impl SwapTransition {
    pub fn barrier(self) -> LayoutTransition {
        match self {
            Self::ToAttachment => LayoutTransition {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                old_layout: vk::ImageLayout::PRESENT_SRC_KHR,
                new_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                src_access_mask: vk::AccessFlags::MEMORY_READ,
                dst_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_READ
                    | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
                src_stage_mask: vk::PipelineStageFlags::TOP_OF_PIPE,
                dst_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            },
            Self::ToPresent => LayoutTransition {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                old_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                new_layout: vk::ImageLayout::PRESENT_SRC_KHR,
                src_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
                dst_access_mask: vk::AccessFlags::MEMORY_READ,
                src_stage_mask: vk::PipelineStageFlags::ALL_COMMANDS,
                dst_stage_mask: vk::PipelineStageFlags::BOTTOM_OF_PIPE,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subpass {
    Geometry,
    Lighting,
}

/// One step of a pre-recorded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameCommand {
    /// Host uniform writes become visible to vertex shading.
    UniformBarrier,
    SwapBarrier {
        image_index: usize,
        transition: SwapTransition,
    },
    BeginRenderPass {
        framebuffer_index: usize,
    },
    BindPipeline(Subpass),
    SetViewportAndScissor,
    BindDrawBuffers {
        vertex_offset: vk::DeviceSize,
        index_offset: vk::DeviceSize,
    },
    BindDescriptorSets(Subpass),
    DrawIndexedIndirect {
        draw_count: u32,
        stride: u32,
    },
    NextSubpass,
    DrawFullscreenTriangle,
    EndRenderPass,
}

/// Command sequence for swap image `image_index`. With no queued draws the
/// indirect draw is left out; barriers and clears stay.
pub fn plan_frame(
    image_index: usize,
    layout: &DrawBufferLayout,
    draw_count: u32,
) -> Vec<FrameCommand> {
    let mut commands = vec![
        FrameCommand::UniformBarrier,
        FrameCommand::SwapBarrier {
            image_index,
            transition: SwapTransition::ToAttachment,
        },
        FrameCommand::BeginRenderPass {
            framebuffer_index: image_index,
        },
        FrameCommand::BindPipeline(Subpass::Geometry),
        FrameCommand::SetViewportAndScissor,
        FrameCommand::BindDrawBuffers {
            vertex_offset: layout.vertex_offset,
            index_offset: layout.index_offset,
        },
        FrameCommand::BindDescriptorSets(Subpass::Geometry),
    ];
    if draw_count > 0 {
        commands.push(FrameCommand::DrawIndexedIndirect {
            draw_count,
            stride: INDIRECT_STRIDE,
        });
    }
    commands.extend([
        FrameCommand::NextSubpass,
        FrameCommand::BindPipeline(Subpass::Lighting),
        FrameCommand::BindDescriptorSets(Subpass::Lighting),
        FrameCommand::DrawFullscreenTriangle,
        FrameCommand::EndRenderPass,
        FrameCommand::SwapBarrier {
            image_index,
            transition: SwapTransition::ToPresent,
        },
    ]);
    commands
}

/// One plan per swap image.
pub fn plan_frames(
    image_count: usize,
    layout: &DrawBufferLayout,
    draw_count: u32,
) -> Vec<Vec<FrameCommand>> {
    (0..image_count)
        .map(|image_index| plan_frame(image_index, layout, draw_count))
        .collect()
}

/// Handles a frame plan needs to become commands.
pub struct FrameEncoder<'a> {
    pub device: &'a ash::Device,
    pub pipelines: &'a PipelineSet,
    pub render_pass: vk::RenderPass,
    pub framebuffers: &'a [vk::Framebuffer],
    pub swap_images: &'a [vk::Image],
    pub extent: vk::Extent2D,
    pub draw_buffer: vk::Buffer,
    pub geometry_sets: [vk::DescriptorSet; 2],
    pub lighting_sets: [vk::DescriptorSet; 2],
}

impl FrameEncoder<'_> {
    pub fn encode(&self, command_buffer: vk::CommandBuffer, commands: &[FrameCommand]) -> Result<()> {
        let device = self.device;
        let begin_info = vk::CommandBufferBeginInfo::default();
        unsafe { device.begin_command_buffer(command_buffer, &begin_info)? };

        for command in commands.iter() {
            log::debug!("recording {:?}", command);
            self.encode_one(command_buffer, *command);
        }

        unsafe { device.end_command_buffer(command_buffer)? };
        Ok(())
    }

    fn encode_one(&self, command_buffer: vk::CommandBuffer, command: FrameCommand) {
        let device = self.device;
        match command {
            FrameCommand::UniformBarrier => {
                let barrier = vk::MemoryBarrier::default()
                    .src_access_mask(vk::AccessFlags::HOST_WRITE)
                    .dst_access_mask(vk::AccessFlags::UNIFORM_READ);
                unsafe {
                    device.cmd_pipeline_barrier(
                        command_buffer,
                        vk::PipelineStageFlags::HOST,
                        vk::PipelineStageFlags::VERTEX_SHADER,
                        vk::DependencyFlags::empty(),
                        &[barrier],
                        &[],
                        &[],
                    );
                }
            }
            FrameCommand::SwapBarrier {
                image_index,
                transition,
            } => {
                transition
                    .barrier()
                    .record(device, command_buffer, self.swap_images[image_index]);
            }
            FrameCommand::BeginRenderPass { framebuffer_index } => {
                let clear_values = clear_values();
                let render_pass_begin_info = vk::RenderPassBeginInfo::default()
                    .render_pass(self.render_pass)
                    .framebuffer(self.framebuffers[framebuffer_index])
                    .render_area(vk::Rect2D {
                        offset: vk::Offset2D { x: 0, y: 0 },
                        extent: self.extent,
                    })
                    .clear_values(&clear_values);
                unsafe {
                    device.cmd_begin_render_pass(
                        command_buffer,
                        &render_pass_begin_info,
                        vk::SubpassContents::INLINE,
                    );
                }
            }
            FrameCommand::BindPipeline(subpass) => {
                let pipeline = match subpass {
                    Subpass::Geometry => self.pipelines.geometry_pipeline(),
                    Subpass::Lighting => self.pipelines.lighting_pipeline(),
                };
                unsafe {
                    device.cmd_bind_pipeline(
                        command_buffer,
                        vk::PipelineBindPoint::GRAPHICS,
                        pipeline,
                    );
                }
            }
            FrameCommand::SetViewportAndScissor => {
                let viewport = vk::Viewport::default()
                    .x(0.0)
                    .y(0.0)
                    .width(self.extent.width as f32)
                    .height(self.extent.height as f32)
                    .min_depth(0.0)
                    .max_depth(1.0);
                let scissor = vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent: self.extent,
                };
                unsafe {
                    device.cmd_set_viewport(command_buffer, 0, &[viewport]);
                    device.cmd_set_scissor(command_buffer, 0, &[scissor]);
                }
            }
            FrameCommand::BindDrawBuffers {
                vertex_offset,
                index_offset,
            } => unsafe {
                device.cmd_bind_vertex_buffers(
                    command_buffer,
                    0,
                    &[self.draw_buffer],
                    &[vertex_offset],
                );
                device.cmd_bind_index_buffer(
                    command_buffer,
                    self.draw_buffer,
                    index_offset,
                    vk::IndexType::UINT16,
                );
            },
            FrameCommand::BindDescriptorSets(subpass) => {
                let (layout, sets) = match subpass {
                    Subpass::Geometry => (self.pipelines.geometry_layout(), &self.geometry_sets),
                    Subpass::Lighting => (self.pipelines.lighting_layout(), &self.lighting_sets),
                };
                unsafe {
                    device.cmd_bind_descriptor_sets(
                        command_buffer,
                        vk::PipelineBindPoint::GRAPHICS,
                        layout,
                        0,
                        sets,
                        &[],
                    );
                }
            }
            FrameCommand::DrawIndexedIndirect { draw_count, stride } => unsafe {
                device.cmd_draw_indexed_indirect(
                    command_buffer,
                    self.draw_buffer,
                    0,
                    draw_count,
                    stride,
                );
            },
            FrameCommand::NextSubpass => unsafe {
                device.cmd_next_subpass(command_buffer, vk::SubpassContents::INLINE);
            },
            FrameCommand::DrawFullscreenTriangle => unsafe {
                device.cmd_draw(command_buffer, 3, 1, 0, 0);
            },
            FrameCommand::EndRenderPass => unsafe {
                device.cmd_end_render_pass(command_buffer);
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::scene::Scene;

    fn demo_plans(image_count: usize) -> Vec<Vec<FrameCommand>> {
        let scene = Scene::demo();
        plan_frames(image_count, &scene.layout(), scene.draws.len() as u32)
    }

    #[test]
    fn one_plan_per_swap_image() {
        assert_eq!(demo_plans(2).len(), 2);
        assert_eq!(demo_plans(3).len(), 3);
    }

    #[test]
    fn plans_are_bracketed_by_swap_barriers_on_their_image() {
        for (image_index, plan) in demo_plans(2).iter().enumerate() {
            let barriers = plan
                .iter()
                .filter_map(|command| match command {
                    FrameCommand::SwapBarrier {
                        image_index,
                        transition,
                    } => Some((*image_index, *transition)),
                    _ => None,
                })
                .collect::<Vec<_>>();
            assert_eq!(
                barriers,
                vec![
                    (image_index, SwapTransition::ToAttachment),
                    (image_index, SwapTransition::ToPresent),
                ]
            );
            assert_eq!(plan[0], FrameCommand::UniformBarrier);
            assert!(matches!(plan[1], FrameCommand::SwapBarrier { .. }));
            assert!(matches!(
                plan.last(),
                Some(FrameCommand::SwapBarrier {
                    transition: SwapTransition::ToPresent,
                    ..
                })
            ));
        }
    }

    #[test]
    fn geometry_then_lighting() {
        let plan = &demo_plans(1)[0];
        let position = |wanted: FrameCommand| plan.iter().position(|c| *c == wanted).unwrap();

        let begin = position(FrameCommand::BeginRenderPass {
            framebuffer_index: 0,
        });
        let draw = plan
            .iter()
            .position(|c| matches!(c, FrameCommand::DrawIndexedIndirect { .. }))
            .unwrap();
        let next = position(FrameCommand::NextSubpass);
        let fullscreen = position(FrameCommand::DrawFullscreenTriangle);
        let end = position(FrameCommand::EndRenderPass);
        assert!(begin < draw && draw < next && next < fullscreen && fullscreen < end);
    }

    #[test]
    fn indirect_draw_uses_the_packed_layout() {
        let scene = Scene::demo();
        let plan = plan_frame(0, &scene.layout(), 2);
        assert!(plan.contains(&FrameCommand::DrawIndexedIndirect {
            draw_count: 2,
            stride: 20,
        }));
        assert!(plan.contains(&FrameCommand::BindDrawBuffers {
            vertex_offset: 40,
            index_offset: 40 + 14 * 48,
        }));
    }

    #[test]
    fn zero_draws_keep_barriers_and_clear() {
        let scene = Scene::demo().without_draws();
        let plan = plan_frame(1, &scene.layout(), 0);
        assert!(!plan
            .iter()
            .any(|c| matches!(c, FrameCommand::DrawIndexedIndirect { .. })));
        assert!(plan.contains(&FrameCommand::BeginRenderPass {
            framebuffer_index: 1
        }));
        assert!(plan.contains(&FrameCommand::UniformBarrier));
        assert!(plan.contains(&FrameCommand::DrawFullscreenTriangle));
        assert_eq!(
            plan.iter()
                .filter(|c| matches!(c, FrameCommand::SwapBarrier { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn swap_barriers_round_trip_the_layout() {
        let to_attachment = SwapTransition::ToAttachment.barrier();
        let to_present = SwapTransition::ToPresent.barrier();
        assert_eq!(to_attachment.old_layout, to_present.new_layout);
        assert_eq!(to_attachment.new_layout, to_present.old_layout);
        assert_eq!(
            to_attachment.dst_stage_mask,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        );
        assert_eq!(
            to_present.dst_stage_mask,
            vk::PipelineStageFlags::BOTTOM_OF_PIPE
        );
    }
}
